//! RunBlueprint - Config Loader 输出
//!
//! 描述一次运行的完整配置：事件 schema、匹配字段、邮件地址、发送端、事件流。
//! 测试用例行 (TestSuite) 单独加载。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::{DispatchConfig, ExpectationRow, WindowConfig};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的运行配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 事件 schema (已展平的字段路径)
    pub schema: SchemaConfig,

    /// 关联字段
    pub matching: MatchingConfig,

    /// 邮件收件人
    pub mail: MailConfig,

    /// 发送端配置
    pub sender: SenderConfig,

    /// 事件流配置
    pub stream: StreamConfig,
}

/// Schema: 有序字段列表
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub fields: Vec<SchemaField>,
}

/// 单个 schema 字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// 点分隔路径 (e.g., "order.total")
    pub path: String,

    /// 字段类型，决定比较方式
    #[serde(default)]
    pub kind: FieldKind,
}

/// 字段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// 浮点，支持容差表达式
    Float,
    Integer,
    Boolean,
    #[default]
    String,
}

impl FieldKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Float | FieldKind::Integer)
    }
}

/// 关联字段路径，必须存在于 schema 中
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub sender_path: String,
    pub subject_path: String,
}

/// 邮件地址配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailConfig {
    /// 收件人
    pub to_address: String,

    #[serde(default)]
    pub cc: Vec<String>,

    #[serde(default)]
    pub bcc: Vec<String>,
}

/// 发送端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    /// 发送端类型
    pub kind: SenderKind,

    /// 最大并发发送数，必须 >= 1
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// 单次发送超时 (秒)
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_concurrency() -> usize {
    crate::DEFAULT_CONCURRENCY
}

fn default_send_timeout_secs() -> u64 {
    30
}

/// 发送端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderKind {
    /// 仅记录日志
    Log,
    /// 写入 .eml 文件到投递目录 (params.dir)
    PickupDir,
}

/// 事件流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// 事件源类型
    pub kind: StreamKind,

    /// Topic 名称 (报告元数据)
    #[serde(default)]
    pub topic: String,

    /// 全局窗口超时 (秒)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// 空闲轮询间隔 (毫秒)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// 每次轮询最多记录数
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_batch_size() -> usize {
    crate::DEFAULT_BATCH_SIZE
}

/// 事件源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// JSON Lines 回放文件 (params.path)
    ReplayFile,
}

/// 测试用例集合
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSuite {
    #[serde(default)]
    pub rows: Vec<ExpectationRow>,
}

impl RunBlueprint {
    /// Window consumer settings from the `[stream]` section
    pub fn to_window_config(&self) -> WindowConfig {
        WindowConfig {
            timeout: Duration::from_secs(self.stream.timeout_secs),
            poll_interval: Duration::from_millis(self.stream.poll_interval_ms),
            batch_size: self.stream.batch_size.max(1),
        }
    }

    /// Dispatcher settings from the `[sender]` section
    pub fn to_dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            concurrency: self.sender.concurrency,
            send_timeout: Duration::from_secs(self.sender.send_timeout_secs),
        }
    }

    /// Schema field paths in declaration order
    pub fn field_paths(&self) -> Vec<String> {
        self.schema.fields.iter().map(|f| f.path.clone()).collect()
    }

    /// Kind lookup by path
    pub fn field_kinds(&self) -> HashMap<String, FieldKind> {
        self.schema
            .fields
            .iter()
            .map(|f| (f.path.clone(), f.kind))
            .collect()
    }

    pub fn has_field(&self, path: &str) -> bool {
        self.schema.fields.iter().any(|f| f.path == path)
    }
}
