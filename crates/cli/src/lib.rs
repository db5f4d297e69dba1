//! # Verifier
//!
//! 运行编排与报告输出，供 `verifier` 二进制与端到端测试共用。
//!
//! 提供：
//! - 运行编排 (前置条件 → 发送 → 窗口消费 → verdict)
//! - 报告文件写出
//! - CLI 错误类型

pub mod error;
pub mod pipeline;
pub mod report;

pub use error::{CliError, Result};
pub use pipeline::{RunOrchestrator, RunOutcome, RunStats};
pub use report::{report_file_name, write_report};
