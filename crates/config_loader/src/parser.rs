//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式，蓝图与测试用例集共用。

use contracts::ContractError;
use serde::de::DeserializeOwned;

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式
pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析
pub fn parse<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{RunBlueprint, SenderKind, TestSuite};

    #[test]
    fn test_parse_toml_blueprint() {
        let content = r#"
[schema]
fields = [
    { path = "mail.from" },
    { path = "mail.subject" },
    { path = "order.total", kind = "float" },
]

[matching]
sender_path = "mail.from"
subject_path = "mail.subject"

[mail]
to_address = "inbox@test.local"

[sender]
kind = "log"

[stream]
kind = "replay_file"
topic = "orders"
params = { path = "events.jsonl" }
"#;
        let bp: RunBlueprint = parse_toml(content).unwrap();
        assert_eq!(bp.schema.fields.len(), 3);
        assert_eq!(bp.sender.kind, SenderKind::Log);
        assert_eq!(bp.sender.concurrency, 4);
        assert_eq!(bp.stream.timeout_secs, 600);
        assert_eq!(bp.stream.poll_interval_ms, 500);
    }

    #[test]
    fn test_parse_json_suite() {
        let content = r#"{
            "rows": [
                { "id": "TC-1", "sender": "a@x.com", "subject": "S1",
                  "expected": [ { "path": "order.total", "expectation": "12.5 +- 0.1" } ] },
                { "id": "TC-2", "enabled": false, "sender": "b@x.com", "subject": "S2" }
            ]
        }"#;
        let suite: TestSuite = parse_json(content).unwrap();
        assert_eq!(suite.rows.len(), 2);
        assert!(suite.rows[0].enabled);
        assert!(!suite.rows[1].enabled);
        assert_eq!(suite.rows[0].expected[0].expectation, "12.5 +- 0.1");
        assert!(suite.rows[0].is_pending());
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result: Result<TestSuite, _> = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
