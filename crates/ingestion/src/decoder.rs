//! JSON 解码适配器
//!
//! 将 JSON 对象载荷按 schema 的点分字段路径展平为有序字段映射。

use contracts::{ContractError, EventDecoder, FieldMap, RunBlueprint};
use serde_json::{Map, Value};

use crate::error::{IngestionError, Result};

/// 按 schema 路径展平 JSON 载荷
#[derive(Debug, Clone)]
pub struct JsonEventDecoder {
    paths: Vec<String>,
}

impl JsonEventDecoder {
    /// 使用有序字段路径创建
    pub fn new(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// 从蓝图的 `[schema]` 创建
    pub fn from_blueprint(blueprint: &RunBlueprint) -> Self {
        Self::new(blueprint.field_paths())
    }

    /// 字段路径 (schema 顺序)
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// 解码并展平; 缺失的叶子记为 `null`, 缺失或非对象的中间节点为错误
    pub fn decode_fields(&self, payload: &[u8]) -> Result<FieldMap> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| IngestionError::decode("", format!("invalid JSON: {}", e)))?;
        let Value::Object(root) = value else {
            return Err(IngestionError::decode("", "payload is not a JSON object"));
        };

        let mut fields = FieldMap::new();
        for path in &self.paths {
            let value = lookup(&root, path)
                .map_err(|reason| IngestionError::decode(path.as_str(), reason))?;
            fields.insert(path.clone(), value.cloned().unwrap_or(Value::Null));
        }
        Ok(fields)
    }
}

impl EventDecoder for JsonEventDecoder {
    fn decode(&self, payload: &[u8]) -> std::result::Result<FieldMap, ContractError> {
        self.decode_fields(payload).map_err(ContractError::from)
    }
}

/// 点分路径查找; 已展平的键 (含 `.`) 优先匹配
///
/// `Ok(None)` 表示叶子缺失; 无法继续向下时返回原因。
fn lookup<'a>(
    object: &'a Map<String, Value>,
    path: &str,
) -> std::result::Result<Option<&'a Value>, String> {
    if let Some(value) = object.get(path) {
        return Ok(Some(value));
    }
    let mut rest = path;
    let mut current = object;
    while let Some((head, tail)) = rest.split_once('.') {
        match current.get(head) {
            Some(Value::Object(inner)) => {
                if let Some(value) = inner.get(tail) {
                    return Ok(Some(value));
                }
                current = inner;
                rest = tail;
            }
            Some(_) => return Err(format!("'{}' is not an object", head)),
            None => return Err(format!("parent object '{}' missing", head)),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decoder() -> JsonEventDecoder {
        JsonEventDecoder::new(["mail.from", "mail.subject", "order.total", "flag"])
    }

    #[test]
    fn test_nested_payload_flattened_in_schema_order() {
        let payload = json!({
            "flag": null,
            "order": { "total": 12.5 },
            "mail": { "subject": "Order 42", "from": "a@x.com" },
            "extra": 1
        });

        let fields = decoder().decode(payload.to_string().as_bytes()).unwrap();

        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["mail.from", "mail.subject", "order.total", "flag"]);
        assert_eq!(fields["order.total"], json!(12.5));
        assert_eq!(fields["flag"], Value::Null);
    }

    #[test]
    fn test_already_flat_keys_accepted() {
        let payload = json!({
            "mail.from": "a@x.com",
            "mail.subject": "S",
            "order": { "total": 1 },
            "flag": true
        });
        let fields = decoder().decode_fields(payload.to_string().as_bytes()).unwrap();
        assert_eq!(fields["mail.from"], json!("a@x.com"));
    }

    #[test]
    fn test_missing_leaf_decodes_as_null() {
        let payload = json!({ "mail": { "from": "a@x.com", "subject": "S" }, "order": {} });

        let fields = decoder().decode_fields(payload.to_string().as_bytes()).unwrap();

        assert_eq!(fields.len(), 4);
        assert_eq!(fields["order.total"], Value::Null);
        assert_eq!(fields["flag"], Value::Null);
        assert_eq!(fields["mail.from"], json!("a@x.com"));
    }

    #[test]
    fn test_missing_parent_names_the_field() {
        let payload = json!({ "mail": { "from": "a@x.com", "subject": "S" }, "flag": 1 });
        let err = decoder().decode_fields(payload.to_string().as_bytes()).unwrap_err();
        assert!(err.to_string().contains("order.total"), "got: {err}");

        let contract_err = decoder().decode(payload.to_string().as_bytes()).unwrap_err();
        assert!(matches!(contract_err, ContractError::Decode { .. }));
    }

    #[test]
    fn test_scalar_parent_rejected() {
        let payload = json!({ "mail": "a@x.com", "order": { "total": 1 } });
        let err = decoder().decode_fields(payload.to_string().as_bytes()).unwrap_err();
        assert!(err.to_string().contains("not an object"), "got: {err}");
    }

    #[test]
    fn test_non_object_and_garbage_rejected() {
        assert!(decoder().decode_fields(b"[1,2]").is_err());
        assert!(decoder().decode_fields(b"\xff\xfe").is_err());
    }
}
