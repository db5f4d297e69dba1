//! 配置校验模块
//!
//! 蓝图校验规则：
//! - schema 非空，字段路径非空且唯一
//! - matching.sender_path / subject_path 存在于 schema
//! - mail.to_address 非空
//! - 并发 >= 1，超时 / 轮询间隔 / 批大小 > 0
//! - 类型特定参数齐全 (pickup_dir 需要 dir，replay_file 需要 path)
//!
//! 用例集校验规则：
//! - id 非空且唯一
//! - expected 中的路径存在于 schema

use std::collections::HashSet;

use contracts::{ContractError, RunBlueprint, SenderKind, StreamKind, TestSuite};

/// 校验 RunBlueprint
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate_blueprint(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    validate_schema(blueprint)?;
    validate_matching(blueprint)?;
    validate_mail(blueprint)?;
    validate_sender(blueprint)?;
    validate_stream(blueprint)?;
    Ok(())
}

/// 校验 TestSuite (依赖蓝图中的 schema)
pub fn validate_suite(suite: &TestSuite, blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, row) in suite.rows.iter().enumerate() {
        if row.id.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("rows[{}].id", idx),
                "row id cannot be empty",
            ));
        }
        if !seen.insert(row.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("rows[id={}]", row.id),
                "duplicate row id",
            ));
        }
        for field in &row.expected {
            if !blueprint.has_field(&field.path) {
                return Err(ContractError::config_validation(
                    format!("rows[{}].expected[{}]", row.id, field.path),
                    format!("field '{}' is not in the schema", field.path),
                ));
            }
        }
    }
    Ok(())
}

/// 校验 schema 字段
fn validate_schema(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    if blueprint.schema.fields.is_empty() {
        return Err(ContractError::config_validation(
            "schema.fields",
            "schema must declare at least one field",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, field) in blueprint.schema.fields.iter().enumerate() {
        if field.path.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("schema.fields[{}].path", idx),
                "field path cannot be empty",
            ));
        }
        if !seen.insert(field.path.as_str()) {
            return Err(ContractError::config_validation(
                format!("schema.fields[path={}]", field.path),
                "duplicate field path",
            ));
        }
    }
    Ok(())
}

/// 校验关联字段
fn validate_matching(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let matching = &blueprint.matching;
    for (key, path) in [
        ("matching.sender_path", &matching.sender_path),
        ("matching.subject_path", &matching.subject_path),
    ] {
        if !blueprint.has_field(path) {
            return Err(ContractError::config_validation(
                key,
                format!("'{}' is not in the schema", path),
            ));
        }
    }
    Ok(())
}

fn validate_mail(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    if blueprint.mail.to_address.trim().is_empty() {
        return Err(ContractError::config_validation(
            "mail.to_address",
            "recipient address cannot be empty",
        ));
    }
    Ok(())
}

/// 校验发送端配置
fn validate_sender(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let sender = &blueprint.sender;
    if sender.concurrency == 0 {
        return Err(ContractError::config_validation(
            "sender.concurrency",
            "concurrency must be >= 1",
        ));
    }
    if sender.send_timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "sender.send_timeout_secs",
            "send_timeout_secs must be > 0",
        ));
    }
    if sender.kind == SenderKind::PickupDir && !has_param(&sender.params, "dir") {
        return Err(ContractError::config_validation(
            "sender.params.dir",
            "pickup_dir sender requires a 'dir' parameter",
        ));
    }
    Ok(())
}

/// 校验事件流配置
fn validate_stream(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let stream = &blueprint.stream;
    if stream.timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "stream.timeout_secs",
            "timeout_secs must be > 0",
        ));
    }
    if stream.poll_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "stream.poll_interval_ms",
            "poll_interval_ms must be > 0",
        ));
    }
    if stream.batch_size == 0 {
        return Err(ContractError::config_validation(
            "stream.batch_size",
            "batch_size must be > 0",
        ));
    }
    if stream.kind == StreamKind::ReplayFile && !has_param(&stream.params, "path") {
        return Err(ContractError::config_validation(
            "stream.params.path",
            "replay_file stream requires a 'path' parameter",
        ));
    }
    Ok(())
}

fn has_param(params: &std::collections::HashMap<String, String>, key: &str) -> bool {
    params.get(key).is_some_and(|value| !value.trim().is_empty())
}
