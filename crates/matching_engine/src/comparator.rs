//! Expectation-vs-actual comparison grammar.
//!
//! Precedence: empty (ignore) > `MUSS_LEER_SEIN` > tolerance (float fields only) > exact.
//! All functions here are pure.

use std::collections::HashMap;

use contracts::{display_value, ExpectedField, FieldKind, FieldMap, FieldMismatch};
use serde_json::Value;

/// Literal expectation meaning "actual must be null, missing or blank"
pub const MUST_BE_EMPTY: &str = "MUSS_LEER_SEIN";

/// Relative epsilon for decimal comparisons on `f64`
const EPSILON: f64 = 1e-9;

/// Outcome of one field comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    Ignore,
    Pass,
    Fail { expected: String, actual: String },
}

impl FieldOutcome {
    pub fn is_fail(&self) -> bool {
        matches!(self, FieldOutcome::Fail { .. })
    }
}

/// Direction of a tolerance expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToleranceDirection {
    /// `value+-tol` / `value±tol`: `[value - tol, value + tol]`
    Both,
    /// `value+tol`: `[value, value + tol]`
    Above,
    /// `value-tol`: `[value - tol, value]`
    Below,
}

/// Parsed tolerance expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceRange {
    pub value: f64,
    pub tolerance: f64,
    pub direction: ToleranceDirection,
}

impl ToleranceRange {
    /// Inclusive `(lower, upper)` bounds
    pub fn bounds(&self) -> (f64, f64) {
        match self.direction {
            ToleranceDirection::Both => (self.value - self.tolerance, self.value + self.tolerance),
            ToleranceDirection::Above => (self.value, self.value + self.tolerance),
            ToleranceDirection::Below => (self.value - self.tolerance, self.value),
        }
    }

    pub fn contains(&self, actual: f64) -> bool {
        let (lower, upper) = self.bounds();
        actual >= lower - slack(lower) && actual <= upper + slack(upper)
    }
}

/// Classified expectation
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectationRule {
    Ignore,
    MustBeEmpty,
    Tolerance(ToleranceRange),
    Exact(String),
}

/// Classify a raw expectation for a field of the given kind.
pub fn parse_rule(expected_raw: &str, kind: FieldKind) -> ExpectationRule {
    let text = expected_raw.trim();
    if text.is_empty() {
        return ExpectationRule::Ignore;
    }
    if text == MUST_BE_EMPTY {
        return ExpectationRule::MustBeEmpty;
    }
    if kind == FieldKind::Float {
        if let Some(range) = parse_tolerance(text) {
            return ExpectationRule::Tolerance(range);
        }
    }
    ExpectationRule::Exact(text.to_string())
}

/// Compare one expectation against one decoded value.
pub fn compare(expected_raw: &str, actual: Option<&Value>, kind: FieldKind) -> FieldOutcome {
    let passed = match parse_rule(expected_raw, kind) {
        ExpectationRule::Ignore => return FieldOutcome::Ignore,
        ExpectationRule::MustBeEmpty => is_empty_actual(actual),
        ExpectationRule::Tolerance(range) => {
            actual_number(actual).is_some_and(|number| range.contains(number))
        }
        ExpectationRule::Exact(expected) => exact_match(&expected, actual, kind),
    };

    if passed {
        FieldOutcome::Pass
    } else {
        FieldOutcome::Fail {
            expected: expected_raw.trim().to_string(),
            actual: display_value(actual),
        }
    }
}

/// Compare every expected field of a row against one event's fields.
///
/// Returns the failed fields in expectation order; empty means OK.
pub fn evaluate_fields(
    expected: &[ExpectedField],
    fields: &FieldMap,
    kinds: &HashMap<String, FieldKind>,
) -> Vec<FieldMismatch> {
    expected
        .iter()
        .filter_map(|field| {
            let kind = kinds.get(&field.path).copied().unwrap_or_default();
            match compare(&field.expectation, fields.get(&field.path), kind) {
                FieldOutcome::Fail { expected, actual } => Some(FieldMismatch {
                    field: field.path.clone(),
                    expected,
                    actual,
                }),
                FieldOutcome::Ignore | FieldOutcome::Pass => None,
            }
        })
        .collect()
}

/// Parse a decimal accepting comma or dot as the decimal separator.
///
/// When both appear, the rightmost one is the decimal point and the other is a
/// grouping separator (`1.234,5` and `1,234.5` both give `1234.5`).
pub fn parse_decimal(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = normalize_decimal_separators(trimmed);
    let valid = normalized
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !valid {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn normalize_decimal_separators(text: &str) -> String {
    match (text.rfind(','), text.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => text.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => text.replace(',', ""),
        (Some(_), None) => text.replace(',', "."),
        _ => text.to_string(),
    }
}

/// `value <op> tolerance` with op in `+-`, `±`, `+`, `-`; whitespace allowed around op.
fn parse_tolerance(text: &str) -> Option<ToleranceRange> {
    let value_end = scan_number(text, 0)?;
    let value = parse_decimal(&text[..value_end])?;

    let rest = text[value_end..].trim_start();
    let (direction, op_len) = if rest.starts_with("+-") {
        (ToleranceDirection::Both, 2)
    } else if rest.starts_with('±') {
        (ToleranceDirection::Both, '±'.len_utf8())
    } else if rest.starts_with('+') {
        (ToleranceDirection::Above, 1)
    } else if rest.starts_with('-') {
        (ToleranceDirection::Below, 1)
    } else {
        return None;
    };

    let operand = rest[op_len..].trim();
    let tolerance_end = scan_number(operand, 0)?;
    if tolerance_end != operand.len() {
        return None;
    }
    let tolerance = parse_decimal(operand)?;

    Some(ToleranceRange {
        value,
        tolerance,
        direction,
    })
}

/// Scan `[+-]?\d+([.,]\d+)?` starting at `start`; returns the end byte index.
fn scan_number(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut idx = start;
    if matches!(bytes.get(idx), Some(b'+' | b'-')) {
        idx += 1;
    }
    let int_start = idx;
    while bytes.get(idx).is_some_and(u8::is_ascii_digit) {
        idx += 1;
    }
    if idx == int_start {
        return None;
    }
    if matches!(bytes.get(idx), Some(b'.' | b',')) {
        let frac_start = idx + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if frac_end > frac_start {
            idx = frac_end;
        }
    }
    Some(idx)
}

fn is_empty_actual(actual: Option<&Value>) -> bool {
    match actual {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn actual_number(actual: Option<&Value>) -> Option<f64> {
    match actual? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn exact_match(expected: &str, actual: Option<&Value>, kind: FieldKind) -> bool {
    let numeric = kind.is_numeric() || matches!(actual, Some(Value::Number(_)));
    if numeric {
        if let (Some(lhs), Some(rhs)) = (parse_decimal(expected), actual_number(actual)) {
            return numbers_equal(lhs, rhs);
        }
    }

    let boolean = kind == FieldKind::Boolean || matches!(actual, Some(Value::Bool(_)));
    if boolean {
        if let (Some(lhs), Some(rhs)) = (parse_bool(expected), actual_bool(actual)) {
            return lhs == rhs;
        }
    }

    expected == display_value(actual)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn actual_bool(actual: Option<&Value>) -> Option<bool> {
    match actual? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

fn slack(bound: f64) -> f64 {
    EPSILON * bound.abs().max(1.0)
}

fn numbers_equal(lhs: f64, rhs: f64) -> bool {
    (lhs - rhs).abs() <= slack(lhs.abs().max(rhs.abs()))
}
