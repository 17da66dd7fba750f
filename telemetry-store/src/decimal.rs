use rust_decimal::prelude::*;
use serde_json::Value;

/// Encodes an `f64` as an exact-decimal JSON string: floats persisted to
/// the store must never round-trip through binary float coercion at the
/// store boundary.
pub fn encode_f64(value: f64) -> Value {
    let decimal = Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO);
    Value::String(decimal.normalize().to_string())
}

/// Decodes a store attribute back into an `f64`. Accepts either the
/// exact-decimal string this module writes, or a bare JSON number (for
/// records constructed in tests without going through `encode_f64`).
pub fn decode_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::String(s)) => s.parse::<Decimal>().ok().and_then(|d| d.to_f64()).unwrap_or(0.0),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub fn decode_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

pub fn decode_u64(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}
