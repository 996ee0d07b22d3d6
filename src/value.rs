//! Typed field values and the coercion rules shared by filters and write payloads.

use crate::descriptor::FieldType;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use serde_json::{Number, Value};
use std::sync::OnceLock;

/// A value held by one field of an entity instance.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(String),
    Text(String),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Uuid(uuid::Uuid),
    Json(Value),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

fn decimal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("decimal pattern is valid"))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

impl FieldType {
    /// Coerce a query-string value. Never yields `Null`.
    pub fn parse_str(&self, raw: &str) -> Option<FieldValue> {
        match self {
            FieldType::Integer => raw.parse::<i64>().ok().map(FieldValue::Int),
            FieldType::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(FieldValue::Float),
            FieldType::Decimal => decimal_pattern()
                .is_match(raw)
                .then(|| FieldValue::Decimal(raw.to_string())),
            FieldType::String => Some(FieldValue::Text(raw.to_string())),
            FieldType::Boolean => parse_bool(raw).map(FieldValue::Bool),
            FieldType::Timestamp => parse_timestamp(raw).map(FieldValue::Timestamp),
            FieldType::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(FieldValue::Date),
            FieldType::Uuid => uuid::Uuid::parse_str(raw).ok().map(FieldValue::Uuid),
            FieldType::Json => serde_json::from_str(raw).ok().map(FieldValue::Json),
            FieldType::Binary => BASE64.decode(raw).ok().map(FieldValue::Bytes),
            FieldType::Reference { key, .. } => key.parse_str(raw),
            FieldType::Enumeration { choices } => choices
                .iter()
                .any(|c| c == raw)
                .then(|| FieldValue::Text(raw.to_string())),
        }
    }

    /// Coerce a JSON value from a write payload. `null` is the caller's concern.
    /// Strings are accepted for every non-string type and parsed like query values.
    pub fn from_json(&self, value: &Value) -> Option<FieldValue> {
        match (self, value) {
            (_, Value::Null) => None,
            (FieldType::Json, v) => Some(FieldValue::Json(v.clone())),
            (FieldType::Reference { key, .. }, v) => key.from_json(v),
            (FieldType::Integer, Value::Number(n)) => n.as_i64().map(FieldValue::Int),
            (FieldType::Float, Value::Number(n)) => n.as_f64().map(FieldValue::Float),
            (FieldType::Decimal, Value::Number(n)) => self.parse_str(&n.to_string()),
            (FieldType::Boolean, Value::Bool(b)) => Some(FieldValue::Bool(*b)),
            (_, Value::String(s)) => self.parse_str(s),
            _ => None,
        }
    }

    /// Wire encoding of a value held by a field of this type. `None` when the value's kind
    /// does not belong to the type.
    pub fn to_json(&self, value: &FieldValue) -> Option<Value> {
        Some(match (self, value) {
            (_, FieldValue::Null) => Value::Null,
            (FieldType::Reference { key, .. }, v) => return key.to_json(v),
            (FieldType::Integer, FieldValue::Int(n)) => Value::Number((*n).into()),
            (FieldType::Float, FieldValue::Float(f)) => match Number::from_f64(*f) {
                Some(n) => Value::Number(n),
                // JSON has no NaN or infinities; use PostgreSQL's spelling
                None if f.is_nan() => Value::String("NaN".into()),
                None if *f > 0.0 => Value::String("Infinity".into()),
                None => Value::String("-Infinity".into()),
            },
            (FieldType::Decimal, FieldValue::Decimal(d)) => Value::String(d.clone()),
            (FieldType::String, FieldValue::Text(s)) => Value::String(s.clone()),
            (FieldType::Enumeration { .. }, FieldValue::Text(s)) => Value::String(s.clone()),
            (FieldType::Boolean, FieldValue::Bool(b)) => Value::Bool(*b),
            (FieldType::Timestamp, FieldValue::Timestamp(ts)) => {
                Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            (FieldType::Date, FieldValue::Date(d)) => Value::String(d.format("%Y-%m-%d").to_string()),
            (FieldType::Uuid, FieldValue::Uuid(u)) => Value::String(u.to_string()),
            (FieldType::Json, FieldValue::Json(v)) => v.clone(),
            (FieldType::Binary, FieldValue::Bytes(b)) => Value::String(BASE64.encode(b)),
            _ => return None,
        })
    }
}
