//! Dynamic document values for synced rows
//!
//! External rows arrive with no stable typing: the same field may be a number
//! in one row and a numeric string in the next. [`DocValue`] keeps the shape
//! explicit and funnels every coercion through one set of cast helpers so the
//! aggregation engine and the SQL row store agree on what "numeric" means.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::source::ColumnInfo;
use crate::{DashSyncError, Result};

/// A single field value inside a synced document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Array(Vec<DocValue>),
    Object(BTreeMap<String, DocValue>),
}

impl DocValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric cast. Numbers pass through, strings are parsed after trimming,
    /// everything else (including booleans) is a failed cast.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Float(value) => value.is_finite().then_some(*value),
            Self::Text(text) => parse_numeric(text),
            _ => None,
        }
    }

    /// Numeric cast with a fallback for failed casts.
    pub fn to_f64_or(&self, default: f64) -> f64 {
        self.as_f64().unwrap_or(default)
    }

    /// Text rendering used for grouping and string comparison. `None` for
    /// null; nested values render as compact JSON.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(text) => Some(text.clone()),
            Self::Bool(flag) => Some(flag.to_string()),
            Self::Integer(value) => Some(value.to_string()),
            Self::Float(value) => Some(render_float(*value)),
            Self::Array(_) | Self::Object(_) => Some(Value::from(self.clone()).to_string()),
        }
    }

    /// Name of the value's JSON type, used for column inference.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) | Self::Float(_) => "number",
            Self::Text(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

/// Parses a trimmed numeric string. Empty strings and non-finite results are
/// failed casts.
pub fn parse_numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn render_float(value: f64) -> String {
    Value::from(value).to_string()
}

impl From<Value> for DocValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => match number.as_i64() {
                Some(int) => Self::Integer(int),
                None => number.as_f64().map_or(Self::Null, Self::Float),
            },
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<DocValue> for Value {
    fn from(value: DocValue) -> Self {
        match value {
            DocValue::Null => Value::Null,
            DocValue::Bool(flag) => Value::Bool(flag),
            DocValue::Integer(int) => Value::from(int),
            DocValue::Float(float) => Value::from(float),
            DocValue::Text(text) => Value::String(text),
            DocValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            DocValue::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for DocValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for DocValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for DocValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for DocValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One synced row: field name to value, keys kept sorted so serialisation is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, DocValue>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a JSON value. Only objects are accepted.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => {
                Ok(Self(map.into_iter().map(|(k, v)| (k, DocValue::from(v))).collect()))
            }
            other => Err(DashSyncError::InvalidInput(format!(
                "expected a JSON object row, got {}",
                DocValue::from(other).type_name()
            ))),
        }
    }

    /// Parse a document from its stored JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| DashSyncError::Database(format!("invalid stored document: {e}")))?;
        Self::from_json(value)
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<DocValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: DocValue) {
        self.0.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&DocValue> {
        self.0.get(field)
    }

    /// Field value, treating JSON null the same as a missing field.
    pub fn present(&self, field: &str) -> Option<&DocValue> {
        self.0.get(field).filter(|value| !value.is_null())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &DocValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Column list sampled from this document: field name plus JSON type.
    pub fn infer_columns(&self) -> Vec<ColumnInfo> {
        self.0.iter().map(|(name, value)| ColumnInfo::new(name, value.type_name())).collect()
    }

    /// Canonical JSON text (sorted keys).
    pub fn to_json_string(&self) -> String {
        Value::from(self.clone()).to_string()
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        Value::Object(document.0.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json_string())
    }
}
