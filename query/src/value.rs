//! Bound-value representation
//!
//! Every user-supplied comparison value becomes a [`SqlValue`] bound through a
//! placeholder; SQL text never embeds one. Collection values are rejected at
//! the compile boundary — the condition grammar has no IN-form, and silently
//! binding a JSON blob would hide caller bugs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sql::quote_literal;

/// A value destined for a placeholder slot.
///
/// Deserializes untagged from filter JSON: `null`, booleans, integers, other
/// numbers, and strings map onto the matching variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// Convert a JSON value, rejecting arrays and objects.
    ///
    /// Returns `None` for collection shapes; callers report those as
    /// structural errors with column context attached.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Integer(i))
                } else {
                    n.as_f64().map(Self::Float)
                }
            }
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    /// Render as a standalone SQL literal.
    ///
    /// Used only by the ranking compiler, which is documented as taking
    /// operator-authored configuration rather than end-user input.
    pub fn as_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => quote_literal(s),
        }
    }

    /// The text content, when this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce into text, rendering scalars the way they arrived in JSON.
    pub fn into_text(self) -> Self {
        match self {
            Self::Null => Self::Null,
            Self::Bool(b) => Self::Text(b.to_string()),
            Self::Integer(i) => Self::Text(i.to_string()),
            Self::Float(f) => Self::Text(f.to_string()),
            text @ Self::Text(_) => text,
        }
    }
}

impl Default for SqlValue {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for SqlValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Target kind for leaf-level value coercion (`value_type` in filter JSON).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[serde(alias = "string")]
    Text,
    #[serde(alias = "int")]
    Integer,
    #[serde(alias = "number")]
    Float,
    #[serde(alias = "bool")]
    Boolean,
}

impl ValueKind {
    /// Coerce a value into this kind.
    ///
    /// `None` means the value cannot represent the kind (e.g. `"abc"` as an
    /// integer, a fractional float as an integer); callers surface that as a
    /// structural error. SQL NULL passes through every kind untouched.
    pub fn coerce(self, value: SqlValue) -> Option<SqlValue> {
        if matches!(value, SqlValue::Null) {
            return Some(SqlValue::Null);
        }
        match self {
            Self::Text => Some(value.into_text()),
            Self::Integer => match value {
                SqlValue::Integer(i) => Some(SqlValue::Integer(i)),
                SqlValue::Float(f) if f.fract() == 0.0 => Some(SqlValue::Integer(f as i64)),
                SqlValue::Bool(b) => Some(SqlValue::Integer(i64::from(b))),
                SqlValue::Text(s) => s.trim().parse::<i64>().ok().map(SqlValue::Integer),
                _ => None,
            },
            Self::Float => match value {
                SqlValue::Float(f) => Some(SqlValue::Float(f)),
                SqlValue::Integer(i) => Some(SqlValue::Float(i as f64)),
                SqlValue::Bool(b) => Some(SqlValue::Float(f64::from(u8::from(b)))),
                SqlValue::Text(s) => s.trim().parse::<f64>().ok().map(SqlValue::Float),
                _ => None,
            },
            Self::Boolean => match value {
                SqlValue::Bool(b) => Some(SqlValue::Bool(b)),
                SqlValue::Integer(0) => Some(SqlValue::Bool(false)),
                SqlValue::Integer(1) => Some(SqlValue::Bool(true)),
                SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Some(SqlValue::Bool(true)),
                    "false" | "0" => Some(SqlValue::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}
