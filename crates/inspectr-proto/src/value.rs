//! Runtime values carried in projections.

use rkyv::{Archive, Deserialize, Serialize};

use crate::error::Error;

/// A scalar value read from a stored record.
///
/// Values are stored with rkyv and rendered to JSON at the edge of the
/// system, so the enum stays flat (no nested arrays or maps).
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit floating point.
    Float32(f32),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Timestamp as microseconds since Unix epoch.
    Timestamp(i64),
    /// UUID as 16 bytes.
    Uuid([u8; 16]),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64, widening 32-bit integers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(i) => Some(*i),
            Value::Int32(i) => Some(*i as i64),
            _ => None,
        }
    }

    /// Try to get as f64, widening 32-bit floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            Value::Float32(f) => Some(*f as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as UUID.
    pub fn as_uuid(&self) -> Option<&[u8; 16]> {
        match self {
            Value::Uuid(u) => Some(u),
            _ => None,
        }
    }

    /// Render this value as JSON.
    ///
    /// Bytes and UUIDs are rendered as lowercase hex strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int32(i) => serde_json::json!(i),
            Value::Int64(i) => serde_json::json!(i),
            Value::Float32(f) => serde_json::json!(f),
            Value::Float64(f) => serde_json::json!(f),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(hex::encode(b)),
            Value::Timestamp(t) => serde_json::json!(t),
            Value::Uuid(u) => serde_json::Value::String(hex::encode(u)),
        }
    }

    /// Build a value from a JSON scalar.
    ///
    /// Integers become `Int64`, other numbers `Float64`. Arrays and objects
    /// have no scalar form and are rejected.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, Error> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Int64(i)),
                None => n
                    .as_f64()
                    .map(Value::Float64)
                    .ok_or_else(|| Error::UnsupportedValue(n.to_string())),
            },
            serde_json::Value::String(s) => Ok(Value::String(s.clone())),
            other => Err(Error::UnsupportedValue(other.to_string())),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
