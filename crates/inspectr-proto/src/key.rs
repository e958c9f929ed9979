//! Primary key identifiers.

use std::fmt;

use crate::error::Error;
use crate::value::Value;

/// A primary key identifying one row of an entity.
///
/// Keys are totally ordered: all integer keys sort before string keys,
/// which sort before UUID keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimaryKey {
    /// Integer key (the common auto-increment case).
    Int(i64),
    /// String key.
    Str(String),
    /// UUID key.
    Uuid([u8; 16]),
}

impl PrimaryKey {
    /// Interpret a JSON scalar as a primary key.
    ///
    /// Only integers and strings are accepted; a string is never
    /// reinterpreted as a UUID.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, Error> {
        match json {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(PrimaryKey::Int)
                .ok_or_else(|| Error::UnsupportedValue(format!("non-integer key {}", n))),
            serde_json::Value::String(s) => Ok(PrimaryKey::Str(s.clone())),
            other => Err(Error::UnsupportedValue(format!("key {}", other))),
        }
    }

    /// Interpret a stored value as a primary key.
    ///
    /// Returns `None` for null and for values that cannot identify a row.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int32(i) => Some(PrimaryKey::Int(*i as i64)),
            Value::Int64(i) => Some(PrimaryKey::Int(*i)),
            Value::String(s) => Some(PrimaryKey::Str(s.clone())),
            Value::Uuid(u) => Some(PrimaryKey::Uuid(*u)),
            _ => None,
        }
    }

    /// Convert back into a value.
    pub fn to_value(&self) -> Value {
        match self {
            PrimaryKey::Int(i) => Value::Int64(*i),
            PrimaryKey::Str(s) => Value::String(s.clone()),
            PrimaryKey::Uuid(u) => Value::Uuid(*u),
        }
    }

    /// Render as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_value().to_json()
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryKey::Int(i) => write!(f, "{}", i),
            PrimaryKey::Str(s) => write!(f, "{:?}", s),
            PrimaryKey::Uuid(u) => write!(f, "{}", hex::encode(u)),
        }
    }
}

impl From<i64> for PrimaryKey {
    fn from(v: i64) -> Self {
        PrimaryKey::Int(v)
    }
}

impl From<i32> for PrimaryKey {
    fn from(v: i32) -> Self {
        PrimaryKey::Int(v as i64)
    }
}

impl From<&str> for PrimaryKey {
    fn from(v: &str) -> Self {
        PrimaryKey::Str(v.to_string())
    }
}

impl From<String> for PrimaryKey {
    fn from(v: String) -> Self {
        PrimaryKey::Str(v)
    }
}

impl From<[u8; 16]> for PrimaryKey {
    fn from(v: [u8; 16]) -> Self {
        PrimaryKey::Uuid(v)
    }
}
