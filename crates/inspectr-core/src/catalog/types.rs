//! Scalar type definitions for the catalog.

use inspectr_proto::Value;
use rkyv::{Archive, Deserialize, Serialize};

/// Scalar data types a field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Binary data.
    Bytes,
    /// Timestamp (microseconds since Unix epoch).
    Timestamp,
    /// UUID (128-bit identifier).
    Uuid,
}

impl ScalarType {
    /// Whether a non-null value can be stored in a field of this type.
    ///
    /// Integers widen: an `Int32` value fits an `Int64` field, and either
    /// integer width fits a float field.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ScalarType::Bool, Value::Bool(_))
                | (ScalarType::Int32, Value::Int32(_))
                | (ScalarType::Int64, Value::Int32(_) | Value::Int64(_))
                | (ScalarType::Float32, Value::Float32(_))
                | (
                    ScalarType::Float64,
                    Value::Float32(_) | Value::Float64(_) | Value::Int32(_) | Value::Int64(_)
                )
                | (ScalarType::String, Value::String(_))
                | (ScalarType::Bytes, Value::Bytes(_))
                | (ScalarType::Timestamp, Value::Timestamp(_) | Value::Int64(_))
                | (ScalarType::Uuid, Value::Uuid(_))
        )
    }

    /// Coerce a value into this type's canonical representation.
    ///
    /// Used when loading loosely typed input such as JSON, where every
    /// integer arrives as `Int64`.
    pub fn coerce(self, value: Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) => Some(Value::Null),
            (ScalarType::Int32, Value::Int64(i)) => i32::try_from(i).ok().map(Value::Int32),
            (ScalarType::Int64, Value::Int32(i)) => Some(Value::Int64(i as i64)),
            (ScalarType::Float32, Value::Float64(f)) => Some(Value::Float32(f as f32)),
            (ScalarType::Float32, Value::Int64(i)) => Some(Value::Float32(i as f32)),
            (ScalarType::Float64, Value::Int64(i)) => Some(Value::Float64(i as f64)),
            (ScalarType::Float64, Value::Int32(i)) => Some(Value::Float64(i as f64)),
            (ScalarType::Timestamp, Value::Int64(t)) => Some(Value::Timestamp(t)),
            (ScalarType::Uuid, Value::String(s)) => {
                // Accept both bare and hyphenated hex.
                let digits: String = s.chars().filter(|c| *c != '-').collect();
                let mut bytes = [0u8; 16];
                hex::decode_to_slice(&digits, &mut bytes).ok()?;
                Some(Value::Uuid(bytes))
            }
            (ty, v) if ty.accepts(&v) => Some(v),
            _ => None,
        }
    }
}
