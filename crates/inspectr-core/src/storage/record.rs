//! Record type for stored rows.

use crate::error::Error;
use inspectr_proto::Value;
use rkyv::{Archive, Deserialize, Serialize};

/// A named field value inside a record.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct StoredField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: Value,
}

/// A stored row with metadata.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Record {
    /// Field values in declaration order.
    pub fields: Vec<StoredField>,

    /// Write timestamp in microseconds since Unix epoch.
    pub created_at: u64,
}

impl Record {
    /// Create a new record with the current timestamp.
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, value)| StoredField { name, value })
                .collect(),
            created_at: current_timestamp(),
        }
    }

    /// Get a field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Serialize the record to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// Get current timestamp in microseconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_roundtrip() {
        let record = Record::new(vec![
            ("id".into(), Value::Int64(1)),
            ("i_current".into(), Value::Float64(3.3)),
            ("label".into(), Value::Null),
        ]);
        let bytes = record.to_bytes().unwrap();
        let decoded = Record::from_bytes(&bytes).unwrap();

        assert_eq!(record, decoded);
        assert_eq!(decoded.get("i_current"), Some(&Value::Float64(3.3)));
        assert_eq!(decoded.get("missing"), None);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(Record::from_bytes(&[1, 2, 3]).is_err());
    }
}
