//! Typed row insertion for the reference store.

use std::sync::Arc;

use inspectr_proto::{PrimaryKey, Value};
use tracing::debug;

use crate::catalog::{Catalog, EntityDef};
use crate::error::Error;
use crate::storage::{Record, StorageEngine};

/// Writes rows after checking them against the catalog.
///
/// Values are coerced to each field's declared type, missing optional
/// fields become null, and the row is keyed by its identity field.
pub struct RecordWriter {
    storage: Arc<StorageEngine>,
    catalog: Arc<Catalog>,
}

impl RecordWriter {
    pub fn new(storage: Arc<StorageEngine>, catalog: Arc<Catalog>) -> Self {
        Self { storage, catalog }
    }

    /// Insert or replace one row, returning its primary key.
    pub fn insert(&self, entity: &str, fields: Vec<(String, Value)>) -> Result<PrimaryKey, Error> {
        let def = self
            .catalog
            .get_entity(entity)
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))?;

        let values = conform(&def, fields)?;
        let pk = values
            .iter()
            .find(|(name, _)| *name == def.identity_field)
            .and_then(|(_, value)| PrimaryKey::from_value(value))
            .ok_or_else(|| {
                Error::InvalidData(format!(
                    "{} row has no usable `{}`",
                    entity, def.identity_field
                ))
            })?;

        self.storage.put(entity, pk.clone(), &Record::new(values))?;
        debug!(entity, pk = %pk, "row written");
        Ok(pk)
    }

    /// Insert a row given as a JSON object.
    pub fn insert_json(
        &self,
        entity: &str,
        row: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<PrimaryKey, Error> {
        let fields = row
            .iter()
            .map(|(name, json)| Ok((name.clone(), Value::from_json(json)?)))
            .collect::<Result<Vec<_>, Error>>()?;
        self.insert(entity, fields)
    }

    /// Flush written rows to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.storage.flush()
    }
}

/// Order `fields` by declaration and coerce each to its declared type.
fn conform(def: &EntityDef, mut fields: Vec<(String, Value)>) -> Result<Vec<(String, Value)>, Error> {
    if let Some((unknown, _)) = fields.iter().find(|(name, _)| !def.has_field(name)) {
        return Err(Error::UnknownField {
            entity: def.name.clone(),
            field: unknown.clone(),
        });
    }

    let mut values = Vec::with_capacity(def.fields.len());
    for field in &def.fields {
        let raw = match fields.iter().position(|(name, _)| *name == field.name) {
            Some(index) => fields.swap_remove(index).1,
            None => Value::Null,
        };

        let value = field.scalar.coerce(raw).ok_or_else(|| {
            Error::InvalidData(format!(
                "{}.{} expects {:?}",
                def.name, field.name, field.scalar
            ))
        })?;
        if value.is_null() && !field.nullable {
            return Err(Error::InvalidData(format!(
                "{}.{} is required",
                def.name, field.name
            )));
        }
        values.push((field.name.clone(), value));
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, ScalarType, SchemaBundle};
    use crate::storage::StorageConfig;

    fn writer() -> (RecordWriter, Arc<StorageEngine>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(StorageEngine::open(StorageConfig::new(dir.path())).unwrap());
        let catalog = Arc::new(Catalog::open(storage.db()).unwrap());
        catalog
            .apply_schema(SchemaBundle::new(1).with_entity(
                EntityDef::new("Sensor", "id").with_fields([
                    FieldDef::new("id", ScalarType::Int64),
                    FieldDef::new("code", ScalarType::Int32),
                    FieldDef::optional("i_current", ScalarType::Float64),
                ]),
            ))
            .unwrap();
        (RecordWriter::new(storage.clone(), catalog), storage, dir)
    }

    #[test]
    fn test_insert_coerces_and_fills_nulls() {
        let (writer, storage, _dir) = writer();
        let row: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(r#"{"code": 7, "id": 1}"#).unwrap();

        let pk = writer.insert_json("Sensor", &row).unwrap();
        assert_eq!(pk, PrimaryKey::Int(1));

        let record = storage.get("Sensor", &pk).unwrap().unwrap();
        assert_eq!(record.get("code"), Some(&Value::Int32(7)));
        assert_eq!(record.get("i_current"), Some(&Value::Null));
        let names: Vec<&str> = record.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "code", "i_current"]);
    }

    #[test]
    fn test_insert_rejects_bad_rows() {
        let (writer, _storage, _dir) = writer();

        let missing = writer.insert("Sensor", vec![("id".into(), Value::Int64(1))]);
        assert!(matches!(missing, Err(Error::InvalidData(_))));

        let unknown = writer.insert(
            "Sensor",
            vec![
                ("id".into(), Value::Int64(1)),
                ("code".into(), Value::Int64(1)),
                ("voltage".into(), Value::Float64(1.0)),
            ],
        );
        assert!(matches!(unknown, Err(Error::UnknownField { .. })));

        let mistyped = writer.insert(
            "Sensor",
            vec![
                ("id".into(), Value::Int64(1)),
                ("code".into(), Value::String("x".into())),
            ],
        );
        assert!(matches!(mistyped, Err(Error::InvalidData(_))));

        let entity = writer.insert("Battery", vec![]);
        assert!(matches!(entity, Err(Error::UnknownEntity(_))));
    }
}
