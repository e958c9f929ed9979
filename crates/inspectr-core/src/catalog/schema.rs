//! Schema bundle - versioned snapshot of the entire schema.

use super::{EntityDef, RelationDef};
use crate::error::Error;
use crate::storage::current_timestamp;
use rkyv::{Archive, Deserialize, Serialize};
use std::collections::HashMap;

/// A versioned snapshot of the entire schema.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Schema version (monotonically increasing).
    pub version: u64,
    /// Creation timestamp (microseconds since Unix epoch).
    pub created_at: u64,
    /// Entity definitions keyed by name.
    pub entities: HashMap<String, EntityDef>,
    /// Relation definitions keyed by `from_entity.name`.
    pub relations: HashMap<String, RelationDef>,
}

fn relation_key(from_entity: &str, name: &str) -> String {
    format!("{}.{}", from_entity, name)
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            created_at: current_timestamp(),
            entities: HashMap::new(),
            relations: HashMap::new(),
        }
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Add a relation to the schema.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations
            .insert(relation_key(&relation.from_entity, &relation.name), relation);
        self
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Get the relation `name` declared from `entity`.
    pub fn relation_from(&self, entity: &str, name: &str) -> Option<&RelationDef> {
        self.relations.get(&relation_key(entity, name))
    }

    /// List all entity names.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }

    /// Check that every relation points at declared entities and fields.
    pub fn validate(&self) -> Result<(), Error> {
        for entity in self.entities.values() {
            if !entity.has_field(&entity.identity_field) {
                return Err(Error::UnknownField {
                    entity: entity.name.clone(),
                    field: entity.identity_field.clone(),
                });
            }
        }

        for relation in self.relations.values() {
            let from = self.require_entity(&relation.from_entity)?;
            let to = self.require_entity(&relation.to_entity)?;

            match &relation.edge_entity {
                Some(edge_name) => {
                    let edge = self.require_entity(edge_name)?;
                    require_field(edge, &relation.from_field)?;
                    require_field(edge, &relation.to_field)?;
                }
                None => {
                    require_field(from, &relation.from_field)?;
                    require_field(to, &relation.to_field)?;
                }
            }
        }

        Ok(())
    }

    fn require_entity(&self, name: &str) -> Result<&EntityDef, Error> {
        self.get_entity(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    /// Serialize the schema bundle to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a schema bundle from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

fn require_field(entity: &EntityDef, field: &str) -> Result<(), Error> {
    if entity.has_field(field) {
        Ok(())
    } else {
        Err(Error::UnknownField {
            entity: entity.name.clone(),
            field: field.to_string(),
        })
    }
}

impl Default for SchemaBundle {
    fn default() -> Self {
        Self::new(0)
    }
}
