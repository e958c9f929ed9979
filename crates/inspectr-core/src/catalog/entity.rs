//! Entity and field definitions.

use super::types::ScalarType;
use rkyv::{Archive, Deserialize, Serialize};

/// A field definition within an entity.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field data type.
    pub scalar: ScalarType,
    /// Whether the field may hold null.
    pub nullable: bool,
}

impl FieldDef {
    /// Create a required field.
    pub fn new(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar,
            nullable: false,
        }
    }

    /// Create a nullable field.
    pub fn optional(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar,
            nullable: true,
        }
    }
}

/// An entity definition (table schema).
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity name (unique within schema).
    pub name: String,
    /// Name of the primary key field.
    pub identity_field: String,
    /// Field definitions.
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    /// Create a new entity definition.
    pub fn new(name: impl Into<String>, identity_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_field: identity_field.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether the entity declares a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    /// Get the identity field definition.
    pub fn get_identity_field(&self) -> Option<&FieldDef> {
        self.get_field(&self.identity_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_def() {
        let sensor = EntityDef::new("Sensor", "id")
            .with_field(FieldDef::new("id", ScalarType::Int64))
            .with_field(FieldDef::optional("i_current", ScalarType::Float64));

        assert_eq!(sensor.fields.len(), 2);
        assert!(sensor.has_field("i_current"));
        assert!(sensor.get_field("i_current").unwrap().nullable);
        assert_eq!(sensor.get_identity_field().unwrap().scalar, ScalarType::Int64);
        assert!(!sensor.has_field("v_current"));
    }
}
