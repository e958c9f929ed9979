//! Relation definitions between entities.

use rkyv::{Archive, Deserialize, Serialize};

/// Cardinality of a relation, read from the source entity's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum Cardinality {
    /// Foreign key on the source pointing at one target.
    ManyToOne,
    /// One-to-one relation (unique foreign key, either side).
    OneToOne,
    /// Reverse foreign key: many targets point at the source.
    OneToMany,
    /// Many-to-many relation through an edge entity.
    ManyToMany,
}

/// A named relation declared from one entity to another.
///
/// For `ManyToOne`, `OneToOne` and `OneToMany` relations the join condition
/// is `source.from_field == target.to_field`. For `ManyToMany` relations
/// `from_field` and `to_field` name the edge entity's columns referencing
/// the source and target identities.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct RelationDef {
    /// Relation name, unique per source entity. Used as the path prefix.
    pub name: String,
    /// Source entity name.
    pub from_entity: String,
    /// Target entity name.
    pub to_entity: String,
    /// Relation cardinality.
    pub cardinality: Cardinality,
    /// Join field on the source (or edge column for many-to-many).
    pub from_field: String,
    /// Join field on the target (or edge column for many-to-many).
    pub to_field: String,
    /// Edge entity for many-to-many relations.
    pub edge_entity: Option<String>,
}

impl RelationDef {
    fn join(
        name: impl Into<String>,
        cardinality: Cardinality,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            to_entity: to_entity.into(),
            cardinality,
            from_field: from_field.into(),
            to_field: to_field.into(),
            edge_entity: None,
        }
    }

    /// Create a foreign-key relation (`source.from_field` references `target.to_field`).
    pub fn many_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self::join(name, Cardinality::ManyToOne, from_entity, from_field, to_entity, to_field)
    }

    /// Create a one-to-one relation.
    pub fn one_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self::join(name, Cardinality::OneToOne, from_entity, from_field, to_entity, to_field)
    }

    /// Create a reverse foreign-key relation (`target.to_field` references `source.from_field`).
    pub fn one_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self::join(name, Cardinality::OneToMany, from_entity, from_field, to_entity, to_field)
    }

    /// Create a many-to-many relation through `edge_entity`.
    ///
    /// `edge_from_field` and `edge_to_field` are the edge columns holding
    /// the source and target primary keys.
    pub fn many_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        to_entity: impl Into<String>,
        edge_entity: impl Into<String>,
        edge_from_field: impl Into<String>,
        edge_to_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            to_entity: to_entity.into(),
            cardinality: Cardinality::ManyToMany,
            from_field: edge_from_field.into(),
            to_field: edge_to_field.into(),
            edge_entity: Some(edge_entity.into()),
        }
    }
}
