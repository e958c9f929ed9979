//! Relationship descriptors supplied per fetch call.

use std::fmt;

use crate::error::Error;

/// Separator between a relation name and a field on the related entity.
pub const FIELD_PATH_SEPARATOR: &str = "__";

/// Kind of relationship between the queried entity and the entity holding
/// the projected fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// To-one relation through a foreign key on the queried entity.
    ForeignKey,
    /// To-many relation; one queried row may yield many projections.
    ManyToMany,
    /// One-to-one relation.
    OneToOne,
}

/// How many related rows a single queried primary key may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Zero or one row per primary key.
    AtMostOne,
    /// Any number of rows per primary key.
    Many,
}

impl RelationKind {
    /// Expected result cardinality for this kind.
    pub fn cardinality(self) -> Cardinality {
        match self {
            RelationKind::ForeignKey | RelationKind::OneToOne => Cardinality::AtMostOne,
            RelationKind::ManyToMany => Cardinality::Many,
        }
    }

    /// Short name used in logs and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::ForeignKey => "foreign_key",
            RelationKind::ManyToMany => "many_to_many",
            RelationKind::OneToOne => "one_to_one",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The relationship applied uniformly to every entity of one fetch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    kind: RelationKind,
    related_name: String,
}

impl RelationDescriptor {
    /// Create a descriptor.
    ///
    /// The related name must be non-empty and must name a single relation,
    /// so it may not contain the path separator.
    pub fn new(kind: RelationKind, related_name: impl Into<String>) -> Result<Self, Error> {
        let related_name = related_name.into();
        if related_name.is_empty() {
            return Err(Error::InvalidDescriptor("related name is empty".into()));
        }
        if related_name.contains(FIELD_PATH_SEPARATOR) {
            return Err(Error::InvalidDescriptor(format!(
                "related name `{}` must name one relation and may not contain `{}`",
                related_name, FIELD_PATH_SEPARATOR
            )));
        }
        Ok(Self { kind, related_name })
    }

    /// To-one descriptor.
    pub fn foreign_key(related_name: impl Into<String>) -> Result<Self, Error> {
        Self::new(RelationKind::ForeignKey, related_name)
    }

    /// To-many descriptor.
    pub fn many_to_many(related_name: impl Into<String>) -> Result<Self, Error> {
        Self::new(RelationKind::ManyToMany, related_name)
    }

    /// One-to-one descriptor.
    pub fn one_to_one(related_name: impl Into<String>) -> Result<Self, Error> {
        Self::new(RelationKind::OneToOne, related_name)
    }

    /// The relationship kind.
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// The relation name used as path prefix.
    pub fn related_name(&self) -> &str {
        &self.related_name
    }

    /// Qualify a related field: `related_name__field`.
    pub fn qualify(&self, field: &str) -> String {
        format!("{}{}{}", self.related_name, FIELD_PATH_SEPARATOR, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_by_kind() {
        assert_eq!(RelationKind::ForeignKey.cardinality(), Cardinality::AtMostOne);
        assert_eq!(RelationKind::OneToOne.cardinality(), Cardinality::AtMostOne);
        assert_eq!(RelationKind::ManyToMany.cardinality(), Cardinality::Many);
    }

    #[test]
    fn test_qualify() {
        let rel = RelationDescriptor::foreign_key("sensor").unwrap();
        assert_eq!(rel.qualify("i_current"), "sensor__i_current");
    }

    #[test]
    fn test_descriptor_rejects_bad_names() {
        assert!(RelationDescriptor::foreign_key("").is_err());
        assert!(RelationDescriptor::foreign_key("__sensor").is_err());
        assert!(RelationDescriptor::many_to_many("tags__").is_err());
        assert!(RelationDescriptor::one_to_one("device__sensor").is_err());
        assert!(RelationDescriptor::one_to_one("device_sensor").is_ok());
    }
}
