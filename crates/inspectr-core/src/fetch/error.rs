//! Per-entity fetch errors.

use inspectr_proto::PrimaryKey;
use thiserror::Error;

/// A failure scoped to one payload entity.
///
/// Other entities of the same fetch are unaffected.
#[derive(Debug, Error)]
#[error("entity `{entity}`: {kind}")]
pub struct FetchError {
    /// Payload key of the failed entity.
    pub entity: String,
    /// What went wrong.
    pub kind: FetchErrorKind,
}

impl FetchError {
    pub fn new(entity: impl Into<String>, kind: FetchErrorKind) -> Self {
        Self {
            entity: entity.into(),
            kind,
        }
    }

    /// Render as a JSON object for reporting.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "entity": self.entity,
            "kind": self.kind.code(),
            "message": self.kind.to_string(),
        })
    }
}

/// Kinds of per-entity failure.
#[derive(Debug, Error)]
pub enum FetchErrorKind {
    /// No handle is registered for the key.
    #[error("entity is not registered")]
    UnknownEntity,

    /// The filter spec could not be interpreted.
    #[error("malformed filter spec: {reason}")]
    MalformedFilterSpec { reason: String },

    /// The store failed to answer the projection query.
    #[error("store query on [{}] failed: {source}", .paths.join(", "))]
    Store {
        paths: Vec<String>,
        #[source]
        source: crate::error::Error,
    },

    /// The store returned a row for a key that was not requested.
    #[error("store returned a row for unrequested key {origin}")]
    ForeignRow { origin: PrimaryKey },

    /// A to-one fetch produced more than one row for a key.
    #[error("more than one related row for key {origin}; the relation fans out")]
    CardinalityViolation { origin: PrimaryKey },

    /// A budget limit was hit.
    #[error("{what} budget exceeded: {actual} > {limit}")]
    BudgetExceeded {
        what: &'static str,
        limit: usize,
        actual: usize,
    },
}

impl FetchErrorKind {
    /// Stable short name of the kind.
    pub fn code(&self) -> &'static str {
        match self {
            FetchErrorKind::UnknownEntity => "unknown_entity",
            FetchErrorKind::MalformedFilterSpec { .. } => "malformed_filter_spec",
            FetchErrorKind::Store { .. } => "store",
            FetchErrorKind::ForeignRow { .. } => "foreign_row",
            FetchErrorKind::CardinalityViolation { .. } => "cardinality_violation",
            FetchErrorKind::BudgetExceeded { .. } => "budget_exceeded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = FetchError::new(
            "inverter",
            FetchErrorKind::Store {
                paths: vec!["sensor__a".into(), "sensor__b".into()],
                source: crate::error::Error::UnknownRelation {
                    entity: "Inverter".into(),
                    relation: "sensor".into(),
                },
            },
        );
        assert_eq!(
            err.to_string(),
            "entity `inverter`: store query on [sensor__a, sensor__b] failed: \
             entity `Inverter` has no relation `sensor`"
        );
    }

    #[test]
    fn test_to_json() {
        let err = FetchError::new("foo", FetchErrorKind::UnknownEntity);
        assert_eq!(
            err.to_json(),
            serde_json::json!({
                "entity": "foo",
                "kind": "unknown_entity",
                "message": "entity is not registered",
            })
        );
    }
}
