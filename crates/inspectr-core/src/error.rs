//! Core error types.

use thiserror::Error;

/// Errors raised by the store capability and the reference store.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] inspectr_proto::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Key decoding error.
    #[error("invalid key format")]
    InvalidKey,

    /// Entity is not defined in the catalog.
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    /// Relation is not declared from the queried entity.
    #[error("entity `{entity}` has no relation `{relation}`")]
    UnknownRelation { entity: String, relation: String },

    /// Field does not exist on the entity a path resolves to.
    #[error("entity `{entity}` has no field `{field}`")]
    UnknownField { entity: String, field: String },

    /// A requested primary key cannot be read as the entity's identity type.
    #[error("key {key} does not fit identity field `{field}` of `{entity}`")]
    KeyMismatch {
        entity: String,
        field: String,
        key: inspectr_proto::PrimaryKey,
    },

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
