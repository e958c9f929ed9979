//! Protocol error types.

use thiserror::Error;

/// Errors raised while building or decoding contract types.
#[derive(Debug, Error)]
pub enum Error {
    /// The payload as a whole could not be interpreted.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A single filter spec entry is malformed.
    #[error("malformed filter spec: {0}")]
    MalformedFilterSpec(String),

    /// A relationship descriptor was rejected.
    #[error("invalid relationship descriptor: {0}")]
    InvalidDescriptor(String),

    /// A JSON value has no scalar representation.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// JSON parsing failed.
    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}
