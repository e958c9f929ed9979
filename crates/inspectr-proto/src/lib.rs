//! inspectr contract types.
//!
//! This crate defines what crosses the boundary of the projection fetcher:
//! the client payload, the relationship descriptor chosen by the caller, and
//! the result set handed back.
//!
//! # Modules
//!
//! - [`value`] - Scalar values read from stored records
//! - [`key`] - Primary key identifiers
//! - [`payload`] - Client payloads and filter specs
//! - [`relation`] - Relationship kinds and descriptors
//! - [`result`] - Result sets, buckets, and row projections
//! - [`error`] - Protocol error types

pub mod error;
pub mod key;
pub mod payload;
pub mod relation;
pub mod result;
pub mod value;

pub use error::Error;

pub use key::PrimaryKey;
pub use payload::{FilterSpec, Payload};
pub use relation::{Cardinality, RelationDescriptor, RelationKind, FIELD_PATH_SEPARATOR};
pub use result::{EntityBucket, ResultSet, RowProjection};
pub use value::Value;
