//! Semantic catalog for the reference store.
//!
//! The catalog records which entities exist, their fields, and the named
//! relations a projection path may follow.

mod catalog;
mod entity;
mod relation;
mod schema;
mod types;

pub use catalog::Catalog;
pub use entity::{EntityDef, FieldDef};
pub use relation::{Cardinality, RelationDef};
pub use schema::SchemaBundle;
pub use types::ScalarType;
