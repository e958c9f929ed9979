//! inspectr core - projection fetching over a queryable store.
//!
//! The [`fetch`] module turns a client payload into one batched projection
//! query per entity. It depends only on the [`model::EntityHandle`]
//! capability; [`model::CatalogModel`] provides that capability over the
//! sled-backed [`storage`] layer and its [`catalog`].

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod catalog;
pub mod error;
pub mod fetch;
pub mod model;
pub mod storage;

pub use catalog::{Catalog, EntityDef, FieldDef, RelationDef, ScalarType, SchemaBundle};
pub use error::Error;
pub use storage::{Record, StorageConfig, StorageEngine};

// Fetcher exports
pub use fetch::{
    FetchBudget, FetchError, FetchErrorKind, FetchMetrics, FetchOutcome, FetcherConfig,
    NullPolicy, ProjectionFetcher, UnknownEntityPolicy,
};

// Store capability exports
pub use model::{CatalogModel, EntityHandle, ModelMap, RecordWriter, RowStream, StoreRow};

/// Re-export protocol types.
pub use inspectr_proto as proto;
