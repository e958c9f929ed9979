//! Payload-driven projection fetching.
//!
//! A fetch runs three stages per payload entity:
//!
//! 1. [`validate`] checks the entry and finds its registered handle
//! 2. [`resolve`] qualifies the requested fields with the relation name
//! 3. [`execute`] issues one batched store query and builds the bucket
//!
//! [`ProjectionFetcher`] drives the stages and merges the buckets into a
//! [`ResultSet`](inspectr_proto::ResultSet).

mod config;
mod error;
mod executor;
mod fetcher;
mod metrics;
mod resolver;
mod validator;

pub use config::{FetchBudget, FetcherConfig, NullPolicy, UnknownEntityPolicy};
pub use error::{FetchError, FetchErrorKind};
pub use executor::execute;
pub use fetcher::{FetchOutcome, ProjectionFetcher};
pub use metrics::{new_shared_metrics, FetchMetrics, MetricsSnapshot, SharedFetchMetrics};
pub use resolver::{resolve, ResolvedProjection};
pub use validator::{validate, ValidatedEntity, ValidationReport};
