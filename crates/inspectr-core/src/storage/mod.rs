//! Storage layer for the reference store.
//!
//! This module provides a sled-based row store keyed by entity and primary key.

mod config;
mod engine;
mod record;

pub mod key;

pub use config::StorageConfig;
pub use engine::StorageEngine;
pub use key::RowKey;
pub use record::{current_timestamp, Record, StoredField};
