//! Store capability and the reference store behind it.
//!
//! The fetcher only sees [`EntityHandle`] and [`ModelMap`]. [`CatalogModel`]
//! implements the capability over the sled storage engine and catalog.

mod catalog_model;
mod handle;
pub mod join;
mod map;
mod writer;

pub use catalog_model::CatalogModel;
pub use handle::{EntityHandle, PrimaryKeyFilter, RowStream, StoreRow};
pub use join::JoinStrategy;
pub use map::ModelMap;
pub use writer::RecordWriter;
