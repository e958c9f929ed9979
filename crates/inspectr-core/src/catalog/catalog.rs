//! Catalog manager for storing and retrieving schema metadata.

use super::{EntityDef, SchemaBundle};
use crate::error::Error;
use parking_lot::RwLock;
use sled::{Db, Tree};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Tree name for schema bundles.
const SCHEMA_TREE: &str = "catalog:schemas";

/// Tree name for catalog metadata.
const META_TREE: &str = "catalog:meta";

/// Key for current schema version in meta tree.
const CURRENT_VERSION_KEY: &[u8] = b"current_version";

/// The catalog manager for schema metadata.
///
/// Readers take a cheap `Arc` snapshot of the current schema, so a schema
/// applied mid-fetch never changes what an in-flight projection sees.
pub struct Catalog {
    /// Schema bundles tree.
    schema_tree: Tree,
    /// Metadata tree.
    meta_tree: Tree,
    /// Current schema version (cached).
    current_version: AtomicU64,
    /// Current schema (cached).
    current_schema: RwLock<Option<Arc<SchemaBundle>>>,
}

impl Catalog {
    /// Open or create a catalog using the given sled database.
    pub fn open(db: &Db) -> Result<Self, Error> {
        let schema_tree = db.open_tree(SCHEMA_TREE)?;
        let meta_tree = db.open_tree(META_TREE)?;

        let current_version = match meta_tree.get(CURRENT_VERSION_KEY)? {
            Some(bytes) => {
                let buf: [u8; 8] = bytes.as_ref().try_into().map_err(|_| Error::InvalidKey)?;
                u64::from_be_bytes(buf)
            }
            None => 0,
        };

        let catalog = Self {
            schema_tree,
            meta_tree,
            current_version: AtomicU64::new(current_version),
            current_schema: RwLock::new(None),
        };

        if current_version > 0 {
            if let Some(schema) = catalog.schema_at_version(current_version)? {
                *catalog.current_schema.write() = Some(Arc::new(schema));
            }
        }

        Ok(catalog)
    }

    /// Get the current schema version.
    pub fn current_version(&self) -> u64 {
        self.current_version.load(Ordering::SeqCst)
    }

    /// Get the current schema bundle, if one has been applied.
    pub fn current_schema(&self) -> Option<Arc<SchemaBundle>> {
        self.current_schema.read().clone()
    }

    /// Get the current schema, or an empty one.
    pub fn snapshot(&self) -> Arc<SchemaBundle> {
        self.current_schema()
            .unwrap_or_else(|| Arc::new(SchemaBundle::default()))
    }

    /// Get a schema bundle at a specific version.
    pub fn schema_at_version(&self, version: u64) -> Result<Option<SchemaBundle>, Error> {
        match self.schema_tree.get(version.to_be_bytes())? {
            Some(bytes) => Ok(Some(SchemaBundle::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Validate and apply a new schema bundle.
    ///
    /// The bundle is stored under the next version number, which is returned.
    pub fn apply_schema(&self, mut bundle: SchemaBundle) -> Result<u64, Error> {
        bundle.validate()?;

        let mut guard = self.current_schema.write();
        let new_version = self.current_version() + 1;
        bundle.version = new_version;

        self.schema_tree
            .insert(new_version.to_be_bytes(), bundle.to_bytes()?)?;
        self.meta_tree
            .insert(CURRENT_VERSION_KEY, &new_version.to_be_bytes())?;

        self.current_version.store(new_version, Ordering::SeqCst);
        *guard = Some(Arc::new(bundle));

        Ok(new_version)
    }

    /// Get an entity definition by name from the current schema.
    pub fn get_entity(&self, name: &str) -> Option<EntityDef> {
        self.current_schema
            .read()
            .as_ref()
            .and_then(|s| s.get_entity(name).cloned())
    }

    /// List all entity names in the current schema, sorted.
    pub fn list_entities(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .current_schema
            .read()
            .as_ref()
            .map(|s| s.entity_names().into_iter().map(String::from).collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}
