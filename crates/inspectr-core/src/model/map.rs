//! Registry of entity handles addressable by payload key.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::EntityHandle;

/// Maps payload entity keys to store handles.
///
/// Owned by the caller and shared read-only with every fetch.
#[derive(Clone, Default)]
pub struct ModelMap {
    handles: HashMap<String, Arc<dyn EntityHandle>>,
}

impl ModelMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle under `key`, returning any handle it replaces.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        handle: Arc<dyn EntityHandle>,
    ) -> Option<Arc<dyn EntityHandle>> {
        self.handles.insert(key.into(), handle)
    }

    /// Builder form of [`ModelMap::register`].
    pub fn with(mut self, key: impl Into<String>, handle: Arc<dyn EntityHandle>) -> Self {
        self.register(key, handle);
        self
    }

    /// Look up the handle registered under `key`.
    pub fn get(&self, key: &str) -> Option<&Arc<dyn EntityHandle>> {
        self.handles.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handles.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.handles.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl fmt::Debug for ModelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for key in self.keys() {
            if let Some(handle) = self.handles.get(key) {
                map.entry(&key, &handle.entity());
            }
        }
        map.finish()
    }
}
