//! Storage configuration.

use std::path::PathBuf;

/// Configuration for the storage engine.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path to the database directory.
    pub path: PathBuf,

    /// Page cache capacity in bytes.
    pub cache_capacity: u64,

    /// Enable zstd compression.
    pub compression: bool,

    /// Temporary database (deleted on drop).
    pub temporary: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./inspectr_data"),
            cache_capacity: 256 * 1024 * 1024,
            compression: true,
            temporary: false,
        }
    }
}

impl StorageConfig {
    /// Create a new configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a temporary configuration for testing and one-shot runs.
    pub fn temporary() -> Self {
        Self {
            path: PathBuf::from(""),
            temporary: true,
            ..Default::default()
        }
    }

    /// Set the page cache capacity.
    pub fn with_cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Enable or disable compression.
    pub fn with_compression(mut self, compression: bool) -> Self {
        self.compression = compression;
        self
    }

    /// Convert to sled configuration.
    pub(crate) fn to_sled_config(&self) -> sled::Config {
        let mut config = sled::Config::new()
            .cache_capacity(self.cache_capacity)
            .use_compression(self.compression);

        if self.temporary {
            config = config.temporary(true);
        } else {
            config = config.path(&self.path);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = StorageConfig::new("/tmp/inspectr")
            .with_cache_capacity(1024)
            .with_compression(false);

        assert_eq!(config.path, PathBuf::from("/tmp/inspectr"));
        assert_eq!(config.cache_capacity, 1024);
        assert!(!config.compression);
        assert!(!config.temporary);
        assert!(StorageConfig::temporary().temporary);
    }
}
