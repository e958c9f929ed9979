//! Storage engine implementation.

use super::key::{entity_prefix, RowKey};
use super::{Record, StorageConfig};
use crate::error::Error;
use inspectr_proto::PrimaryKey;
use sled::{Db, Tree};

/// Tree name for entity rows.
const DATA_TREE: &str = "data";

/// The storage engine wrapping sled.
///
/// Rows live in a single tree keyed by [`RowKey`], so every entity is a
/// contiguous, primary-key-ordered key range.
pub struct StorageEngine {
    /// The underlying sled database.
    db: Db,

    /// Tree for entity rows.
    data_tree: Tree,
}

impl StorageEngine {
    /// Open or create a storage engine with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let data_tree = db.open_tree(DATA_TREE)?;

        Ok(Self { db, data_tree })
    }

    /// Get the underlying sled database, for opening a catalog beside the rows.
    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Insert or replace a row.
    pub fn put(&self, entity: &str, pk: PrimaryKey, record: &Record) -> Result<(), Error> {
        let key = RowKey::new(entity, pk);
        self.data_tree.insert(key.encode(), record.to_bytes()?)?;
        Ok(())
    }

    /// Get one row by primary key.
    pub fn get(&self, entity: &str, pk: &PrimaryKey) -> Result<Option<Record>, Error> {
        let key = RowKey::new(entity, pk.clone());
        match self.data_tree.get(key.encode())? {
            Some(bytes) => Ok(Some(Record::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get every existing row among `pks`.
    ///
    /// Rows come back once each, in primary-key order; keys with no row are
    /// skipped.
    pub fn get_many(
        &self,
        entity: &str,
        pks: &[PrimaryKey],
    ) -> Result<Vec<(PrimaryKey, Record)>, Error> {
        let mut wanted: Vec<&PrimaryKey> = pks.iter().collect();
        wanted.sort();
        wanted.dedup();

        let mut rows = Vec::with_capacity(wanted.len());
        for pk in wanted {
            if let Some(record) = self.get(entity, pk)? {
                rows.push((pk.clone(), record));
            }
        }
        Ok(rows)
    }

    /// Scan all rows of an entity in primary-key order.
    pub fn scan_entity(
        &self,
        entity: &str,
    ) -> impl Iterator<Item = Result<(PrimaryKey, Record), Error>> + '_ {
        self.data_tree
            .scan_prefix(entity_prefix(entity))
            .map(|result| {
                let (key_bytes, value_bytes) = result?;
                let key = RowKey::decode(&key_bytes).ok_or(Error::InvalidKey)?;
                let record = Record::from_bytes(&value_bytes)?;
                Ok((key.pk, record))
            })
    }

    /// Count rows of an entity without decoding them, stopping at `limit`.
    ///
    /// Join planning only needs to know whether an entity is larger than a
    /// threshold, so callers pass the threshold plus one.
    pub fn count_entity_up_to(&self, entity: &str, limit: usize) -> usize {
        self.data_tree
            .scan_prefix(entity_prefix(entity))
            .keys()
            .take(limit)
            .count()
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspectr_proto::Value;

    struct TestDb {
        engine: StorageEngine,
        _dir: tempfile::TempDir,
    }

    impl std::ops::Deref for TestDb {
        type Target = StorageEngine;
        fn deref(&self) -> &Self::Target {
            &self.engine
        }
    }

    fn test_engine() -> TestDb {
        let dir = tempfile::tempdir().unwrap();
        let engine = StorageEngine::open(StorageConfig::new(dir.path())).unwrap();
        TestDb { engine, _dir: dir }
    }

    fn sensor(id: i64, current: f64) -> Record {
        Record::new(vec![
            ("id".into(), Value::Int64(id)),
            ("i_current".into(), Value::Float64(current)),
        ])
    }

    #[test]
    fn test_put_and_get() {
        let engine = test_engine();
        engine.put("Sensor", PrimaryKey::Int(1), &sensor(1, 3.3)).unwrap();

        let record = engine.get("Sensor", &PrimaryKey::Int(1)).unwrap().unwrap();
        assert_eq!(record.get("i_current"), Some(&Value::Float64(3.3)));
        assert!(engine.get("Sensor", &PrimaryKey::Int(2)).unwrap().is_none());
        assert!(engine.get("Inverter", &PrimaryKey::Int(1)).unwrap().is_none());
    }

    #[test]
    fn test_put_replaces() {
        let engine = test_engine();
        engine.put("Sensor", PrimaryKey::Int(1), &sensor(1, 3.3)).unwrap();
        engine.put("Sensor", PrimaryKey::Int(1), &sensor(1, 4.4)).unwrap();

        let record = engine.get("Sensor", &PrimaryKey::Int(1)).unwrap().unwrap();
        assert_eq!(record.get("i_current"), Some(&Value::Float64(4.4)));
        assert_eq!(engine.count_entity_up_to("Sensor", usize::MAX), 1);
    }

    #[test]
    fn test_get_many_orders_and_dedups() {
        let engine = test_engine();
        for id in [3, 1, 2] {
            engine.put("Sensor", PrimaryKey::Int(id), &sensor(id, 0.0)).unwrap();
        }

        let rows = engine
            .get_many(
                "Sensor",
                &[
                    PrimaryKey::Int(3),
                    PrimaryKey::Int(9),
                    PrimaryKey::Int(1),
                    PrimaryKey::Int(3),
                ],
            )
            .unwrap();

        let ids: Vec<PrimaryKey> = rows.into_iter().map(|(pk, _)| pk).collect();
        assert_eq!(ids, vec![PrimaryKey::Int(1), PrimaryKey::Int(3)]);
    }

    #[test]
    fn test_scan_entity_is_isolated_and_ordered() {
        let engine = test_engine();
        for id in [10, -5, 2] {
            engine.put("Sensor", PrimaryKey::Int(id), &sensor(id, 0.0)).unwrap();
        }
        engine.put("SensorLog", PrimaryKey::Int(1), &sensor(1, 0.0)).unwrap();

        let ids: Vec<PrimaryKey> = engine
            .scan_entity("Sensor")
            .map(|r| r.unwrap().0)
            .collect();

        assert_eq!(
            ids,
            vec![PrimaryKey::Int(-5), PrimaryKey::Int(2), PrimaryKey::Int(10)]
        );
    }

    #[test]
    fn test_count_entity_stops_at_limit() {
        let engine = test_engine();
        for id in 0..5 {
            engine.put("Sensor", PrimaryKey::Int(id), &sensor(id, 0.0)).unwrap();
        }
        engine.put("SensorLog", PrimaryKey::Int(1), &sensor(1, 0.0)).unwrap();

        assert_eq!(engine.count_entity_up_to("Sensor", usize::MAX), 5);
        assert_eq!(engine.count_entity_up_to("Sensor", 3), 3);
        assert_eq!(engine.count_entity_up_to("Inverter", 3), 0);
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = StorageEngine::open(StorageConfig::new(dir.path())).unwrap();
            engine.put("Sensor", PrimaryKey::Int(7), &sensor(7, 1.0)).unwrap();
            engine.flush().unwrap();
        }

        let engine = StorageEngine::open(StorageConfig::new(dir.path())).unwrap();
        assert!(engine.get("Sensor", &PrimaryKey::Int(7)).unwrap().is_some());
    }
}
