//! Join strategies for following a relation from a batch of parent rows.
//!
//! Every executor answers the same question: for each parent join key, which
//! rows of the target entity carry that key in the target join field. The
//! answer is aligned with the parent list, each group in target
//! primary-key order.
//!
//! - PrimaryKeyLookup: batched point reads when the join targets the identity field
//! - NestedLoop: single target scan, linear probe per parent
//! - HashJoin: single target scan into a hash table, O(1) probe per parent

use std::collections::{HashMap, HashSet};

use inspectr_proto::PrimaryKey;

use crate::error::Error;
use crate::storage::{Record, StorageEngine};

/// A target row matched during a join.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRow {
    pub pk: PrimaryKey,
    pub record: Record,
}

/// Matches per parent, aligned with the parent key list.
pub type JoinGroups = Vec<Vec<EntityRow>>;

/// Parent count above which a hash join is used.
pub const HASH_JOIN_PARENT_THRESHOLD: usize = 100;

/// Target row count above which a hash join is used.
pub const HASH_JOIN_CHILD_THRESHOLD: usize = 1000;

/// Join strategy selection for relation resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    /// Nested loop join - O(N*M), best for small datasets.
    NestedLoop,
    /// Hash join - O(N+M), best for larger datasets.
    HashJoin,
}

impl JoinStrategy {
    /// Select the join strategy based on cardinality estimates.
    ///
    /// Uses hash join when:
    /// - More than 100 parent rows, OR
    /// - Estimated child count exceeds 1000
    ///
    /// Otherwise uses nested loop for lower overhead on small sets.
    pub fn select(parent_count: usize, estimated_child_count: usize) -> Self {
        if parent_count > HASH_JOIN_PARENT_THRESHOLD
            || estimated_child_count > HASH_JOIN_CHILD_THRESHOLD
        {
            JoinStrategy::HashJoin
        } else {
            JoinStrategy::NestedLoop
        }
    }
}

/// Point lookups for joins whose target field is the target's identity.
pub struct PrimaryKeyLookup;

impl PrimaryKeyLookup {
    pub fn execute(
        storage: &StorageEngine,
        parent_keys: &[Option<PrimaryKey>],
        target_entity: &str,
    ) -> Result<JoinGroups, Error> {
        let wanted: Vec<PrimaryKey> = parent_keys.iter().flatten().cloned().collect();
        let found: HashMap<PrimaryKey, Record> =
            storage.get_many(target_entity, &wanted)?.into_iter().collect();

        Ok(parent_keys
            .iter()
            .map(|key| {
                key.as_ref()
                    .and_then(|k| found.get(k).map(|record| (k, record)))
                    .map(|(k, record)| {
                        vec![EntityRow {
                            pk: k.clone(),
                            record: record.clone(),
                        }]
                    })
                    .unwrap_or_default()
            })
            .collect())
    }
}

/// Hash join executor.
///
/// Algorithm:
/// 1. Build phase: scan the target once, build HashMap<join key, Vec<EntityRow>>
/// 2. Probe phase: look up each parent key in O(1)
///
/// Complexity: O(N + M) where N = parent count, M = target row count
pub struct HashJoinExecutor;

impl HashJoinExecutor {
    pub fn execute(
        storage: &StorageEngine,
        parent_keys: &[Option<PrimaryKey>],
        target_entity: &str,
        target_field: &str,
    ) -> Result<JoinGroups, Error> {
        let wanted: HashSet<&PrimaryKey> = parent_keys.iter().flatten().collect();

        // Build phase
        let mut by_key: HashMap<PrimaryKey, Vec<EntityRow>> = HashMap::new();
        for result in storage.scan_entity(target_entity) {
            let (pk, record) = result?;
            let join_key = match record.get(target_field).and_then(PrimaryKey::from_value) {
                Some(key) if wanted.contains(&key) => key,
                _ => continue,
            };
            by_key
                .entry(join_key)
                .or_default()
                .push(EntityRow { pk, record });
        }

        // Probe phase. Parents may share a key, so matches are cloned.
        Ok(parent_keys
            .iter()
            .map(|key| {
                key.as_ref()
                    .and_then(|k| by_key.get(k))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect())
    }
}

/// Nested loop join executor for small datasets.
///
/// Algorithm:
/// Scan the target once keeping rows whose join key belongs to any parent,
/// then probe the kept rows linearly for each parent.
pub struct NestedLoopExecutor;

impl NestedLoopExecutor {
    pub fn execute(
        storage: &StorageEngine,
        parent_keys: &[Option<PrimaryKey>],
        target_entity: &str,
        target_field: &str,
    ) -> Result<JoinGroups, Error> {
        let wanted: HashSet<&PrimaryKey> = parent_keys.iter().flatten().collect();

        let mut candidates: Vec<(PrimaryKey, EntityRow)> = Vec::new();
        for result in storage.scan_entity(target_entity) {
            let (pk, record) = result?;
            if let Some(key) = record.get(target_field).and_then(PrimaryKey::from_value) {
                if wanted.contains(&key) {
                    candidates.push((key, EntityRow { pk, record }));
                }
            }
        }

        Ok(parent_keys
            .iter()
            .map(|key| match key {
                Some(k) => candidates
                    .iter()
                    .filter(|(candidate, _)| candidate == k)
                    .map(|(_, row)| row.clone())
                    .collect(),
                None => Vec::new(),
            })
            .collect())
    }
}

/// Execute a join using the specified strategy.
pub fn execute_join(
    strategy: JoinStrategy,
    storage: &StorageEngine,
    parent_keys: &[Option<PrimaryKey>],
    target_entity: &str,
    target_field: &str,
) -> Result<JoinGroups, Error> {
    match strategy {
        JoinStrategy::NestedLoop => {
            NestedLoopExecutor::execute(storage, parent_keys, target_entity, target_field)
        }
        JoinStrategy::HashJoin => {
            HashJoinExecutor::execute(storage, parent_keys, target_entity, target_field)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageConfig;
    use inspectr_proto::Value;

    fn setup_test_storage() -> (StorageEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageEngine::open(StorageConfig::new(dir.path())).unwrap();
        (storage, dir)
    }

    fn insert_reading(storage: &StorageEngine, id: i64, sensor_id: Option<i64>) {
        let record = Record::new(vec![
            ("id".to_string(), Value::Int64(id)),
            ("sensor_id".to_string(), sensor_id.map(Value::Int64).into()),
        ]);
        storage.put("Reading", PrimaryKey::Int(id), &record).unwrap();
    }

    fn pks(group: &[EntityRow]) -> Vec<PrimaryKey> {
        group.iter().map(|r| r.pk.clone()).collect()
    }

    fn seed(storage: &StorageEngine) {
        insert_reading(storage, 10, Some(1));
        insert_reading(storage, 11, Some(2));
        insert_reading(storage, 12, Some(1));
        insert_reading(storage, 13, None);
        insert_reading(storage, 14, Some(9));
    }

    #[test]
    fn test_strategy_selection() {
        assert_eq!(JoinStrategy::select(10, 10), JoinStrategy::NestedLoop);
        assert_eq!(JoinStrategy::select(101, 10), JoinStrategy::HashJoin);
        assert_eq!(JoinStrategy::select(10, 1001), JoinStrategy::HashJoin);
    }

    #[test]
    fn test_hash_join_groups_per_parent() {
        let (storage, _dir) = setup_test_storage();
        seed(&storage);

        let parents = vec![Some(PrimaryKey::Int(1)), Some(PrimaryKey::Int(2)), None];
        let groups = HashJoinExecutor::execute(&storage, &parents, "Reading", "sensor_id").unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(pks(&groups[0]), vec![PrimaryKey::Int(10), PrimaryKey::Int(12)]);
        assert_eq!(pks(&groups[1]), vec![PrimaryKey::Int(11)]);
        assert!(groups[2].is_empty());
    }

    #[test]
    fn test_hash_join_shared_parent_keys() {
        let (storage, _dir) = setup_test_storage();
        seed(&storage);

        let parents = vec![Some(PrimaryKey::Int(1)), Some(PrimaryKey::Int(1))];
        let groups = HashJoinExecutor::execute(&storage, &parents, "Reading", "sensor_id").unwrap();

        assert_eq!(groups[0], groups[1]);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn test_hash_join_empty_parents() {
        let (storage, _dir) = setup_test_storage();
        seed(&storage);

        let groups = HashJoinExecutor::execute(&storage, &[], "Reading", "sensor_id").unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_nested_loop_same_results_as_hash_join() {
        let (storage, _dir) = setup_test_storage();
        seed(&storage);

        let parents = vec![
            Some(PrimaryKey::Int(2)),
            None,
            Some(PrimaryKey::Int(1)),
            Some(PrimaryKey::Int(5)),
        ];
        let nested =
            NestedLoopExecutor::execute(&storage, &parents, "Reading", "sensor_id").unwrap();
        let hashed = HashJoinExecutor::execute(&storage, &parents, "Reading", "sensor_id").unwrap();

        assert_eq!(nested, hashed);
    }

    #[test]
    fn test_primary_key_lookup() {
        let (storage, _dir) = setup_test_storage();
        seed(&storage);

        let parents = vec![
            Some(PrimaryKey::Int(12)),
            Some(PrimaryKey::Int(99)),
            None,
            Some(PrimaryKey::Int(12)),
        ];
        let groups = PrimaryKeyLookup::execute(&storage, &parents, "Reading").unwrap();

        assert_eq!(pks(&groups[0]), vec![PrimaryKey::Int(12)]);
        assert!(groups[1].is_empty());
        assert!(groups[2].is_empty());
        assert_eq!(groups[0], groups[3]);
    }
}
