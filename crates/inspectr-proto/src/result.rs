//! Result types returned by a fetch.

use std::collections::BTreeMap;

use crate::key::PrimaryKey;
use crate::relation::Cardinality;
use crate::value::Value;

/// One projected row: qualified field name to value.
#[derive(Debug, Clone, PartialEq)]
pub struct RowProjection {
    /// Primary key of the queried row this projection came from.
    pub origin: PrimaryKey,
    /// Qualified field values in request order.
    pub values: Vec<(String, Value)>,
}

impl RowProjection {
    /// Create a row projection.
    pub fn new(origin: PrimaryKey, values: Vec<(String, Value)>) -> Self {
        Self { origin, values }
    }

    /// Get a value by qualified field name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == field).map(|(_, v)| v)
    }

    /// Render as a JSON object of qualified field names.
    pub fn to_json(&self) -> serde_json::Value {
        let obj: serde_json::Map<String, serde_json::Value> = self
            .values
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        serde_json::Value::Object(obj)
    }
}

/// All projections fetched for one entity key.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityBucket {
    /// Cardinality the rows were aggregated under.
    pub cardinality: Cardinality,
    /// Rows in store order.
    pub rows: Vec<RowProjection>,
}

impl EntityBucket {
    /// Create an empty bucket.
    pub fn new(cardinality: Cardinality) -> Self {
        Self {
            cardinality,
            rows: Vec::new(),
        }
    }

    /// Create a bucket with rows.
    pub fn with_rows(cardinality: Cardinality, rows: Vec<RowProjection>) -> Self {
        Self { cardinality, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the bucket has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows keyed by origin. For `AtMostOne` buckets every origin appears once.
    pub fn by_origin(&self) -> BTreeMap<&PrimaryKey, &RowProjection> {
        self.rows.iter().map(|r| (&r.origin, r)).collect()
    }

    /// Rows grouped by origin, each group in store order.
    pub fn grouped(&self) -> BTreeMap<&PrimaryKey, Vec<&RowProjection>> {
        let mut groups: BTreeMap<&PrimaryKey, Vec<&RowProjection>> = BTreeMap::new();
        for row in &self.rows {
            groups.entry(&row.origin).or_default().push(row);
        }
        groups
    }

    /// Render as a JSON array of row objects.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.rows.iter().map(RowProjection::to_json).collect())
    }
}

/// Entity key to bucket. Built fresh for each fetch call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    buckets: BTreeMap<String, EntityBucket>,
}

impl ResultSet {
    /// Create an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the bucket for an entity key, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, bucket: EntityBucket) {
        self.buckets.insert(key.into(), bucket);
    }

    /// Get a bucket.
    pub fn get(&self, key: &str) -> Option<&EntityBucket> {
        self.buckets.get(key)
    }

    /// Whether a bucket exists for the key.
    pub fn contains(&self, key: &str) -> bool {
        self.buckets.contains_key(key)
    }

    /// Entity keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(|k| k.as_str())
    }

    /// Iterate buckets in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntityBucket)> {
        self.buckets.iter().map(|(k, b)| (k.as_str(), b))
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether there are no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total rows across buckets.
    pub fn total_rows(&self) -> usize {
        self.buckets.values().map(EntityBucket::len).sum()
    }

    /// Render as `{ entity: [ {field: value}, ... ] }`.
    pub fn to_json(&self) -> serde_json::Value {
        let obj: serde_json::Map<String, serde_json::Value> = self
            .buckets
            .iter()
            .map(|(key, bucket)| (key.clone(), bucket.to_json()))
            .collect();
        serde_json::Value::Object(obj)
    }
}
