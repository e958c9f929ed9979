//! Fetch metrics.
//!
//! Counters are updated from every worker of a parallel fetch, so all of
//! them are atomics or sharded maps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

/// Counters collected across fetches.
#[derive(Debug, Default)]
pub struct FetchMetrics {
    fetches: AtomicU64,
    queries: AtomicU64,
    rows: AtomicU64,
    short_circuits: AtomicU64,
    failures: AtomicU64,
    queries_by_entity: DashMap<String, u64>,
}

/// Shared handle to fetch metrics.
pub type SharedFetchMetrics = Arc<FetchMetrics>;

/// Create a new shared metrics handle.
pub fn new_shared_metrics() -> SharedFetchMetrics {
    Arc::new(FetchMetrics::new())
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub fetches: u64,
    pub queries: u64,
    pub rows: u64,
    pub short_circuits: u64,
    pub failures: u64,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fetch call.
    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one store query issued for `entity`.
    pub fn record_query(&self, entity: &str) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        *self
            .queries_by_entity
            .entry(entity.to_string())
            .or_insert(0) += 1;
    }

    /// Record rows placed in a bucket.
    pub fn record_rows(&self, rows: u64) {
        self.rows.fetch_add(rows, Ordering::Relaxed);
    }

    /// Record an entity answered without a query.
    pub fn record_short_circuit(&self) {
        self.short_circuits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed entity.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Queries issued so far for `entity`.
    pub fn queries_for(&self, entity: &str) -> u64 {
        self.queries_by_entity.get(entity).map(|c| *c).unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fetches: self.fetches.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            rows: self.rows.load(Ordering::Relaxed),
            short_circuits: self.short_circuits.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = FetchMetrics::new();
        metrics.record_fetch();
        metrics.record_query("inverter");
        metrics.record_query("inverter");
        metrics.record_query("battery");
        metrics.record_rows(5);
        metrics.record_short_circuit();
        metrics.record_failure();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                fetches: 1,
                queries: 3,
                rows: 5,
                short_circuits: 1,
                failures: 1,
            }
        );
        assert_eq!(metrics.queries_for("inverter"), 2);
        assert_eq!(metrics.queries_for("sensor"), 0);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = new_shared_metrics();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.record_query("inverter");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.queries_for("inverter"), 400);
        assert_eq!(metrics.snapshot().queries, 400);
    }
}
