//! Fetcher configuration.

/// What happens to a queried row that has no related record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NullPolicy {
    /// Keep the row with every related path set to null (left outer join).
    #[default]
    EmitNulls,
    /// Drop the row.
    SkipUnmatched,
}

/// What happens to a payload key with no registered handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownEntityPolicy {
    /// Report an `UnknownEntity` error for the key.
    #[default]
    Report,
    /// Omit the key without an error.
    Skip,
}

/// Per-entity limits on one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchBudget {
    /// Maximum primary keys requested for one entity.
    pub max_instances: usize,
    /// Maximum rows returned for one entity.
    pub max_rows: usize,
}

impl Default for FetchBudget {
    fn default() -> Self {
        Self {
            max_instances: 10_000,
            max_rows: 50_000,
        }
    }
}

impl FetchBudget {
    /// Create a budget with custom limits.
    pub fn new(max_instances: usize, max_rows: usize) -> Self {
        Self {
            max_instances,
            max_rows,
        }
    }

    /// Create an unlimited budget (use with caution).
    pub fn unlimited() -> Self {
        Self {
            max_instances: usize::MAX,
            max_rows: usize::MAX,
        }
    }
}

/// Configuration for a [`ProjectionFetcher`](super::ProjectionFetcher).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetcherConfig {
    pub null_policy: NullPolicy,
    pub unknown_entity: UnknownEntityPolicy,
    pub budget: FetchBudget,
    /// Run entities on the rayon pool instead of one after another.
    pub parallel: bool,
}

impl FetcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = policy;
        self
    }

    pub fn with_unknown_entity_policy(mut self, policy: UnknownEntityPolicy) -> Self {
        self.unknown_entity = policy;
        self
    }

    pub fn with_budget(mut self, budget: FetchBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetcherConfig::default();
        assert_eq!(config.null_policy, NullPolicy::EmitNulls);
        assert_eq!(config.unknown_entity, UnknownEntityPolicy::Report);
        assert_eq!(config.budget, FetchBudget::default());
        assert!(!config.parallel);
    }

    #[test]
    fn test_builders() {
        let config = FetcherConfig::new()
            .with_null_policy(NullPolicy::SkipUnmatched)
            .with_unknown_entity_policy(UnknownEntityPolicy::Skip)
            .with_budget(FetchBudget::new(5, 10))
            .with_parallel(true);

        assert_eq!(config.null_policy, NullPolicy::SkipUnmatched);
        assert_eq!(config.unknown_entity, UnknownEntityPolicy::Skip);
        assert_eq!(config.budget.max_rows, 10);
        assert!(config.parallel);
    }
}
