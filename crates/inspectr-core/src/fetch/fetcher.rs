//! The projection fetcher: validate, resolve, execute, merge.

use inspectr_proto::{EntityBucket, Payload, RelationDescriptor, ResultSet};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::config::FetcherConfig;
use super::error::FetchError;
use super::executor::execute;
use super::metrics::{new_shared_metrics, FetchMetrics, SharedFetchMetrics};
use super::resolver::resolve;
use super::validator::{validate, ValidatedEntity};
use crate::model::ModelMap;

/// Everything one fetch produced.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Buckets of every entity that succeeded.
    pub results: ResultSet,
    /// Failures of every other reported entity, sorted by entity key.
    pub errors: Vec<FetchError>,
}

impl FetchOutcome {
    /// Whether no entity failed.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// The result set, or the first error in key order.
    pub fn into_strict(self) -> Result<ResultSet, FetchError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.results),
        }
    }

    /// Render results and errors as one JSON document.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "results": self.results.to_json(),
            "errors": self.errors.iter().map(FetchError::to_json).collect::<Vec<_>>(),
        })
    }
}

/// Fetches related-field projections for every entity of a payload.
///
/// The fetcher holds no per-call state; every call builds its own result
/// set, so it may be shared and called concurrently.
pub struct ProjectionFetcher<'m> {
    models: &'m ModelMap,
    config: FetcherConfig,
    metrics: SharedFetchMetrics,
}

impl<'m> ProjectionFetcher<'m> {
    pub fn new(models: &'m ModelMap) -> Self {
        Self {
            models,
            config: FetcherConfig::default(),
            metrics: new_shared_metrics(),
        }
    }

    pub fn with_config(mut self, config: FetcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Report into an existing metrics handle.
    pub fn with_metrics(mut self, metrics: SharedFetchMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn metrics(&self) -> &FetchMetrics {
        &self.metrics
    }

    /// Fetch every payload entity through `descriptor`.
    #[instrument(skip_all, fields(
        entities = payload.len(),
        kind = %descriptor.kind(),
        related_name = descriptor.related_name()
    ))]
    pub fn fetch(&self, payload: &Payload, descriptor: &RelationDescriptor) -> FetchOutcome {
        self.metrics.record_fetch();

        let report = validate(payload, self.models, &self.config);
        let mut errors = report.errors;

        let executed: Vec<(String, Result<EntityBucket, FetchError>)> = if self.config.parallel {
            report
                .plan
                .par_iter()
                .map(|entity| (entity.key.clone(), self.run(entity, descriptor)))
                .collect()
        } else {
            report
                .plan
                .iter()
                .map(|entity| (entity.key.clone(), self.run(entity, descriptor)))
                .collect()
        };

        let mut results = ResultSet::new();
        for (key, outcome) in executed {
            match outcome {
                Ok(bucket) => results.insert(key, bucket),
                Err(err) => errors.push(err),
            }
        }
        errors.sort_by(|a, b| a.entity.cmp(&b.entity));

        info!(
            buckets = results.len(),
            rows = results.total_rows(),
            errors = errors.len(),
            "fetch complete"
        );
        FetchOutcome { results, errors }
    }

    /// Fetch through a to-one foreign key named `related_name`.
    pub fn fetch_foreign_key(
        &self,
        payload: &Payload,
        related_name: &str,
    ) -> Result<FetchOutcome, inspectr_proto::Error> {
        let descriptor = RelationDescriptor::foreign_key(related_name)?;
        Ok(self.fetch(payload, &descriptor))
    }

    /// Fetch through a many-to-many relation named `related_name`.
    pub fn fetch_many_to_many(
        &self,
        payload: &Payload,
        related_name: &str,
    ) -> Result<FetchOutcome, inspectr_proto::Error> {
        let descriptor = RelationDescriptor::many_to_many(related_name)?;
        Ok(self.fetch(payload, &descriptor))
    }

    /// Fetch through a one-to-one relation named `related_name`.
    pub fn fetch_one_to_one(
        &self,
        payload: &Payload,
        related_name: &str,
    ) -> Result<FetchOutcome, inspectr_proto::Error> {
        let descriptor = RelationDescriptor::one_to_one(related_name)?;
        Ok(self.fetch(payload, &descriptor))
    }

    fn run(
        &self,
        entity: &ValidatedEntity,
        descriptor: &RelationDescriptor,
    ) -> Result<EntityBucket, FetchError> {
        let projection = resolve(descriptor, &entity.spec.params);
        debug!(entity = %entity.key, paths = ?projection.paths, "resolved projection");

        execute(entity, &projection, &self.config, &self.metrics).map_err(|err| {
            warn!(entity = %entity.key, error = %err.kind, "entity fetch failed");
            self.metrics.record_failure();
            err
        })
    }
}
