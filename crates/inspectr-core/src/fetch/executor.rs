//! Batch execution: one store query per entity.

use std::collections::HashSet;

use inspectr_proto::{Cardinality, EntityBucket, PrimaryKey, RowProjection};
use tracing::{debug, instrument};

use super::config::{FetcherConfig, NullPolicy};
use super::error::{FetchError, FetchErrorKind};
use super::metrics::FetchMetrics;
use super::resolver::ResolvedProjection;
use super::validator::ValidatedEntity;

/// Run the projection query for one entity and fold its rows into a bucket.
///
/// The bucket is returned whole or not at all. Empty `instances` return an
/// empty bucket without touching the store.
#[instrument(skip_all, fields(entity = %entity.key, kind = %projection.kind))]
pub fn execute(
    entity: &ValidatedEntity,
    projection: &ResolvedProjection,
    config: &FetcherConfig,
    metrics: &FetchMetrics,
) -> Result<EntityBucket, FetchError> {
    let ids = &entity.spec.instances;
    if ids.is_empty() {
        debug!("no instances requested; skipping query");
        metrics.record_short_circuit();
        return Ok(EntityBucket::new(projection.cardinality));
    }

    let fail = |kind: FetchErrorKind| FetchError::new(entity.key.clone(), kind);
    let budget = &config.budget;

    if ids.len() > budget.max_instances {
        return Err(fail(FetchErrorKind::BudgetExceeded {
            what: "instances",
            limit: budget.max_instances,
            actual: ids.len(),
        }));
    }

    let store_error = |source: crate::error::Error| {
        fail(FetchErrorKind::Store {
            paths: projection.paths.clone(),
            source,
        })
    };

    let requested: HashSet<&PrimaryKey> = ids.iter().collect();
    let mut seen: HashSet<PrimaryKey> = HashSet::new();
    let mut rows = Vec::new();

    metrics.record_query(&entity.key);
    let stream = entity
        .handle
        .filter_by_primary_keys(ids)
        .project(&projection.paths)
        .map_err(store_error)?;

    for row in stream {
        let row = row.map_err(store_error)?;

        if !requested.contains(&row.origin) {
            return Err(fail(FetchErrorKind::ForeignRow { origin: row.origin }));
        }

        if projection.cardinality == Cardinality::AtMostOne && !seen.insert(row.origin.clone()) {
            return Err(fail(FetchErrorKind::CardinalityViolation { origin: row.origin }));
        }

        if !row.matched && config.null_policy == NullPolicy::SkipUnmatched {
            continue;
        }

        rows.push(RowProjection::new(row.origin, row.values));
        if rows.len() > budget.max_rows {
            return Err(fail(FetchErrorKind::BudgetExceeded {
                what: "rows",
                limit: budget.max_rows,
                actual: rows.len(),
            }));
        }
    }

    debug!(rows = rows.len(), "entity fetched");
    metrics.record_rows(rows.len() as u64);
    Ok(EntityBucket::with_rows(projection.cardinality, rows))
}
