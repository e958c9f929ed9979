//! Payload validation.

use std::sync::Arc;

use inspectr_proto::{FilterSpec, Payload};
use tracing::debug;

use super::config::{FetcherConfig, UnknownEntityPolicy};
use super::error::{FetchError, FetchErrorKind};
use crate::model::{EntityHandle, ModelMap};

/// A payload entry that passed validation.
#[derive(Clone)]
pub struct ValidatedEntity {
    /// Payload key.
    pub key: String,
    /// Handle registered under the key.
    pub handle: Arc<dyn EntityHandle>,
    /// The decoded filter spec.
    pub spec: FilterSpec,
}

impl std::fmt::Debug for ValidatedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedEntity")
            .field("key", &self.key)
            .field("entity", &self.handle.entity())
            .field("spec", &self.spec)
            .finish()
    }
}

/// Outcome of validating a whole payload.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Entries ready to execute, in key order.
    pub plan: Vec<ValidatedEntity>,
    /// Rejected entries, in key order.
    pub errors: Vec<FetchError>,
}

/// Check every payload entry independently.
///
/// A bad entry never rejects its neighbours. Nothing is queried here.
pub fn validate(payload: &Payload, models: &ModelMap, config: &FetcherConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (key, raw) in payload.entries() {
        let Some(handle) = models.get(key) else {
            match config.unknown_entity {
                UnknownEntityPolicy::Report => {
                    report
                        .errors
                        .push(FetchError::new(key, FetchErrorKind::UnknownEntity));
                }
                UnknownEntityPolicy::Skip => {
                    debug!(entity = key, "skipping unregistered entity");
                }
            }
            continue;
        };

        match FilterSpec::from_json(raw) {
            Ok(spec) => report.plan.push(ValidatedEntity {
                key: key.to_string(),
                handle: handle.clone(),
                spec,
            }),
            Err(err) => {
                let reason = match err {
                    inspectr_proto::Error::MalformedFilterSpec(reason) => reason,
                    other => other.to_string(),
                };
                report.errors.push(FetchError::new(
                    key,
                    FetchErrorKind::MalformedFilterSpec { reason },
                ));
            }
        }
    }

    report
}
