//! Client payloads.
//!
//! A payload maps entity keys to filter specs:
//!
//! ```json
//! {
//!     "inverter": { "instances": [1, 2], "params": ["i_current", "v_current"] },
//!     "battery":  { "instances": [5, 6, 7], "params": ["temperature"] }
//! }
//! ```
//!
//! Entries are kept as raw JSON until validation so that one malformed entry
//! can be reported on its own without rejecting its neighbours.

use std::collections::{BTreeMap, HashSet};

use crate::error::Error;
use crate::key::PrimaryKey;

/// Field name for the primary key list.
pub const INSTANCES_KEY: &str = "instances";

/// Field name for the projected field list.
pub const PARAMS_KEY: &str = "params";

/// A client request: entity key to raw filter spec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    entries: BTreeMap<String, serde_json::Value>,
}

impl Payload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a payload from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json(json)
    }

    /// Build a payload from a JSON document. The top level must be an object.
    pub fn from_json(json: serde_json::Value) -> Result<Self, Error> {
        match json {
            serde_json::Value::Object(map) => Ok(Self {
                entries: map.into_iter().collect(),
            }),
            other => Err(Error::InvalidPayload(format!(
                "expected an object of entity keys, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Add a well-formed entry.
    pub fn with_entity(mut self, key: impl Into<String>, spec: FilterSpec) -> Self {
        self.entries.insert(key.into(), spec.to_json());
        self
    }

    /// Add an entry as raw JSON, exactly as a client would send it.
    pub fn with_raw(mut self, key: impl Into<String>, raw: serde_json::Value) -> Self {
        self.entries.insert(key.into(), raw);
        self
    }

    /// Iterate entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate entity keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    /// Get the raw entry for an entity key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    /// Number of entity keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the payload names no entities.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rows to select and related fields to project for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    /// Primary keys to select, deduplicated in first-seen order.
    pub instances: Vec<PrimaryKey>,
    /// Field names on the related entity, deduplicated in first-seen order.
    pub params: Vec<String>,
}

impl FilterSpec {
    /// Create a filter spec, collapsing duplicate keys and params.
    pub fn new<K, P>(
        instances: impl IntoIterator<Item = K>,
        params: impl IntoIterator<Item = P>,
    ) -> Self
    where
        K: Into<PrimaryKey>,
        P: Into<String>,
    {
        Self {
            instances: dedup(instances.into_iter().map(Into::into)),
            params: dedup(params.into_iter().map(Into::into)),
        }
    }

    /// Validate a raw entry.
    ///
    /// `instances` must be an array (possibly empty) of integer or string
    /// keys. `params` must be a non-empty array of non-empty strings. Other
    /// members are ignored.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, Error> {
        let obj = raw.as_object().ok_or_else(|| {
            Error::MalformedFilterSpec(format!("expected an object, got {}", json_kind(raw)))
        })?;

        let instances = obj
            .get(INSTANCES_KEY)
            .ok_or_else(|| Error::MalformedFilterSpec(format!("missing `{}`", INSTANCES_KEY)))?
            .as_array()
            .ok_or_else(|| {
                Error::MalformedFilterSpec(format!("`{}` must be an array", INSTANCES_KEY))
            })?;

        let mut keys = Vec::with_capacity(instances.len());
        for (i, item) in instances.iter().enumerate() {
            let key = PrimaryKey::from_json(item).map_err(|_| {
                Error::MalformedFilterSpec(format!(
                    "`{}[{}]` must be an integer or string primary key, got {}",
                    INSTANCES_KEY,
                    i,
                    json_kind(item)
                ))
            })?;
            keys.push(key);
        }

        let params = obj
            .get(PARAMS_KEY)
            .ok_or_else(|| Error::MalformedFilterSpec(format!("missing `{}`", PARAMS_KEY)))?
            .as_array()
            .ok_or_else(|| {
                Error::MalformedFilterSpec(format!("`{}` must be an array", PARAMS_KEY))
            })?;

        if params.is_empty() {
            return Err(Error::MalformedFilterSpec(format!(
                "`{}` must name at least one field",
                PARAMS_KEY
            )));
        }

        let mut fields = Vec::with_capacity(params.len());
        for (i, item) in params.iter().enumerate() {
            match item.as_str() {
                Some(name) if !name.is_empty() => fields.push(name.to_string()),
                Some(_) => {
                    return Err(Error::MalformedFilterSpec(format!(
                        "`{}[{}]` is an empty field name",
                        PARAMS_KEY, i
                    )))
                }
                None => {
                    return Err(Error::MalformedFilterSpec(format!(
                        "`{}[{}]` must be a string, got {}",
                        PARAMS_KEY,
                        i,
                        json_kind(item)
                    )))
                }
            }
        }

        Ok(Self::new(keys, fields))
    }

    /// Render as the JSON a client would send.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "instances": self.instances.iter().map(PrimaryKey::to_json).collect::<Vec<_>>(),
            "params": self.params,
        })
    }
}

fn dedup<T: Clone + Eq + std::hash::Hash>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
