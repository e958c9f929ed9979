//! inspectr command-line front end.
//!
//! Loads a JSON fixture into a sled store, runs a payload through the
//! projection fetcher, and prints the JSON outcome on stdout.

mod config;
mod fixture;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use inspectr_core::{Catalog, CatalogModel, ModelMap, ProjectionFetcher, RecordWriter, StorageEngine};
use inspectr_proto::{Payload, RelationDescriptor};
use tracing::{info, warn};

use config::{Args, RunConfig};
use fixture::Fixture;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("inspectr=info,inspectr_core=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = RunConfig::from(&args);

    info!(
        fixture = %config.fixture.display(),
        payload = %config.payload.display(),
        kind = %config.kind,
        related_name = %config.related_name,
        "Starting inspectr"
    );

    let descriptor = RelationDescriptor::new(config.kind, config.related_name.clone())?;

    let storage = Arc::new(StorageEngine::open(config.storage.clone()).context("opening store")?);
    let catalog = Arc::new(Catalog::open(storage.db())?);
    let writer = RecordWriter::new(storage.clone(), catalog.clone());
    Fixture::read(&config.fixture)?.load(&catalog, &writer)?;

    let mut models = ModelMap::new();
    let registered = CatalogModel::register_all(&mut models, &storage, &catalog);
    info!(entities = registered, "models registered");

    let text = std::fs::read_to_string(&config.payload)
        .with_context(|| format!("reading payload {}", config.payload.display()))?;
    let payload = Payload::from_json_str(&text)?;

    let fetcher = ProjectionFetcher::new(&models).with_config(config.fetcher.clone());
    let outcome = fetcher.fetch(&payload, &descriptor);

    let json = outcome.to_json();
    let rendered = if config.pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    println!("{}", rendered);

    for err in &outcome.errors {
        warn!(entity = %err.entity, error = %err.kind, "entity failed");
    }
    if config.strict {
        outcome.into_strict()?;
    }

    Ok(())
}
