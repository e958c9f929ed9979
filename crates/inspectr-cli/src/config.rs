//! Command line arguments and run configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use inspectr_core::fetch::{FetchBudget, FetcherConfig, NullPolicy, UnknownEntityPolicy};
use inspectr_core::StorageConfig;
use inspectr_proto::RelationKind;

/// inspectr command line arguments.
#[derive(Debug, Parser)]
#[command(name = "inspectr")]
#[command(version, about = "Fetch related-field projections for a JSON payload")]
pub struct Args {
    /// JSON fixture with the schema and rows to load.
    #[arg(short, long)]
    pub fixture: PathBuf,

    /// JSON payload mapping entity keys to `{instances, params}`.
    #[arg(short, long)]
    pub payload: PathBuf,

    /// Relation name the params are qualified with.
    #[arg(short, long)]
    pub related_name: String,

    /// Relationship kind between the queried entities and the related one.
    #[arg(short, long, value_enum, default_value = "foreign-key")]
    pub kind: KindArg,

    /// What to do with rows that have no related record.
    #[arg(long, value_enum, default_value = "emit-nulls")]
    pub nulls: NullsArg,

    /// Omit unregistered payload keys instead of reporting them.
    #[arg(long)]
    pub skip_unknown: bool,

    /// Exit with an error if any entity fails.
    #[arg(long)]
    pub strict: bool,

    /// Fetch entities in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// Maximum primary keys per entity.
    #[arg(long, default_value_t = 10_000)]
    pub max_instances: usize,

    /// Maximum rows per entity.
    #[arg(long, default_value_t = 50_000)]
    pub max_rows: usize,

    /// Database directory. A temporary database is used when unset.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Page cache size in megabytes.
    #[arg(long, default_value_t = 256)]
    pub cache_mb: u64,

    /// Store rows uncompressed.
    #[arg(long)]
    pub no_compression: bool,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    ForeignKey,
    ManyToMany,
    OneToOne,
}

impl From<KindArg> for RelationKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::ForeignKey => RelationKind::ForeignKey,
            KindArg::ManyToMany => RelationKind::ManyToMany,
            KindArg::OneToOne => RelationKind::OneToOne,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NullsArg {
    EmitNulls,
    SkipUnmatched,
}

impl From<NullsArg> for NullPolicy {
    fn from(nulls: NullsArg) -> Self {
        match nulls {
            NullsArg::EmitNulls => NullPolicy::EmitNulls,
            NullsArg::SkipUnmatched => NullPolicy::SkipUnmatched,
        }
    }
}

/// Resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub fixture: PathBuf,
    pub payload: PathBuf,
    pub related_name: String,
    pub kind: RelationKind,
    pub fetcher: FetcherConfig,
    pub storage: StorageConfig,
    pub strict: bool,
    pub pretty: bool,
}

impl From<&Args> for RunConfig {
    fn from(args: &Args) -> Self {
        let unknown_entity = if args.skip_unknown {
            UnknownEntityPolicy::Skip
        } else {
            UnknownEntityPolicy::Report
        };

        let fetcher = FetcherConfig::new()
            .with_null_policy(args.nulls.into())
            .with_unknown_entity_policy(unknown_entity)
            .with_budget(FetchBudget::new(args.max_instances, args.max_rows))
            .with_parallel(args.parallel);

        let storage = match &args.db {
            Some(path) => StorageConfig::new(path),
            None => StorageConfig::temporary(),
        }
        .with_cache_capacity(args.cache_mb * 1024 * 1024)
        .with_compression(!args.no_compression);

        Self {
            fixture: args.fixture.clone(),
            payload: args.payload.clone(),
            related_name: args.related_name.clone(),
            kind: args.kind.into(),
            fetcher,
            storage,
            strict: args.strict,
            pretty: args.pretty,
        }
    }
}
