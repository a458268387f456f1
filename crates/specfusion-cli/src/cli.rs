//! Argument parsing for the `specfusion` ingestion CLI (§4.6, §6).

use clap::{Parser, Subcommand};

/// SpecFusion ingestion CLI: drives adapter syncs and registers OpenAPI sources.
#[derive(Debug, Parser)]
#[command(name = "specfusion", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the SQLite database file. Overrides `DB_PATH`.
    #[arg(long, global = true)]
    pub db_path: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sync one or more sources.
    Sync {
        /// Source id to sync (omit with `--all` to sync everything).
        source: Option<String>,
        /// Sync every registered source.
        #[arg(long)]
        all: bool,
        /// Cap the number of catalog entries fetched, for quick smoke runs.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List every registered source.
    ListSources {
        /// Print raw JSON instead of a formatted table.
        #[arg(long)]
        json: bool,
    },
    /// Register a dynamic OpenAPI source, optionally syncing it immediately.
    AddOpenapi {
        /// Stable source id to register the spec under.
        id: String,
        /// Human-readable display name.
        #[arg(long)]
        name: String,
        /// URL of the OpenAPI/Swagger document (JSON or YAML).
        #[arg(long)]
        spec_url: String,
        /// Sync the new source immediately after registering it.
        #[arg(long)]
        sync: bool,
    },
}
