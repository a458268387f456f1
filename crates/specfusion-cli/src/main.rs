//! Entry point for the `specfusion` ingestion CLI (§4.6, §6).
//!
//! Operates directly against the same SQLite file the server serves from
//! (coordinated through SQLite's WAL mode) rather than proxying every sync
//! through the HTTP admin API: the adapters already run inside this process,
//! so there is no reason to round-trip fetched content over the network to
//! reach the same database.

mod cli;
mod commands;

use std::path::PathBuf;

use clap::Parser;
use cli::{Cli, Commands};
use specfusion_core::adapters::openapi::OpenApiSource;
use specfusion_core::adapters::registry::SourceRegistry;
use specfusion_core::config::IngestConfig;
use specfusion_core::store::DocStore;
use specfusion_core::tokenizer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")))
        .init();

    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let ingest_config = IngestConfig::from_env()?;

    let db_path = cli
        .db_path
        .map(PathBuf::from)
        .or_else(|| std::env::var("DB_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./data/specfusion.db"));
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tokenizer::init_tokenizer(None)?;
    let store = DocStore::open(&db_path)?;
    let mut registry = SourceRegistry::new(&ingest_config);
    restore_dynamic_sources(&store, &mut registry)?;

    match cli.command {
        Commands::Sync { source, all, limit } => {
            commands::sync::run(&store, &registry, source.as_deref(), all, limit).await?;
        },
        Commands::ListSources { json } => {
            commands::list_sources::run(&store, json)?;
        },
        Commands::AddOpenapi { id, name, spec_url, sync } => {
            commands::add_openapi::run(&store, &mut registry, &id, &name, &spec_url, sync).await?;
        },
    }

    Ok(())
}

/// Re-register OpenAPI sources that were added in a previous invocation,
/// reading their `spec_url` back out of the `sources.config` JSON blob.
fn restore_dynamic_sources(store: &DocStore, registry: &mut SourceRegistry) -> anyhow::Result<()> {
    for source in store.get_sources()? {
        let Some(config) = source.config.as_deref() else { continue };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(config) else { continue };
        if value.get("kind").and_then(|v| v.as_str()) != Some("openapi") {
            continue;
        }
        let Some(spec_url) = value.get("spec_url").and_then(|v| v.as_str()) else { continue };
        registry.register_openapi(OpenApiSource {
            id: source.id.clone(),
            name: source.name.clone(),
            spec_url: spec_url.to_string(),
        });
    }
    Ok(())
}
