//! `specfusion sync` (§4.6).

use std::sync::Arc;

use specfusion_core::adapters::registry::SourceRegistry;
use specfusion_core::store::DocStore;
use specfusion_core::sync::SyncRunner;
use specfusion_core::types::SyncStatus;

/// Run the sync pipeline for `source` (or every registered source when
/// `all` is set). Returns `Ok(())` only if every targeted source reached
/// `Success`; any failure maps the binary to exit code 1.
pub async fn run(store: &DocStore, registry: &SourceRegistry, source: Option<&str>, all: bool, limit: Option<usize>) -> anyhow::Result<()> {
    let targets: Vec<String> = if all {
        registry.source_ids()
    } else if let Some(source) = source {
        vec![source.to_string()]
    } else {
        anyhow::bail!("specify a source id or pass --all");
    };

    let runner = SyncRunner::new(store);
    let mut any_failed = false;

    for source_id in targets {
        let adapter = registry.resolve(&source_id)?;
        if store.get_source(&source_id)?.is_none() {
            store.upsert_source(&source_id, &source_id, None)?;
        }
        let adapter: Arc<dyn specfusion_core::adapters::Adapter> = adapter;
        match runner.run(adapter, limit).await {
            Ok(report) => {
                println!(
                    "{source_id}: {} (created={} updated={} unchanged={} errors={})",
                    status_label(report.status),
                    report.counts.created,
                    report.counts.updated,
                    report.counts.unchanged,
                    report.counts.errors,
                );
                if report.status != SyncStatus::Success {
                    any_failed = true;
                }
            },
            Err(err) => {
                eprintln!("{source_id}: failed — {err}");
                any_failed = true;
            },
        }
    }

    if any_failed {
        anyhow::bail!("one or more sources failed to sync");
    }
    Ok(())
}

fn status_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Success => "ok",
        SyncStatus::Failed => "failed",
        SyncStatus::Running => "running",
    }
}
