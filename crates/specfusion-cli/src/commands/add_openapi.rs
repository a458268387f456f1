//! `specfusion add-openapi` — register a dynamic OpenAPI/Swagger source.

use std::sync::Arc;

use specfusion_core::adapters::openapi::OpenApiSource;
use specfusion_core::adapters::registry::SourceRegistry;
use specfusion_core::store::DocStore;
use specfusion_core::sync::SyncRunner;

/// Config blob stored on the `sources` row so a later CLI invocation can
/// reconstruct the registration without re-prompting the user.
#[derive(serde::Serialize)]
struct OpenApiConfig<'a> {
    kind: &'static str,
    spec_url: &'a str,
}

pub async fn run(
    store: &DocStore,
    registry: &mut SourceRegistry,
    id: &str,
    name: &str,
    spec_url: &str,
    sync: bool,
) -> anyhow::Result<()> {
    let config = serde_json::to_string(&OpenApiConfig { kind: "openapi", spec_url })?;
    store.upsert_source(id, name, Some(spec_url))?;
    store.set_source_config(id, &config)?;

    let source = OpenApiSource { id: id.to_string(), name: name.to_string(), spec_url: spec_url.to_string() };
    registry.register_openapi(source);
    println!("registered OpenAPI source '{id}'");

    if sync {
        let adapter = registry.resolve(id)?;
        let adapter: Arc<dyn specfusion_core::adapters::Adapter> = adapter;
        let runner = SyncRunner::new(store);
        let report = runner.run(adapter, None).await?;
        println!(
            "{id}: synced (created={} updated={} unchanged={} errors={})",
            report.counts.created, report.counts.updated, report.counts.unchanged, report.counts.errors
        );
    }

    Ok(())
}
