//! `specfusion list-sources`.

use specfusion_core::store::DocStore;

pub fn run(store: &DocStore, json: bool) -> anyhow::Result<()> {
    let sources = store.get_sources()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    if sources.is_empty() {
        println!("no sources registered yet");
        return Ok(());
    }

    println!("{:<24} {:<28} {:<24}", "ID", "NAME", "LAST SYNCED");
    for source in sources {
        let last_synced = source
            .last_synced
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!("{:<24} {:<28} {:<24}", source.id, source.name, last_synced);
    }
    Ok(())
}
