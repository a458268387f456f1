//! Pinduoduo (拼多多) open-platform adapter (§4.5).
//!
//! Pinduoduo's portal sits behind a login wall the sync client can't drive
//! interactively, so this adapter supports two modes: a cookie-authenticated
//! fetch (`PDD_COOKIE`), and a local JSON dump fallback (`PDD_JSON_PATH`) for
//! operators who export the catalog by hand. At least one must be configured.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use super::rate_limit::jittered_delay;
use super::{extract, Adapter, DocContent, DocEntry};
use crate::types::DocType;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct DumpEntry {
    path: String,
    title: String,
    content: String,
}

/// Fetches (or replays a local dump of) Pinduoduo's open-platform API reference.
pub struct PinduoduoAdapter {
    client: reqwest::Client,
    cookie: Option<String>,
    dump_path: Option<PathBuf>,
}

impl PinduoduoAdapter {
    /// Build an adapter from ingest configuration. At least one of `cookie`
    /// or `dump_path` should be set, or every sync attempt will fail fatally.
    #[must_use]
    pub fn new(client: reqwest::Client, cookie: Option<String>, dump_path: Option<PathBuf>) -> Self {
        Self { client, cookie, dump_path }
    }

    fn load_dump(&self) -> Result<Vec<DumpEntry>> {
        let path = self
            .dump_path
            .as_ref()
            .ok_or_else(|| Error::Config("pinduoduo adapter needs PDD_COOKIE or PDD_JSON_PATH configured".to_string()))?;
        let body = std::fs::read_to_string(path)?;
        serde_json::from_str(&body).map_err(Error::from)
    }

    async fn fetch_via_cookie(&self) -> Result<Vec<DumpEntry>> {
        let cookie = self.cookie.as_deref().ok_or_else(|| Error::Config("PDD_COOKIE not set".to_string()))?;
        jittered_delay(std::time::Duration::from_millis(500)).await;
        let resp = self
            .client
            .get("https://open.pinduoduo.com/application/document/catalog.json")
            .header(reqwest::header::COOKIE, cookie)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::AntiBot("pinduoduo rejected the configured cookie".to_string()));
        }
        let body = resp.error_for_status()?.text().await?;
        serde_json::from_str(&body).map_err(Error::from)
    }
}

#[async_trait]
impl Adapter for PinduoduoAdapter {
    fn source_id(&self) -> &str {
        "pinduoduo"
    }

    async fn fetch_catalog(&self) -> Result<Vec<DocEntry>> {
        let entries = if self.cookie.is_some() {
            self.fetch_via_cookie().await.or_else(|err| {
                if self.dump_path.is_some() {
                    tracing::warn!(error = %err, "pinduoduo cookie fetch failed, falling back to local dump");
                    self.load_dump()
                } else {
                    Err(err)
                }
            })?
        } else {
            self.load_dump()?
        };
        Ok(entries
            .into_iter()
            .map(|e| DocEntry { path: e.path, title: e.title, doc_type: DocType::ApiReference, dev_mode: None, source_url: None })
            .collect())
    }

    async fn fetch_content(&self, entry: &DocEntry) -> Result<DocContent> {
        let entries = if self.cookie.is_some() { self.fetch_via_cookie().await.or_else(|_| self.load_dump())? } else { self.load_dump()? };
        let dump = entries
            .into_iter()
            .find(|e| e.path == entry.path)
            .ok_or_else(|| Error::NotFound(format!("pinduoduo entry '{}' missing from catalog", entry.path)))?;
        let api_path = extract::extract_generic_api_path(&dump.content);
        let error_codes = extract::extract_error_codes("pinduoduo", &dump.content, None);
        Ok(DocContent { content: dump.content, api_path, last_updated: None, metadata: None, error_codes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cookie_and_dump_path_is_a_config_error() {
        let adapter = PinduoduoAdapter::new(reqwest::Client::new(), None, None);
        let err = adapter.load_dump().unwrap_err();
        assert_eq!(err.category(), "config");
    }
}
