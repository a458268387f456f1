//! Shared HTML-portal fetch logic reused by the thinner platform adapters
//! (§4.5): each developer portal exposes a JSON category list and renders
//! its actual content as HTML, differing only in URLs and politeness
//! parameters. Platforms with a materially different flow (Wecom's
//! multi-tree walk, the OpenAPI adapter's spec-driven flow, Pinduoduo's
//! cookie/dump-file flow) implement [`super::Adapter`] directly instead.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::rate_limit::jittered_delay;
use super::{extract, Adapter, DocContent, DocEntry};
use crate::types::DocType;
use crate::Result;

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    path: String,
    title: String,
    #[serde(default)]
    url: Option<String>,
}

/// A generic JSON-catalog / HTML-content adapter, parameterized per platform.
pub struct HtmlPortalAdapter {
    source_id: &'static str,
    client: reqwest::Client,
    catalog_url: String,
    content_base: String,
    base_delay: Duration,
}

impl HtmlPortalAdapter {
    /// Build a portal adapter. `catalog_url` must return a JSON array of
    /// `{path, title, url?}` objects; content is fetched at
    /// `{content_base}/{path}` unless a catalog entry supplies its own `url`.
    #[must_use]
    pub fn new(source_id: &'static str, client: reqwest::Client, catalog_url: impl Into<String>, content_base: impl Into<String>) -> Self {
        Self { source_id, client, catalog_url: catalog_url.into(), content_base: content_base.into(), base_delay: Duration::from_millis(400) }
    }

    /// Override the default politeness delay, for portals that need more
    /// (or can tolerate less) headroom before throttling.
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }
}

#[async_trait]
impl Adapter for HtmlPortalAdapter {
    fn source_id(&self) -> &str {
        self.source_id
    }

    async fn fetch_catalog(&self) -> Result<Vec<DocEntry>> {
        jittered_delay(self.base_delay).await;
        let body = self.client.get(&self.catalog_url).send().await?.error_for_status()?.text().await?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&body)?;
        Ok(entries
            .into_iter()
            .map(|e| DocEntry { path: e.path, title: e.title, doc_type: DocType::ApiReference, dev_mode: None, source_url: e.url })
            .collect())
    }

    async fn fetch_content(&self, entry: &DocEntry) -> Result<DocContent> {
        jittered_delay(self.base_delay).await;
        let url = entry.source_url.clone().unwrap_or_else(|| format!("{}/{}", self.content_base, entry.path));
        let html = self.client.get(&url).send().await?.error_for_status()?.text().await?;
        let content = extract::html_to_markdown(&html);
        let api_path = extract::extract_generic_api_path(&content);
        let error_codes = extract::extract_error_codes(self.source_id, &content, None);
        Ok(DocContent { content, api_path, last_updated: None, metadata: None, error_codes })
    }
}
