//! Xiaohongshu (小红书) open-platform adapter (§4.5).

use async_trait::async_trait;

use super::common::HtmlPortalAdapter;
use super::{Adapter, DocContent, DocEntry};
use crate::Result;

/// Fetches Xiaohongshu's open-platform API reference.
pub struct XiaohongshuAdapter(HtmlPortalAdapter);

impl XiaohongshuAdapter {
    /// Build an adapter against Xiaohongshu's documentation portal.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self(HtmlPortalAdapter::new(
            "xiaohongshu",
            client,
            "https://open.xiaohongshu.com/document/catalog.json",
            "https://open.xiaohongshu.com/document",
        ))
    }
}

#[async_trait]
impl Adapter for XiaohongshuAdapter {
    fn source_id(&self) -> &str {
        self.0.source_id()
    }

    async fn fetch_catalog(&self) -> Result<Vec<DocEntry>> {
        self.0.fetch_catalog().await
    }

    async fn fetch_content(&self, entry: &DocEntry) -> Result<DocContent> {
        self.0.fetch_content(entry).await
    }
}
