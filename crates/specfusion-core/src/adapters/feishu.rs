//! Feishu (飞书/Lark) open-platform adapter (§4.5).

use async_trait::async_trait;

use super::common::HtmlPortalAdapter;
use super::{Adapter, DocContent, DocEntry};
use crate::Result;

/// Fetches Feishu's open-platform API reference.
pub struct FeishuAdapter(HtmlPortalAdapter);

impl FeishuAdapter {
    /// Build an adapter against Feishu's documentation portal.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self(HtmlPortalAdapter::new(
            "feishu",
            client,
            "https://open.feishu.cn/document/catalog.json",
            "https://open.feishu.cn/document",
        ))
    }
}

#[async_trait]
impl Adapter for FeishuAdapter {
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
