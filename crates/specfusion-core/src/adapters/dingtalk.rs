//! DingTalk (钉钉) open-platform adapter (§4.5).

use async_trait::async_trait;

use super::common::HtmlPortalAdapter;
use super::{Adapter, DocContent, DocEntry};
use crate::Result;

/// Fetches DingTalk's open-platform API reference.
pub struct DingtalkAdapter(HtmlPortalAdapter);

impl DingtalkAdapter {
    /// Build an adapter against DingTalk's documentation portal.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self(HtmlPortalAdapter::new(
            "dingtalk",
            client,
            "https://open.dingtalk.com/document/catalog.json",
            "https://open.dingtalk.com/document",
        ))
    }
}

#[async_trait]
impl Adapter for DingtalkAdapter {
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
