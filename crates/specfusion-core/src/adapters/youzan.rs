//! Youzan (有赞) open-platform adapter (§4.5).

use async_trait::async_trait;

use super::common::HtmlPortalAdapter;
use super::{Adapter, DocContent, DocEntry};
use crate::Result;

/// Fetches Youzan's open-platform API reference.
pub struct YouzanAdapter(HtmlPortalAdapter);

impl YouzanAdapter {
    /// Build an adapter against Youzan's documentation portal.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self(HtmlPortalAdapter::new(
            "youzan",
            client,
            "https://doc.youzanyun.com/catalog.json",
            "https://doc.youzanyun.com/doc",
        ))
    }
}

#[async_trait]
impl Adapter for YouzanAdapter {
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
