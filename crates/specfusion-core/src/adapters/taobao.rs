//! Taobao open-platform adapter (§4.5).
//!
//! Taobao's portal throttles more readily than most; this adapter widens
//! the base jitter delay rather than reusing the common default.

use std::time::Duration;

use async_trait::async_trait;

use super::common::HtmlPortalAdapter;
use super::{Adapter, DocContent, DocEntry};
use crate::Result;

/// Fetches Taobao's open-platform API reference.
pub struct TaobaoAdapter(HtmlPortalAdapter);

impl TaobaoAdapter {
    /// Build an adapter against Taobao's documentation portal.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self(
            HtmlPortalAdapter::new(
                "taobao",
                client,
                "https://open.taobao.com/api/catalog.json",
                "https://open.taobao.com/api",
            )
            .with_base_delay(Duration::from_millis(900)),
        )
    }
}

#[async_trait]
impl Adapter for TaobaoAdapter {
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
