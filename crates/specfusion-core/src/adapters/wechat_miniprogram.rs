//! WeChat Mini Program open-platform adapter (§4.5).

use async_trait::async_trait;

use super::common::HtmlPortalAdapter;
use super::{Adapter, DocContent, DocEntry};
use crate::Result;

/// Fetches the WeChat Mini Program developer API reference.
pub struct WechatMiniprogramAdapter(HtmlPortalAdapter);

impl WechatMiniprogramAdapter {
    /// Build an adapter against the Mini Program documentation portal.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self(HtmlPortalAdapter::new(
            "wechat_miniprogram",
            client,
            "https://developers.weixin.qq.com/miniprogram/dev/catalog.json",
            "https://developers.weixin.qq.com/miniprogram/dev",
        ))
    }
}

#[async_trait]
impl Adapter for WechatMiniprogramAdapter {
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
