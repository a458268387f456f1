//! WeChat Shop (微信小店) open-platform adapter (§4.5).

use async_trait::async_trait;

use super::common::HtmlPortalAdapter;
use super::{Adapter, DocContent, DocEntry};
use crate::Result;

/// Fetches the WeChat Shop open-platform API reference.
pub struct WechatShopAdapter(HtmlPortalAdapter);

impl WechatShopAdapter {
    /// Build an adapter against the WeChat Shop documentation portal.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self(HtmlPortalAdapter::new(
            "wechat_shop",
            client,
            "https://developers.weixin.qq.com/doc/store/catalog.json",
            "https://developers.weixin.qq.com/doc/store",
        ))
    }
}

#[async_trait]
impl Adapter for WechatShopAdapter {
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
