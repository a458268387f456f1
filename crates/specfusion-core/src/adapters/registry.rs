//! Source registry: maps a source id to its [`Adapter`] (§4.5 "Registry").
//!
//! The nine platform adapters are fixed at compile time; OpenAPI sources are
//! registered dynamically at runtime via `add-openapi`; so the registry
//! holds two resolution paths rather than one static table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::openapi::{OpenApiAdapter, OpenApiSource};
use crate::adapters::{
    dingtalk::DingtalkAdapter, douyin::DouyinAdapter, feishu::FeishuAdapter,
    pinduoduo::PinduoduoAdapter, taobao::TaobaoAdapter, wechat_miniprogram::WechatMiniprogramAdapter,
    wechat_shop::WechatShopAdapter, wecom::WecomAdapter, xiaohongshu::XiaohongshuAdapter,
    youzan::YouzanAdapter, Adapter,
};
use crate::config::IngestConfig;
use crate::{Error, Result};

/// Holds the fixed platform adapters plus any dynamically-registered
/// OpenAPI sources.
pub struct SourceRegistry {
    fixed: HashMap<String, Arc<dyn Adapter>>,
    openapi: HashMap<String, OpenApiSource>,
    client: reqwest::Client,
}

impl SourceRegistry {
    /// Build a registry with all nine platform adapters wired up from
    /// `config`, and no OpenAPI sources registered yet.
    #[must_use]
    pub fn new(config: &IngestConfig) -> Self {
        let client = reqwest::Client::builder().user_agent("specfusion-sync/0.1").build().unwrap_or_default();

        let mut fixed: HashMap<String, Arc<dyn Adapter>> = HashMap::new();
        let wecom: Arc<dyn Adapter> = Arc::new(WecomAdapter::new(client.clone(), config.wecom_cookies.clone()));
        fixed.insert(wecom.source_id().to_string(), wecom);
        let feishu: Arc<dyn Adapter> = Arc::new(FeishuAdapter::new(client.clone()));
        fixed.insert(feishu.source_id().to_string(), feishu);
        let dingtalk: Arc<dyn Adapter> = Arc::new(DingtalkAdapter::new(client.clone()));
        fixed.insert(dingtalk.source_id().to_string(), dingtalk);
        let xiaohongshu: Arc<dyn Adapter> = Arc::new(XiaohongshuAdapter::new(client.clone()));
        fixed.insert(xiaohongshu.source_id().to_string(), xiaohongshu);
        let douyin: Arc<dyn Adapter> = Arc::new(DouyinAdapter::new(client.clone()));
        fixed.insert(douyin.source_id().to_string(), douyin);
        let taobao: Arc<dyn Adapter> = Arc::new(TaobaoAdapter::new(client.clone()));
        fixed.insert(taobao.source_id().to_string(), taobao);
        let youzan: Arc<dyn Adapter> = Arc::new(YouzanAdapter::new(client.clone()));
        fixed.insert(youzan.source_id().to_string(), youzan);
        let miniprogram: Arc<dyn Adapter> = Arc::new(WechatMiniprogramAdapter::new(client.clone()));
        fixed.insert(miniprogram.source_id().to_string(), miniprogram);
        let shop: Arc<dyn Adapter> = Arc::new(WechatShopAdapter::new(client.clone()));
        fixed.insert(shop.source_id().to_string(), shop);
        let pinduoduo: Arc<dyn Adapter> =
            Arc::new(PinduoduoAdapter::new(client.clone(), config.pdd_cookie.clone(), config.pdd_json_path.clone()));
        fixed.insert(pinduoduo.source_id().to_string(), pinduoduo);

        Self { fixed, openapi: HashMap::new(), client }
    }

    /// Register (or replace) a dynamic OpenAPI source.
    pub fn register_openapi(&mut self, source: OpenApiSource) {
        self.openapi.insert(source.id.clone(), source);
    }

    /// List every known source id, fixed and dynamic.
    #[must_use]
    pub fn source_ids(&self) -> Vec<String> {
        self.fixed.keys().chain(self.openapi.keys()).cloned().collect()
    }

    /// Resolve a source id to its adapter.
    pub fn resolve(&self, source_id: &str) -> Result<Arc<dyn Adapter>> {
        if let Some(adapter) = self.fixed.get(source_id) {
            return Ok(adapter.clone());
        }
        if let Some(source) = self.openapi.get(source_id) {
            return Ok(Arc::new(OpenApiAdapter::new(self.client.clone(), source.clone())));
        }
        Err(Error::NotFound(format!("no adapter registered for source '{source_id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_platforms_all_resolve() {
        let registry = SourceRegistry::new(&IngestConfig {
            api_url: "http://127.0.0.1:3456".to_string(),
            admin_token: "dev-token".to_string(),
            wecom_cookies: None,
            pdd_cookie: None,
            pdd_json_path: None,
        });
        for id in [
            "wecom", "feishu", "dingtalk", "xiaohongshu", "douyin", "taobao", "youzan",
            "wechat_miniprogram", "wechat_shop", "pinduoduo",
        ] {
            assert!(registry.resolve(id).is_ok(), "expected adapter for {id}");
        }
        assert!(registry.resolve("does-not-exist").is_err());
    }

    #[test]
    fn dynamic_openapi_source_resolves_after_registration() {
        let mut registry = SourceRegistry::new(&IngestConfig {
            api_url: "http://127.0.0.1:3456".to_string(),
            admin_token: "dev-token".to_string(),
            wecom_cookies: None,
            pdd_cookie: None,
            pdd_json_path: None,
        });
        assert!(registry.resolve("petstore").is_err());
        registry.register_openapi(OpenApiSource {
            id: "petstore".to_string(),
            name: "Petstore".to_string(),
            spec_url: "https://example.com/openapi.json".to_string(),
        });
        assert!(registry.resolve("petstore").is_ok());
    }
}
