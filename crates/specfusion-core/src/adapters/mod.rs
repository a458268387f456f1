//! Source-adapter framework (§4.5): one [`Adapter`] implementation per
//! platform, each producing the same [`DocEntry`]/[`DocContent`] shapes so
//! [`crate::sync::SyncRunner`] never needs to know which platform it's
//! talking to.

pub mod common;
pub mod dingtalk;
pub mod douyin;
pub mod extract;
pub mod feishu;
pub mod openapi;
pub mod pinduoduo;
pub mod rate_limit;
pub mod registry;
pub mod taobao;
pub mod wechat_miniprogram;
pub mod wechat_shop;
pub mod wecom;
pub mod xiaohongshu;
pub mod youzan;

use async_trait::async_trait;

use crate::types::{DevMode, DocType, ErrorCodeEntry};
use crate::Result;

/// One catalog entry: enough to decide whether content needs fetching, but
/// not the content itself (§4.5 "Two-phase fetch").
#[derive(Debug, Clone)]
pub struct DocEntry {
    /// Hierarchical slash-delimited path, unique within the source.
    pub path: String,
    /// Document title as listed in the catalog/category tree.
    pub title: String,
    /// Best-effort document type guess from the catalog alone.
    pub doc_type: DocType,
    /// Wecom-only dev-mode axis.
    pub dev_mode: Option<DevMode>,
    /// Canonical URL, if the platform exposes one before fetching content.
    pub source_url: Option<String>,
}

/// Fully fetched and normalized document content (§4.5 "Two-phase fetch").
#[derive(Debug, Clone)]
pub struct DocContent {
    /// Normalized Markdown body.
    pub content: String,
    /// HTTP method + route extracted from the body, if any.
    pub api_path: Option<String>,
    /// Platform's own revision date, if present in the body or metadata.
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
    /// Free-form JSON metadata blob (locale, event name, labels, ...).
    pub metadata: Option<String>,
    /// Error codes this document's tables introduce, if any.
    pub error_codes: Vec<ErrorCodeEntry>,
}

/// A source-specific fetcher. Implementations own their own rate limiting,
/// anti-bot handling and session refresh; `SyncRunner` only calls the three
/// methods below in sequence.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Stable source id this adapter populates (`wecom`, `feishu`, ...).
    fn source_id(&self) -> &str;

    /// List every document the platform currently has, without fetching bodies.
    async fn fetch_catalog(&self) -> Result<Vec<DocEntry>>;

    /// Fetch and normalize the full content for one catalog entry.
    async fn fetch_content(&self, entry: &DocEntry) -> Result<DocContent>;

    /// Compare a freshly fetched catalog against the previously known paths
    /// and report which are new. The default implementation treats every
    /// entry not in `known_paths` as new; adapters with a cheaper mechanism
    /// (a platform `updated_at` field) may override this (§9 Open Questions:
    /// `detectUpdates` degrades to this default for every adapter here).
    fn detect_new_paths<'a>(&self, catalog: &'a [DocEntry], known_paths: &[String]) -> Vec<&'a DocEntry> {
        catalog.iter().filter(|e| !known_paths.contains(&e.path)).collect()
    }
}
