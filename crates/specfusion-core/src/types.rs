//! Core data structures for the SpecFusion document store.
//!
//! Mirrors §3 of the specification: [`Source`], [`Document`], [`ErrorCode`],
//! [`SyncLog`] and [`SearchLog`], plus the small enums (`DocType`,
//! `DevMode`) that constrain a few of `Document`'s fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Wecom-only axis distinguishing self-built, third-party (ISV) and
/// service-provider variants of the same nominal API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevMode {
    /// Self-built application.
    Internal,
    /// Third-party (ISV) application.
    ThirdParty,
    /// Service-provider-developed application.
    ServiceProvider,
}

impl DevMode {
    /// Parse a dev-mode string, returning `None` for anything unrecognized
    /// rather than silently defaulting (so invariant 6 of §3 is checkable).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "internal" => Some(Self::Internal),
            "third_party" => Some(Self::ThirdParty),
            "service_provider" => Some(Self::ServiceProvider),
            _ => None,
        }
    }

    /// The canonical string form stored in the database and used in query filters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::ThirdParty => "third_party",
            Self::ServiceProvider => "service_provider",
        }
    }
}

impl std::fmt::Display for DevMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical label over documents (§3, invariant 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    /// A single API operation reference page. The default when unspecified.
    ApiReference,
    /// A narrative guide or tutorial page.
    Guide,
    /// A page whose primary content is an error-code table.
    ErrorCode,
    /// An event/callback reference page.
    Event,
    /// A message-card / template reference page.
    CardTemplate,
    /// A release-notes / changelog page.
    Changelog,
}

impl Default for DocType {
    fn default() -> Self {
        Self::ApiReference
    }
}

impl DocType {
    /// Parse a doc-type string. Unknown values must not round-trip (invariant 5),
    /// so this returns `None` instead of silently defaulting.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "api_reference" => Some(Self::ApiReference),
            "guide" => Some(Self::Guide),
            "error_code" => Some(Self::ErrorCode),
            "event" => Some(Self::Event),
            "card_template" => Some(Self::CardTemplate),
            "changelog" => Some(Self::Changelog),
            _ => None,
        }
    }

    /// The canonical string form stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApiReference => "api_reference",
            Self::Guide => "guide",
            Self::ErrorCode => "error_code",
            Self::Event => "event",
            Self::CardTemplate => "card_template",
            Self::Changelog => "changelog",
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ingested platform (`wecom`, `feishu`, an OpenAPI-backed source, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Stable short slug; unique.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Optional base URL for the platform's docs/API.
    pub base_url: Option<String>,
    /// Cached document count, recomputed after every `bulk_upsert`.
    pub doc_count: i64,
    /// This server's last successful sync timestamp for the source.
    pub last_synced: Option<DateTime<Utc>>,
    /// Opaque JSON configuration blob (adapter credentials, spec URL, ...).
    pub config: Option<String>,
}

/// Compute the deterministic document id `{source_id}_{first12hex(sha256(path))}`.
///
/// Stable across re-syncs for the same logical `(source_id, path)` pair
/// (invariant 1 of §3).
#[must_use]
pub fn compute_doc_id(source_id: &str, path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let digest = hasher.finalize();
    let hex = hex::encode(digest);
    format!("{source_id}_{}", &hex[..12])
}

/// SHA-256 hex digest of arbitrary content, used for `content_hash`.
#[must_use]
pub fn compute_content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Number of non-empty, slash-delimited segments in `path` (invariant 4 of §3),
/// floored at 1.
#[must_use]
pub fn compute_path_depth(path: &str) -> i64 {
    let depth = path.split('/').filter(|s| !s.is_empty()).count();
    depth.max(1) as i64
}

/// One retrieved article, as stored in and returned from the `DocStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// `{source_id}_{first12hex(sha256(path))}`.
    pub id: String,
    /// Owning source's id.
    pub source_id: String,
    /// Hierarchical slash-delimited path.
    pub path: String,
    /// Count of non-empty segments in `path`, minimum 1.
    pub path_depth: i64,
    /// Document title.
    pub title: String,
    /// HTTP method + route extracted from content, if any (e.g. `POST /cgi-bin/message/send`).
    pub api_path: Option<String>,
    /// Wecom-only dev-mode axis; `None` for every other source.
    pub dev_mode: Option<DevMode>,
    /// Categorical document type.
    pub doc_type: DocType,
    /// Full normalized Markdown body.
    pub content: String,
    /// SHA-256 of `content`.
    pub content_hash: String,
    /// The hash this version replaced, if any.
    pub prev_content_hash: Option<String>,
    /// Canonical URL on the source platform, if known.
    pub source_url: Option<String>,
    /// Free-form JSON metadata (locale, event name, labels, ...).
    pub metadata: Option<String>,
    /// Tokenized form of `title` (whitespace-joined), as seen by FTS.
    pub tokenized_title: String,
    /// Tokenized form of `content` (whitespace-joined), as seen by FTS.
    pub tokenized_content: String,
    /// Platform's own revision date, if known.
    pub last_updated: Option<DateTime<Utc>>,
    /// This server's write time.
    pub synced_at: DateTime<Utc>,
}

/// `(source_id, code)` uniquely identifies an error-code entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorCodeEntry {
    /// Owning source's id.
    pub source_id: String,
    /// The error code itself (stored as text; may be numeric or platform-specific).
    pub code: String,
    /// Short human-readable message.
    pub message: String,
    /// Longer description, if any.
    pub description: String,
    /// Id of the document that introduces this code, if known.
    pub doc_id: Option<String>,
}

/// Status of a sync run, as recorded in `SyncLog`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Run is in progress.
    Running,
    /// Run completed with the quality gate passing (individual doc errors may
    /// still be nonzero).
    Success,
    /// Run aborted: quality gate tripped, or a fatal error occurred.
    Failed,
}

impl SyncStatus {
    /// Canonical string form stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// Per-run record of a source sync (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLog {
    /// Row id.
    pub id: i64,
    /// Source the run covers.
    pub source_id: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished, if it has.
    pub finished_at: Option<DateTime<Utc>>,
    /// Current/final status.
    pub status: SyncStatus,
    /// Documents created this run.
    pub created: i64,
    /// Documents updated this run.
    pub updated: i64,
    /// Documents left unchanged this run.
    pub unchanged: i64,
    /// Documents deleted this run.
    pub deleted: i64,
    /// Per-document errors encountered this run.
    pub errors: i64,
    /// Error message, if the run failed.
    pub error: Option<String>,
}

/// Per-query record, written by every search (§4.3 "Logging").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchLog {
    /// Row id.
    pub id: i64,
    /// Raw query string as received.
    pub query: String,
    /// Optional `source` filter applied.
    pub source: Option<String>,
    /// Number of results returned (post-dedup, post-pagination).
    pub result_count: i64,
    /// Highest score among returned results, if any.
    pub top_score: Option<f64>,
    /// Wall-clock time spent executing the query, in milliseconds.
    pub took_ms: i64,
    /// When the query was logged.
    pub logged_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_is_deterministic() {
        let a = compute_doc_id("wecom", "guide/access-token");
        let b = compute_doc_id("wecom", "guide/access-token");
        assert_eq!(a, b);
        assert!(a.starts_with("wecom_"));
        assert_eq!(a.len(), "wecom_".len() + 12);
    }

    #[test]
    fn doc_id_varies_with_source_or_path() {
        let a = compute_doc_id("wecom", "guide/access-token");
        let b = compute_doc_id("feishu", "guide/access-token");
        let c = compute_doc_id("wecom", "guide/other");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn path_depth_counts_non_empty_segments() {
        assert_eq!(compute_path_depth("a/b/c"), 3);
        assert_eq!(compute_path_depth("/a/b/"), 2);
        assert_eq!(compute_path_depth(""), 1);
        assert_eq!(compute_path_depth("/"), 1);
    }

    #[test]
    fn doc_type_unknown_values_do_not_round_trip() {
        assert!(DocType::parse("bogus").is_none());
        assert_eq!(DocType::parse("guide"), Some(DocType::Guide));
    }
}
