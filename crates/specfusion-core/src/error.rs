//! Error types and result alias for `specfusion-core`.
//!
//! Mirrors the shape of a typical search/cache crate's error type: one
//! `thiserror` enum covering every failure category the store, tokenizer,
//! search engine and adapters can produce, with `#[from]` conversions for the
//! errors that cross a library boundary (`std::io`, `reqwest`, `rusqlite`).

use thiserror::Error;

/// The result alias used throughout `specfusion-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for `specfusion-core` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File system I/O failed (opening the database file, dictionary, dump files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An HTTP request made by an adapter or the sync client failed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The embedded relational store raised an error.
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// JSON encoding/decoding of a metadata blob or adapter payload failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Markdown, HTML or OpenAPI document could not be parsed or normalized.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The search engine could not execute a query (FTS syntax, bad filter).
    #[error("Search error: {0}")]
    Search(String),

    /// Configuration is invalid or a required environment variable is missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A requested document, source or error code does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A request was missing a required field or carried an invalid value.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Admin route called without a valid Bearer token.
    #[error("Unauthorized")]
    Auth,

    /// A sync run's quality gate rejected the incoming catalog as a likely
    /// silent data loss (current count < 80% of the prior run's count).
    #[error("Quality gate rejected sync for '{source_id}': {current} docs vs {last} previously")]
    QualityGate {
        /// Source the gate tripped for.
        source_id: String,
        /// Document count observed in this run.
        current: usize,
        /// Document count observed in the prior run.
        last: usize,
    },

    /// The upstream platform rate-limited or otherwise throttled a request.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The upstream platform returned an anti-bot challenge (captcha,
    /// `RGV587_ERROR`, punish redirect, etc.).
    #[error("Anti-bot challenge detected: {0}")]
    AntiBot(String),

    /// An unrecoverable error that should abort the whole sync run (DB
    /// unreachable, schema apply failed, interactive login failed).
    #[error("Fatal: {0}")]
    Fatal(String),
}

impl Error {
    /// Whether retrying the operation that produced this error might succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited(_) | Self::AntiBot(_))
    }

    /// Short category label, used in log fields and error responses.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Db(_) => "db",
            Self::Serialization(_) => "serialization",
            Self::Parse(_) => "parse",
            Self::Search(_) => "search",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Auth => "auth",
            Self::QualityGate { .. } => "quality_gate",
            Self::RateLimited(_) => "rate_limited",
            Self::AntiBot(_) => "anti_bot",
            Self::Fatal(_) => "fatal",
        }
    }
}
