//! Typed error kinds for every stage of the pipeline.
//!
//! Each enum exposes `is_recoverable()`: recoverable errors skip the current
//! source (or answer source) and let the batch or chain continue; the rest are
//! fatal for the current operation only.

use std::net::IpAddr;

/// Why the fetch guard refused a URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnsafeUrl {
    #[error("malformed URL: {0}")]
    Malformed(String),

    #[error("scheme '{0}' is not allowed (http/https only)")]
    Scheme(String),

    #[error("port {0} is not allowed")]
    Port(u16),

    #[error("URL has no host")]
    MissingHost,

    #[error("host '{0}' is blocked")]
    BlockedHost(String),

    #[error("address {0} is not publicly routable")]
    BlockedAddress(IpAddr),

    #[error("host '{0}' did not resolve")]
    Unresolvable(String),
}

/// Content fetch failures. All are per-source and recoverable.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("refusing to fetch {url}: {reason}")]
    Disallowed { url: String, reason: UnsafeUrl },

    #[error("{url} served unsupported content type '{content_type}'")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("{url} exceeded {limit} redirects")]
    TooManyRedirects { url: String, limit: usize },
}

impl FetchError {
    /// Short machine-readable kind, used in logs and the ingest log table.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::HttpStatus { .. } => "http_status",
            Self::Network { .. } => "network",
            Self::Disallowed { .. } => "disallowed",
            Self::UnsupportedContentType { .. } => "content_type",
            Self::TooManyRedirects { .. } => "redirects",
        }
    }

    pub fn is_recoverable(&self) -> bool {
        true
    }
}

/// Signature derivation and decoding failures.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("unsupported signature schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    #[error("malformed signature: {0}")]
    Malformed(String),

    #[error("derived {field} is not a finite number")]
    NonFinite { field: &'static str },
}

impl SignatureError {
    pub fn is_recoverable(&self) -> bool {
        true
    }
}

/// Index store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("content {content_hash} is already indexed under {existing_url}")]
    DuplicateContent {
        content_hash: String,
        existing_url: String,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("index store lock poisoned")]
    LockPoisoned,

    #[error("background store task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Duplicate content is a skip; everything else means the write did not happen.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DuplicateContent { .. } | Self::Signature(_))
    }
}

/// Failures raised by a knowledge source inside the answer chain.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("summarizer failed: {0}")]
    Summarize(String),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// Every source error lets the chain move on to the next source.
    pub fn is_recoverable(&self) -> bool {
        true
    }
}
