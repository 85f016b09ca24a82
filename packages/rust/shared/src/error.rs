//! Error types for portscout.
//!
//! Library crates use [`ScoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Calls to external collaborators (search APIs, the LLM, the crawler) fail
//! with an [`ExternalError`], which carries the transient/permanent split the
//! retry policy needs.

use std::fmt;
use std::path::PathBuf;

/// Top-level error type for all portscout operations.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside of a classified external call.
    #[error("network error: {0}")]
    Network(String),

    /// HTML, JSON or CSV parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Output store or relational mirror error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Company extraction error (LLM call or reply parsing).
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, malformed input row, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A classified failure from an external collaborator.
    #[error(transparent)]
    External(#[from] ExternalError),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScoutError>;

impl ScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// External call failures
// ---------------------------------------------------------------------------

/// Failure of a single call to an external collaborator.
///
/// Rate limits, connection problems, timeouts and 5xx answers are transient
/// and eligible for retry; everything else is permanent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExternalError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ExternalError {
    /// Whether the retry policy may try this call again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Connection(_) | Self::Timeout(_) | Self::Unavailable(_)
        )
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, context: impl fmt::Display) -> Self {
        let detail = format!("{context}: HTTP {status}");
        match status {
            429 => Self::RateLimited(detail),
            401 | 403 => Self::Auth(detail),
            408 => Self::Timeout(detail),
            500..=599 => Self::Unavailable(detail),
            _ => Self::BadRequest(detail),
        }
    }

    /// Classify a transport-level `reqwest` failure.
    pub fn from_reqwest(err: &reqwest::Error, context: impl fmt::Display) -> Self {
        let detail = format!("{context}: {err}");
        if err.is_timeout() {
            Self::Timeout(detail)
        } else if err.is_connect() || err.is_request() {
            Self::Connection(detail)
        } else if err.is_decode() {
            Self::MalformedResponse(detail)
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), context)
        } else {
            Self::Connection(detail)
        }
    }
}

// ---------------------------------------------------------------------------
// Startup configuration failures
// ---------------------------------------------------------------------------

/// Every required setting that was missing at startup, reported together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "missing required settings: {}. Set them in the environment or a .env file.",
    .missing.join(", ")
)]
pub struct ConfigurationError {
    /// Names of the missing settings (usually environment variables).
    pub missing: Vec<String>,
}

impl From<ConfigurationError> for ScoutError {
    fn from(err: ConfigurationError) -> Self {
        ScoutError::config(err.to_string())
    }
}
