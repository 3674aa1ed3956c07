//! Error types for certscrape.
//!
//! Library crates use [`CertScrapeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Only two variants end a request: [`CertScrapeError::Navigation`] and
//! [`CertScrapeError::DeadlineExceeded`]. Everything the extraction layer can
//! shrug off (redirects, missing regions, empty lists, unresolved fields) is
//! a typed outcome, not an error.

use std::path::PathBuf;

/// Top-level error type for all certscrape operations.
#[derive(Debug, thiserror::Error)]
pub enum CertScrapeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Hard navigation failure; fatal for the request.
    #[error("navigation failed during {stage}: {message}")]
    Navigation { stage: String, message: String },

    /// The per-request bounded-retry ceiling was hit.
    #[error("request deadline exceeded after {elapsed_ms} ms")]
    DeadlineExceeded { elapsed_ms: u64 },

    /// A single suspension point (wait, scroll, navigate) ran out of time.
    #[error("{stage} timed out after {after_ms} ms")]
    Timeout { stage: String, after_ms: u64 },

    /// The document source cannot reach the location at all.
    #[error("unreachable location: {url}")]
    Unreachable { url: String },

    /// Network/HTTP error from an HTTP-backed document source.
    #[error("network error: {0}")]
    Network(String),

    /// Selector or markup parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Document source operation failed (click target missing, etc.).
    #[error("document error: {0}")]
    Document(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Request validation error (bad URL scheme, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CertScrapeError>;

impl CertScrapeError {
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

    /// Create a navigation error tagged with the stage that failed.
    pub fn navigation(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Navigation {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    /// Create a document-source error.
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error ends the whole request rather than one attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Navigation { .. } | Self::DeadlineExceeded { .. }
        )
    }
}
