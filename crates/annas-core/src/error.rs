//! Error types for the Anna's Archive scraper
//!
//! Provides a single error enum with human-readable messages
//! and string serialization for machine-readable frontends.

use std::path::PathBuf;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for all search, extraction and download operations
///
/// Implements Display for human-readable messages and Serialize
/// (as the Display string) for JSON output.
#[derive(Error, Debug)]
pub enum AnnasError {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Server answered with an unexpected status code
    #[error("Unexpected HTTP status {status} from {url}")]
    BadStatus { status: u16, url: String },

    /// Failed to parse HTML content
    #[error("Failed to parse HTML: {0}")]
    ParseError(String),

    /// Structured payload could not be decoded
    #[error("Failed to decode response: {0}")]
    DecodeError(String),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Rate limited by server (HTTP 429)
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Resource not found on server
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid caller input (empty query, empty hash)
    #[error("Invalid ID: {0}")]
    InvalidId(String),

    /// Required configuration is missing or malformed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Explicit error message returned by an upstream API, surfaced verbatim
    #[error("{0}")]
    ApiError(String),

    /// The fast download endpoint returned neither a URL nor an error
    #[error("failed to get download URL")]
    NoDownloadUrl,

    /// The resolved download URL answered with a non-success status
    #[error("failed to download file (HTTP {status})")]
    DownloadFailed { status: u16 },

    /// Local file creation or write failed
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A retried operation failed on every attempt
    #[error("failed to generate content after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<AnnasError>,
    },
}

impl AnnasError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying the same request may succeed
    ///
    /// Timeouts, connection failures, 429 and 5xx responses are transient.
    /// Everything else (configuration, parsing, explicit API errors) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            AnnasError::RateLimited => true,
            AnnasError::BadStatus { status, .. } => *status >= 500,
            AnnasError::HttpError(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status()
                        .map(|s| s.is_server_error())
                        .unwrap_or(false)
            }
            _ => false,
        }
    }
}

impl Serialize for AnnasError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for scraper operations
pub type Result<T> = std::result::Result<T, AnnasError>;
