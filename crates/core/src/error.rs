//! Unified error types for lastmod.
//!
//! The `Display` form of every variant starts with a stable uppercase code so
//! that the CLI and log output can be grepped.

use std::path::PathBuf;

use tokio_rusqlite::rusqlite;

use crate::cache::NormalizedHeaders;
use crate::config::ConfigError;

/// Unified error types for the lastmod cache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Configuration is missing or malformed.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored headers could not be decoded or encoded.
    #[error("CACHE_ERROR: invalid stored headers: {0}")]
    InvalidHeaders(String),

    /// Server answered 304 but there is no cache destination for the URL.
    #[error("CACHE_MISS: server returned 304 Not Modified for {0} but nothing is cached")]
    NotModifiedWithoutCache(String),

    /// A payload file expected to be present is absent.
    #[error("PAYLOAD_MISSING: {}", .0.display())]
    PayloadMissing(PathBuf),

    /// Insufficient privileges on a cache or metadata path.
    #[error("PERMISSION_DENIED: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// Any other filesystem failure on a payload path.
    #[error("STORAGE_ERROR: {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Network failure while sending the request or reading the body.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(String),

    /// Server answered with a status other than 200 or 304.
    #[error("HTTP_ERROR: status {status} for {url}")]
    HttpStatus { status: u16, url: String, headers: NormalizedHeaders },
}

impl Error {
    /// Map an I/O error on `path` onto the payload error taxonomy.
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::PayloadMissing(path),
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied(path),
            _ => Error::Storage { path, source: err },
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidHeaders(err.to_string())
    }
}
