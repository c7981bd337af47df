//! Target URL validation.
//!
//! The caller's URL string is the cache key and is never rewritten. This module
//! only checks that it is something the HTTP client can request.

/// Error type for URL validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse a request target.
///
/// Rules:
/// 1. Empty or whitespace-only input is rejected
/// 2. The URL must be absolute (no default scheme is assumed)
/// 3. Only `http` and `https` are accepted
pub fn parse_target(input: &str) -> Result<url::Url, UrlError> {
    if input.trim().is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = url::Url::parse(input).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}
