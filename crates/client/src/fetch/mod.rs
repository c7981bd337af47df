//! Conditional GET over HTTP.
//!
//! ### Request
//! - One GET per call, with caller-supplied extra headers. A request carrying a
//!   body is sent as POST instead.
//! - `If-Modified-Since` is attached only when a prior `Last-Modified` value is
//!   supplied; the value is sent verbatim and replaces any caller-supplied
//!   `If-Modified-Since`.
//!
//! ### Classification
//! - `200` is [`FetchOutcome::Fresh`] with the full body.
//! - `304` is [`FetchOutcome::NotModified`]; there is no body.
//! - Any other status is `Error::HttpStatus`; transport failures are
//!   `Error::Transport` or `Error::FetchTimeout`. Nothing is retried.
//!
//! ### Safety Gates
//! - Max redirects: 5
//! - Max body bytes: configurable

pub mod url;

use bytes::Bytes;
use lastmod_core::{AppConfig, Error, NormalizedHeaders};
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode, header};
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub use url::{UrlError, parse_target};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "lastmod/<version>")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 50MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: 5,
        }
    }
}

/// A single request to fetch through the cache.
///
/// Plain URL strings convert into a request with no extras.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Target URL. Also the exact cache key.
    pub url: String,
    /// Extra request headers, sent in order.
    pub headers: Vec<(String, String)>,
    /// Per-request timeout overriding the client default.
    pub timeout: Option<Duration>,
    /// Request body. When set the request is a POST.
    pub body: Option<Bytes>,
    /// Explicit payload path, overriding the stored or derived location.
    /// Only consulted by the cache manager.
    pub cache_dest: Option<PathBuf>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), headers: Vec::new(), timeout: None, body: None, cache_dest: None }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn cache_dest(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dest = Some(path.into());
        self
    }
}

impl From<&str> for FetchRequest {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for FetchRequest {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

/// A `200 OK` response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// Response headers, names lower-cased
    pub headers: NormalizedHeaders,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// Classified result of one conditional GET.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// `200`: the server sent a new representation.
    Fresh(FetchResponse),
    /// `304`: the cached representation is still current.
    NotModified { url: Url, headers: NormalizedHeaders },
}

/// HTTP client performing conditional GETs.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Perform one request/response cycle.
    ///
    /// `if_modified_since` is the stored `Last-Modified` value of a usable
    /// cached payload, if any.
    pub async fn fetch(&self, request: &FetchRequest, if_modified_since: Option<&str>) -> Result<FetchOutcome, Error> {
        let start = Instant::now();
        let url = parse_target(&request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let headers = request_headers(request, if_modified_since)?;
        if let Some(since) = if_modified_since {
            tracing::debug!(url = %url, since, "revalidating");
        }

        let mut builder = match &request.body {
            Some(body) => self.http.post(url.clone()).body(body.clone()),
            None => self.http.get(url.clone()),
        };
        builder = builder.headers(headers);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| send_error(&url, e))?;
        let status = response.status();

        match status {
            StatusCode::OK => {
                tracing::info!(status = status.as_u16(), url = %response.url(), "response");

                if let Some(len) = response.content_length()
                    && len as usize > self.config.max_bytes
                {
                    return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
                }

                let final_url = response.url().clone();
                let headers = normalize_header_map(response.headers());

                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| Error::Transport(format!("failed to read response: {}", e)))?;

                if bytes.len() > self.config.max_bytes {
                    return Err(Error::FetchTooLarge(format!(
                        "{} bytes exceeds {}",
                        bytes.len(),
                        self.config.max_bytes
                    )));
                }

                let fetch_ms = start.elapsed().as_millis() as u64;

                tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", url, final_url, fetch_ms, bytes.len());

                Ok(FetchOutcome::Fresh(FetchResponse { url, final_url, headers, bytes, fetch_ms }))
            }
            StatusCode::NOT_MODIFIED => {
                tracing::info!(status = status.as_u16(), url = %response.url(), "response");
                let headers = normalize_header_map(response.headers());
                Ok(FetchOutcome::NotModified { url, headers })
            }
            _ => {
                tracing::warn!(status = status.as_u16(), url = %response.url(), "unexpected status");
                let headers = normalize_header_map(response.headers());
                Err(Error::HttpStatus { status: status.as_u16(), url: request.url.clone(), headers })
            }
        }
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

/// Build the outgoing header map.
///
/// Caller headers are appended in order. A revalidation value replaces every
/// caller-supplied `If-Modified-Since`.
fn request_headers(request: &FetchRequest, if_modified_since: Option<&str>) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid header name {name:?}: {e}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| Error::InvalidInput(format!("invalid value for {name}: {e}")))?;
        headers.append(name, value);
    }

    if let Some(since) = if_modified_since {
        let value = HeaderValue::from_str(since)
            .map_err(|e| Error::InvalidInput(format!("invalid If-Modified-Since value {since:?}: {e}")))?;
        headers.insert(header::IF_MODIFIED_SINCE, value);
    }

    Ok(headers)
}

/// Lower-case header names and decode values lossily.
///
/// Repeated headers collapse to their last value.
pub fn normalize_header_map(headers: &header::HeaderMap) -> NormalizedHeaders {
    NormalizedHeaders::normalize(
        headers
            .iter()
            .map(|(name, value)| (name.as_str(), String::from_utf8_lossy(value.as_bytes()).into_owned())),
    )
}

fn send_error(url: &Url, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else if err.is_builder() {
        Error::InvalidInput(format!("invalid request for {url}: {err}"))
    } else {
        Error::Transport(format!("network error for {url}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;

    const LAST_MODIFIED: &str = "Tue, 01 Jan 2020 00:00:00 GMT";

    fn client() -> FetchClient {
        FetchClient::new(FetchConfig::default()).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert!(config.user_agent.starts_with("lastmod/"));
        assert_eq!(config.max_bytes, 50 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_request_builder() {
        let request = FetchRequest::new("http://example.test/a")
            .header("Accept", "text/plain")
            .timeout(Duration::from_secs(3))
            .body("q=1")
            .cache_dest("/tmp/a.bin");
        assert_eq!(request.url, "http://example.test/a");
        assert_eq!(request.headers, vec![("Accept".to_string(), "text/plain".to_string())]);
        assert_eq!(request.timeout, Some(Duration::from_secs(3)));
        assert_eq!(request.body, Some(Bytes::from_static(b"q=1")));
        assert_eq!(request.cache_dest, Some(PathBuf::from("/tmp/a.bin")));
        assert_eq!(FetchRequest::from("http://example.test/a"), FetchRequest::new("http://example.test/a"));
    }

    #[test]
    fn test_revalidation_replaces_caller_if_modified_since() {
        let request = FetchRequest::new("http://example.test/a")
            .header("If-Modified-Since", "Mon, 01 Jan 2001 00:00:00 GMT")
            .header("Accept", "text/plain");

        let headers = request_headers(&request, Some(LAST_MODIFIED)).unwrap();
        let values: Vec<_> = headers.get_all(header::IF_MODIFIED_SINCE).iter().collect();
        assert_eq!(values, vec![LAST_MODIFIED]);
        assert_eq!(headers.get(header::ACCEPT).unwrap(), "text/plain");

        let headers = request_headers(&request, None).unwrap();
        assert_eq!(headers.get(header::IF_MODIFIED_SINCE).unwrap(), "Mon, 01 Jan 2001 00:00:00 GMT");
    }

    #[test]
    fn test_invalid_header_name() {
        let request = FetchRequest::new("http://example.test/a").header("bad name", "x");
        assert!(matches!(request_headers(&request, None), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_normalize_header_map() {
        let mut map = header::HeaderMap::new();
        map.insert(header::LAST_MODIFIED, header::HeaderValue::from_static(LAST_MODIFIED));
        map.append(header::SET_COOKIE, header::HeaderValue::from_static("a=1"));
        map.append(header::SET_COOKIE, header::HeaderValue::from_static("b=2"));

        let headers = normalize_header_map(&map);
        assert_eq!(headers.last_modified(), Some(LAST_MODIFIED));
        assert_eq!(headers.get("set-cookie"), Some("b=2"));
    }

    #[tokio::test]
    async fn test_fresh_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("GET").path("/a").header_missing("if-modified-since");
                then.status(200).header("Last-Modified", LAST_MODIFIED).body("hello");
            })
            .await;

        let outcome = client().fetch(&FetchRequest::new(server.url("/a")), None).await.unwrap();
        let FetchOutcome::Fresh(response) = outcome else { panic!("expected fresh response") };
        assert_eq!(&response.bytes[..], b"hello");
        assert_eq!(response.headers.last_modified(), Some(LAST_MODIFIED));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_revalidation_header_attached() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("GET").path("/a").header("if-modified-since", LAST_MODIFIED);
                then.status(304);
            })
            .await;

        let outcome = client()
            .fetch(&FetchRequest::new(server.url("/a")), Some(LAST_MODIFIED))
            .await
            .unwrap();
        assert!(matches!(outcome, FetchOutcome::NotModified { .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_extra_headers_sent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("GET").path("/a").header("accept", "text/plain");
                then.status(200).body("ok");
            })
            .await;

        let request = FetchRequest::new(server.url("/a")).header("Accept", "text/plain");
        let outcome = client().fetch(&request, None).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Fresh(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_body_sent_as_post() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("POST").path("/search").body("q=rust");
                then.status(200).body("results");
            })
            .await;

        let request = FetchRequest::new(server.url("/search")).body("q=rust");
        let outcome = client().fetch(&request, None).await.unwrap();
        let FetchOutcome::Fresh(response) = outcome else { panic!("expected fresh response") };
        assert_eq!(&response.bytes[..], b"results");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/missing");
                then.status(404).header("X-Reason", "gone");
            })
            .await;

        let url = server.url("/missing");
        let result = client().fetch(&FetchRequest::new(url.clone()), None).await;
        match result {
            Err(Error::HttpStatus { status, url: err_url, headers }) => {
                assert_eq!(status, 404);
                assert_eq!(err_url, url);
                assert_eq!(headers.get("x-reason"), Some("gone"));
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_200_success_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/partial");
                then.status(203).body("partial");
            })
            .await;

        let result = client().fetch(&FetchRequest::new(server.url("/partial")), None).await;
        assert!(matches!(result, Err(Error::HttpStatus { status: 203, .. })));
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/big");
                then.status(200).body("0123456789");
            })
            .await;

        let client = FetchClient::new(FetchConfig { max_bytes: 4, ..Default::default() }).unwrap();
        let result = client.fetch(&FetchRequest::new(server.url("/big")), None).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let result = client().fetch(&FetchRequest::new("not a url"), None).await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_transport_error() {
        let result = client().fetch(&FetchRequest::new("http://127.0.0.1:1/"), None).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }
}
