//! HTTP fetch pipeline for the proxied application.
//!
//! ### Behaviour
//! - Any HTTP status is a response, not an error; only transport failures
//!   (connect, DNS, timeout, oversized body) are errors.
//! - Redirects are followed (max 5); the final URL decides the response type.
//! - Max body bytes: 5MB (configurable)
//!
//! ### Response types
//! - `basic`: final URL has the application origin
//! - `cors`: cross-origin with an `Access-Control-Allow-Origin` header
//! - `opaque`: any other cross-origin response

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, Method, StatusCode, header};
use std::time::{Duration, Instant};

pub use self::url::{AppOrigin, UrlError, canonicalize};

use offline_core::{AppConfig, CachedResponse, Error, ResponseType};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offline-proxy/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "offline-proxy/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Relationship of the final URL to the application origin
    pub response_type: ResponseType,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Produce an independent copy of this response.
    ///
    /// The copy owns its own handle to the body, so storing one copy never
    /// consumes the other.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Capture this response for storage under `key_url`.
    ///
    /// Headers that are not valid UTF-8 are dropped.
    pub fn into_cached(self, key_url: &str) -> CachedResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        CachedResponse {
            url: key_url.to_string(),
            status: self.status.as_u16(),
            status_text: self.status.canonical_reason().unwrap_or_default().to_string(),
            response_type: self.response_type,
            headers,
            body: self.bytes.to_vec(),
            stored_at: None,
        }
    }
}

/// Source of network responses.
///
/// The worker fetches only through this trait.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send `method` to `url`. No body is forwarded.
    async fn fetch(&self, method: &Method, url: &Url) -> Result<FetchResponse, Error>;
}

/// Decide the response type for a response whose final URL is `final_url`.
pub fn classify(origin: &AppOrigin, final_url: &Url, headers: &header::HeaderMap) -> ResponseType {
    if origin.contains(final_url) {
        ResponseType::Basic
    } else if headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN) {
        ResponseType::Cors
    } else {
        ResponseType::Opaque
    }
}

/// HTTP fetch client bound to the application origin.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
    origin: AppOrigin,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig, origin: AppOrigin) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config, origin })
    }

    fn map_send_error(&self, url: &Url, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("{} after {}ms", url, self.config.timeout.as_millis()))
        } else {
            Error::Network(format!("{}: {}", url, err))
        }
    }
}

#[async_trait]
impl Network for FetchClient {
    /// Fetch a URL, returning the body and metadata whatever the status.
    ///
    /// Respects redirect, timeout and byte limits.
    async fn fetch(&self, method: &Method, url: &Url) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(method.clone(), url.as_str())
            .send()
            .await
            .map_err(|e| self.map_send_error(url, e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| self.map_send_error(url, e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let response_type = classify(&self.origin, &final_url, &headers);
        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} [{} {}] in {}ms ({} bytes)",
            method,
            url,
            final_url,
            status.as_u16(),
            response_type,
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url: url.clone(), final_url, status, response_type, headers, bytes, fetch_ms })
    }
}
