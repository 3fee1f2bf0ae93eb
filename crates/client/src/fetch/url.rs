//! URL canonicalization and origin checks.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize an absolute URL string so equivalent requests share a cache key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// The origin (scheme, host, port) of the proxied application.
#[derive(Debug, Clone)]
pub struct AppOrigin {
    base: Url,
}

impl AppOrigin {
    /// Parse an origin such as `https://example.com:8443`.
    pub fn parse(origin: &str) -> Result<Self, UrlError> {
        let base = canonicalize(origin)?;
        if base.host_str().is_none() {
            return Err(UrlError::InvalidUrl(format!("origin has no host: {origin}")));
        }
        Ok(Self { base })
    }

    /// Resolve a root-relative path or absolute URL into a canonical URL.
    ///
    /// Root-relative paths (`/index.html`) are joined onto the origin; anything
    /// else must already be absolute.
    pub fn resolve(&self, input: &str) -> Result<Url, UrlError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(UrlError::Empty);
        }
        if trimmed.starts_with('/') && !trimmed.starts_with("//") {
            let mut joined = self.base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
            joined.set_fragment(None);
            return Ok(joined);
        }
        canonicalize(trimmed)
    }

    /// Whether a URL has exactly this origin.
    pub fn contains(&self, url: &Url) -> bool {
        url.origin() == self.base.origin()
    }
}
