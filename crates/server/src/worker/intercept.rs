//! Request interception.
//!
//! ```text
//! non-GET / cross-origin / not controlling ──> pass through (network only)
//! GET same-origin ──> bucket hit ──> serve cached
//!                 └─> miss ──> network ok, 200, basic ──> store copy, serve
//!                          ├─> network ok, otherwise ──> serve uncached
//!                          └─> network error ──> document ? offline page : root page
//! ```
//!
//! `route` and `after_network` decide; `Worker::handle_fetch` executes. There
//! is no retry, and nothing further is tried when a fallback page is missing.

use offline_client::{AppOrigin, FetchResponse, Method, StatusCode};
use offline_core::{CachedResponse, Error, ResponseType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{FallbackPages, Worker};

/// What the requested resource will be used for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Top-level navigation.
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    /// Anything else, including plain `fetch()` calls.
    #[default]
    #[serde(other)]
    Empty,
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct InterceptRequest {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
}

#[cfg(test)]
impl InterceptRequest {
    pub fn get(url: Url, destination: Destination) -> Self {
        Self { method: Method::GET, url, destination }
    }
}

/// Why a request was not intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PassThroughReason {
    NotGet,
    CrossOrigin,
    NotControlling,
}

/// Routing decision for an incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    PassThrough(PassThroughReason),
    Intercept,
}

/// Decide whether a request is intercepted.
pub fn route(request: &InterceptRequest, origin: &AppOrigin, controlling: bool) -> Route {
    if request.method != Method::GET {
        Route::PassThrough(PassThroughReason::NotGet)
    } else if !origin.contains(&request.url) {
        Route::PassThrough(PassThroughReason::CrossOrigin)
    } else if !controlling {
        Route::PassThrough(PassThroughReason::NotControlling)
    } else {
        Route::Intercept
    }
}

/// Only complete same-origin responses are cached.
pub fn is_cacheable(response: &FetchResponse) -> bool {
    response.status == StatusCode::OK && response.response_type == ResponseType::Basic
}

/// Fallback page for a failed request.
pub fn fallback_page(destination: Destination, fallbacks: &FallbackPages) -> &str {
    match destination {
        Destination::Document => &fallbacks.offline,
        _ => &fallbacks.root,
    }
}

/// What to do after a cache miss went to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissAction<'a> {
    /// Store a copy, then return the response.
    Store,
    /// Return the response without caching it.
    Return,
    /// The network failed; serve this cached page instead.
    Fallback(&'a str),
}

pub fn after_network<'a>(
    result: &Result<FetchResponse, Error>, destination: Destination, fallbacks: &'a FallbackPages,
) -> MissAction<'a> {
    match result {
        Ok(response) if is_cacheable(response) => MissAction::Store,
        Ok(_) => MissAction::Return,
        Err(_) => MissAction::Fallback(fallback_page(destination, fallbacks)),
    }
}

/// How a request was answered.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; fetched straight from the network.
    PassThrough { reason: PassThroughReason, response: FetchResponse },
    /// Served from the current bucket.
    Cache(CachedResponse),
    /// Fetched from the network after a miss.
    Network { response: FetchResponse, stored: bool },
    /// The network failed. `response` is None when the fallback page is not cached.
    Fallback { page: String, response: Option<CachedResponse>, error: String },
}

impl Worker {
    /// Answer a request.
    ///
    /// # Errors
    ///
    /// Only requests that pass through can fail; intercepted requests always
    /// resolve to an outcome.
    pub async fn handle_fetch(&self, request: InterceptRequest) -> Result<FetchOutcome, Error> {
        let controlling = self.controls_clients().await;

        if let Route::PassThrough(reason) = route(&request, &self.origin, controlling) {
            tracing::debug!(url = %request.url, method = %request.method, ?reason, "passing through");
            let response = self.network.fetch(&request.method, &request.url).await?;
            return Ok(FetchOutcome::PassThrough { reason, response });
        }

        let key = request.url.to_string();
        match self.db.match_url(&self.cache_name, &key).await {
            Ok(Some(cached)) => {
                tracing::debug!(url = %key, "serving from cache");
                return Ok(FetchOutcome::Cache(cached));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(url = %key, error = %e, "cache lookup failed; treating as miss"),
        }

        tracing::debug!(url = %key, "fetching from network");
        let result = self.network.fetch(&Method::GET, &request.url).await;

        match after_network(&result, request.destination, &self.fallbacks) {
            MissAction::Store => {
                let response = result?;
                let copy = response.duplicate();
                let stored = match self.db.put(&self.cache_name, &copy.into_cached(&key)).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(url = %key, error = %e, "failed to cache response");
                        false
                    }
                };
                Ok(FetchOutcome::Network { response, stored })
            }
            MissAction::Return => Ok(FetchOutcome::Network { response: result?, stored: false }),
            MissAction::Fallback(page) => {
                let error = result.err().map(|e| e.to_string()).unwrap_or_default();
                tracing::error!(url = %key, error = %error, fallback = page, "network request failed");
                let response = self.match_fallback(page).await;
                Ok(FetchOutcome::Fallback { page: page.to_string(), response, error })
            }
        }
    }

    async fn match_fallback(&self, page: &str) -> Option<CachedResponse> {
        let url = match self.origin.resolve(page) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(page, error = %e, "invalid fallback page");
                return None;
            }
        };

        match self.db.match_url(&self.cache_name, url.as_str()).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(page, error = %e, "fallback lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::worker::testing::{FakeNetwork, ORIGIN, active_worker, test_worker};
    use offline_client::{FetchClient, FetchConfig};
    use offline_core::{AppConfig, CacheDb};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn url(path: &str) -> Url {
        Url::parse(&format!("{ORIGIN}{path}")).unwrap()
    }

    fn fallbacks() -> FallbackPages {
        FallbackPages { offline: "/pwa/offline.html".into(), root: "/index.html".into() }
    }

    #[test]
    fn test_route_rules() {
        let origin = AppOrigin::parse(ORIGIN).unwrap();

        let get = InterceptRequest::get(url("/a"), Destination::Empty);
        assert_eq!(route(&get, &origin, true), Route::Intercept);
        assert_eq!(route(&get, &origin, false), Route::PassThrough(PassThroughReason::NotControlling));

        let post = InterceptRequest { method: Method::POST, ..get.clone() };
        assert_eq!(route(&post, &origin, true), Route::PassThrough(PassThroughReason::NotGet));

        let cross = InterceptRequest::get(Url::parse("https://cdn.example.com/a.js").unwrap(), Destination::Script);
        assert_eq!(route(&cross, &origin, true), Route::PassThrough(PassThroughReason::CrossOrigin));
    }

    #[test]
    fn test_fallback_page_by_destination() {
        let pages = fallbacks();
        assert_eq!(fallback_page(Destination::Document, &pages), "/pwa/offline.html");
        assert_eq!(fallback_page(Destination::Image, &pages), "/index.html");
        assert_eq!(fallback_page(Destination::Empty, &pages), "/index.html");
    }

    #[test]
    fn test_after_network_failure() {
        let pages = fallbacks();
        let result = Err(Error::Network("offline".into()));
        assert_eq!(after_network(&result, Destination::Document, &pages), MissAction::Fallback("/pwa/offline.html"));
    }

    #[test]
    fn test_destination_parsing() {
        let d: Destination = serde_json::from_str(r#""document""#).unwrap();
        assert_eq!(d, Destination::Document);
        let d: Destination = serde_json::from_str(r#""iframe""#).unwrap();
        assert_eq!(d, Destination::Empty);
    }

    #[tokio::test]
    async fn test_precached_url_served_without_network() {
        let network = FakeNetwork::new();
        network.serve("/index.html", "index");
        let worker = active_worker(network.clone(), &["/index.html"]).await;
        let calls_after_install = network.calls();

        let outcome = worker
            .handle_fetch(InterceptRequest::get(url("/index.html"), Destination::Document))
            .await
            .unwrap();

        assert!(matches!(outcome, FetchOutcome::Cache(ref c) if c.body == b"index"));
        assert_eq!(network.calls(), calls_after_install);
    }

    #[tokio::test]
    async fn test_cache_then_serve_round_trip() {
        let network = FakeNetwork::new();
        network.serve("/data.json", "{\"n\":1}");
        let worker = active_worker(network.clone(), &[]).await;
        let request = InterceptRequest::get(url("/data.json"), Destination::Empty);

        let first = worker.handle_fetch(request.clone()).await.unwrap();
        let first_body = match first {
            FetchOutcome::Network { response, stored } => {
                assert!(stored);
                response.bytes.to_vec()
            }
            other => panic!("expected network outcome, got {other:?}"),
        };

        let second = worker.handle_fetch(request).await.unwrap();
        match second {
            FetchOutcome::Cache(cached) => assert_eq!(cached.body, first_body),
            other => panic!("expected cache outcome, got {other:?}"),
        }
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_both_store() {
        let network = FakeNetwork::new();
        network.serve("/race.json", "{\"n\":2}");
        let worker = active_worker(network.clone(), &[]).await;
        network.rendezvous(2);
        let request = InterceptRequest::get(url("/race.json"), Destination::Empty);

        let (first, second) = tokio::join!(worker.handle_fetch(request.clone()), worker.handle_fetch(request));

        for outcome in [first.unwrap(), second.unwrap()] {
            match outcome {
                FetchOutcome::Network { response, stored } => {
                    assert!(stored);
                    assert_eq!(&response.bytes[..], b"{\"n\":2}");
                }
                other => panic!("expected network outcome, got {other:?}"),
            }
        }
        assert_eq!(network.calls(), 2);
        assert_eq!(worker.db().entry_count(worker.cache_name()).await.unwrap(), 1);

        let cached = worker.db().match_url(worker.cache_name(), url("/race.json").as_str()).await.unwrap().unwrap();
        assert_eq!(cached.body, b"{\"n\":2}");
    }

    #[tokio::test]
    async fn test_non_ok_response_not_cached() {
        let network = FakeNetwork::new();
        network.serve_status("/gone", 404, "not here");
        let worker = active_worker(network.clone(), &[]).await;
        let request = InterceptRequest::get(url("/gone"), Destination::Document);

        let outcome = worker.handle_fetch(request.clone()).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Network { stored: false, ref response } if response.status == 404));

        worker.handle_fetch(request).await.unwrap();
        assert_eq!(network.calls(), 2);
    }

    #[tokio::test]
    async fn test_redirect_off_origin_not_cached() {
        let network = FakeNetwork::new();
        network.serve_redirected("/out", "https://elsewhere.example.com/landing", "elsewhere");
        let worker = active_worker(network, &[]).await;

        let outcome = worker
            .handle_fetch(InterceptRequest::get(url("/out"), Destination::Document))
            .await
            .unwrap();

        match outcome {
            FetchOutcome::Network { response, stored } => {
                assert!(!stored);
                assert_eq!(response.response_type, ResponseType::Opaque);
            }
            other => panic!("expected network outcome, got {other:?}"),
        }
        assert_eq!(worker.db().entry_count(worker.cache_name()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_document_failure_serves_offline_page() {
        let network = FakeNetwork::new();
        network.serve("/pwa/offline.html", "you are offline");
        network.serve("/index.html", "index");
        let worker = active_worker(network.clone(), &["/pwa/offline.html", "/index.html"]).await;
        network.set_offline(true);

        let outcome = worker
            .handle_fetch(InterceptRequest::get(url("/pages/blog.html"), Destination::Document))
            .await
            .unwrap();

        match outcome {
            FetchOutcome::Fallback { page, response, error } => {
                assert_eq!(page, "/pwa/offline.html");
                assert_eq!(response.unwrap().body, b"you are offline");
                assert!(error.contains("NETWORK_ERROR"));
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_subresource_failure_serves_root_page() {
        let network = FakeNetwork::new();
        network.serve("/pwa/offline.html", "you are offline");
        network.serve("/index.html", "index");
        let worker = active_worker(network.clone(), &["/pwa/offline.html", "/index.html"]).await;
        network.set_offline(true);

        let outcome = worker
            .handle_fetch(InterceptRequest::get(url("/app.js"), Destination::Script))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            FetchOutcome::Fallback { ref page, response: Some(ref r), .. } if page == "/index.html" && r.body == b"index"
        ));
    }

    #[tokio::test]
    async fn test_missing_fallback_is_empty() {
        let network = FakeNetwork::new();
        let worker = active_worker(network.clone(), &[]).await;
        network.set_offline(true);

        let outcome = worker
            .handle_fetch(InterceptRequest::get(url("/anything"), Destination::Document))
            .await
            .unwrap();

        assert!(matches!(outcome, FetchOutcome::Fallback { response: None, .. }));
    }

    #[tokio::test]
    async fn test_non_get_passes_through() {
        let network = FakeNetwork::new();
        network.serve("/api/submit", "ok");
        let worker = active_worker(network.clone(), &[]).await;
        let request =
            InterceptRequest { method: Method::POST, url: url("/api/submit"), destination: Destination::Empty };

        let outcome = worker.handle_fetch(request).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::PassThrough { reason: PassThroughReason::NotGet, .. }));
        assert_eq!(network.last_request(), Some((Method::POST, url("/api/submit").to_string())));
        assert_eq!(worker.db().entry_count(worker.cache_name()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_get_reaches_upstream_with_its_method() {
        let network = FakeNetwork::new();
        network.serve("/api/item", "deleted");
        let worker = active_worker(network.clone(), &[]).await;

        for method in [Method::PUT, Method::DELETE, Method::PATCH] {
            let request =
                InterceptRequest { method: method.clone(), url: url("/api/item"), destination: Destination::Empty };
            worker.handle_fetch(request).await.unwrap();
            assert_eq!(network.last_request(), Some((method, url("/api/item").to_string())));
        }
    }

    #[tokio::test]
    async fn test_post_forwarded_upstream_as_post() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin = format!("http://{}", listener.local_addr().unwrap());
        let upstream = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf[..n]).lines().next().unwrap_or_default().to_string()
        });

        let config = AppConfig { origin: origin.clone(), ..Default::default() };
        let client = FetchClient::new(FetchConfig::from(&config), AppOrigin::parse(&origin).unwrap()).unwrap();
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = Worker::new(&config, db, Arc::new(client)).unwrap().with_precache(Vec::new());

        let request = InterceptRequest {
            method: Method::POST,
            url: Url::parse(&format!("{origin}/api/submit")).unwrap(),
            destination: Destination::Empty,
        };
        let outcome = worker.handle_fetch(request).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::PassThrough { ref response, .. } if response.status == 201));
        assert_eq!(upstream.await.unwrap(), "POST /api/submit HTTP/1.1");
    }

    #[tokio::test]
    async fn test_intercepted_miss_fetches_with_get() {
        let network = FakeNetwork::new();
        network.serve("/about.html", "about");
        let worker = active_worker(network.clone(), &[]).await;

        worker.handle_fetch(InterceptRequest::get(url("/about.html"), Destination::Document)).await.unwrap();
        assert_eq!(network.last_request(), Some((Method::GET, url("/about.html").to_string())));
    }

    #[tokio::test]
    async fn test_cross_origin_passes_through_and_fails_plainly() {
        let network = FakeNetwork::new();
        network.serve("/pwa/offline.html", "you are offline");
        let worker = active_worker(network.clone(), &["/pwa/offline.html"]).await;
        network.set_offline(true);

        let request =
            InterceptRequest::get(Url::parse("https://cdn.example.com/lib.js").unwrap(), Destination::Document);
        let result = worker.handle_fetch(request).await;

        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_uncontrolled_worker_passes_through() {
        let network = FakeNetwork::new();
        network.serve("/index.html", "index");
        let worker = test_worker(network.clone(), &["/index.html"], false).await;
        worker.install().await.unwrap();

        let outcome = worker
            .handle_fetch(InterceptRequest::get(url("/index.html"), Destination::Document))
            .await
            .unwrap();

        assert!(matches!(outcome, FetchOutcome::PassThrough { reason: PassThroughReason::NotControlling, .. }));
    }
}
