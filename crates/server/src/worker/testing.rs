//! Scripted network and worker builders for tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use offline_client::{FetchResponse, Method, Network, StatusCode, header};
use offline_core::{AppConfig, CacheDb, Error, ResponseType};
use tokio::sync::Barrier;
use url::Url;

use super::Worker;

pub const ORIGIN: &str = "http://localhost:8080";

#[derive(Clone)]
struct Canned {
    status: u16,
    body: &'static str,
    final_url: Option<&'static str>,
}

#[derive(Default)]
struct Inner {
    routes: Mutex<HashMap<String, Canned>>,
    offline: AtomicBool,
    calls: AtomicUsize,
    last_request: Mutex<Option<(Method, String)>>,
    barrier: Mutex<Option<Arc<Barrier>>>,
}

/// In-memory `Network` keyed by full URL.
///
/// Unknown URLs and every URL while offline fail with `Error::Network`.
#[derive(Clone, Default)]
pub struct FakeNetwork {
    inner: Arc<Inner>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn absolute(path: &str) -> String {
        if path.starts_with('/') { format!("{ORIGIN}{path}") } else { path.to_string() }
    }

    pub fn serve(&self, path: &str, body: &'static str) {
        self.serve_status(path, 200, body);
    }

    pub fn serve_status(&self, path: &str, status: u16, body: &'static str) {
        self.inner
            .routes
            .lock()
            .unwrap()
            .insert(Self::absolute(path), Canned { status, body, final_url: None });
    }

    /// Serve `path` as if it redirected to `final_url`.
    pub fn serve_redirected(&self, path: &str, final_url: &'static str, body: &'static str) {
        self.inner
            .routes
            .lock()
            .unwrap()
            .insert(Self::absolute(path), Canned { status: 200, body, final_url: Some(final_url) });
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of fetches attempted so far.
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Hold every fetch until `parties` fetches are in flight.
    pub fn rendezvous(&self, parties: usize) {
        *self.inner.barrier.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
    }

    /// Method and URL of the most recent fetch.
    pub fn last_request(&self) -> Option<(Method, String)> {
        self.inner.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, method: &Method, url: &Url) -> Result<FetchResponse, Error> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_request.lock().unwrap() = Some((method.clone(), url.to_string()));

        let barrier = self.inner.barrier.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{url}: offline")));
        }

        let canned = self
            .inner
            .routes
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| Error::Network(format!("{url}: connection refused")))?;

        let final_url = match canned.final_url {
            Some(u) => Url::parse(u).unwrap(),
            None => url.clone(),
        };
        let response_type =
            if final_url.origin() == url.origin() { ResponseType::Basic } else { ResponseType::Opaque };

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html"));

        Ok(FetchResponse {
            url: url.clone(),
            final_url,
            status: StatusCode::from_u16(canned.status).unwrap(),
            response_type,
            headers,
            bytes: Bytes::from_static(canned.body.as_bytes()),
            fetch_ms: 1,
        })
    }
}

/// Worker over an in-memory database with the given manifest.
pub async fn test_worker(network: FakeNetwork, precache: &[&str], skip_waiting: bool) -> Worker {
    let config = AppConfig { origin: ORIGIN.to_string(), skip_waiting, ..Default::default() };
    let db = CacheDb::open_in_memory().await.unwrap();
    Worker::new(&config, db, Arc::new(network))
        .unwrap()
        .with_precache(precache.iter().map(|p| p.to_string()).collect())
}

/// Worker that has installed `precache` and activated.
pub async fn active_worker(network: FakeNetwork, precache: &[&str]) -> Worker {
    let worker = test_worker(network, precache, true).await;
    worker.start().await.unwrap();
    worker
}

/// Fresh on-disk database path, unique to this process.
pub fn scratch_db(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("offline-proxy-{}-{name}.sqlite", std::process::id()));
    remove_db(&path);
    path
}

pub fn remove_db(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

/// Drop the cache tables behind the worker's back so every cache call fails.
pub async fn break_storage(path: &Path) {
    let conn = tokio_rusqlite::Connection::open(path).await.unwrap();
    conn.call(|conn| conn.execute_batch("DROP TABLE entries; DROP TABLE buckets;"))
        .await
        .unwrap();
}
