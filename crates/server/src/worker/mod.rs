//! The offline worker.
//!
//! One `Worker` owns the current cache bucket and handles every event the
//! host delivers: install, activate, fetch, message, push, notification click
//! and sync. Decisions are made by pure functions in the submodules; the
//! `Worker` methods only execute them against `CacheDb` and `Network`.

pub mod intercept;
pub mod lifecycle;
pub mod messaging;
pub mod notify;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt::Display;
use std::sync::Arc;

use offline_client::{AppOrigin, Network};
use offline_core::{AppConfig, CacheDb, Error, manifest};
use tokio::sync::RwLock;

pub use intercept::{Destination, FetchOutcome, InterceptRequest};
pub use lifecycle::{ActivateReport, InstallReport, StartReport, WorkerState};
pub use messaging::{ControlMessage, MessageReply};
pub use notify::{ClickOutcome, Notification};
pub use sync::SyncOutcome;

/// Pages served when the network fails.
#[derive(Debug, Clone)]
pub struct FallbackPages {
    /// Served for failed document (navigation) requests.
    pub offline: String,
    /// Served for every other failed request.
    pub root: String,
}

#[derive(Debug)]
struct Lifecycle {
    state: WorkerState,
    skip_waiting: bool,
    clients_claimed: bool,
}

/// Offline cache worker bound to one application origin and cache version.
pub struct Worker {
    db: CacheDb,
    network: Arc<dyn Network>,
    origin: AppOrigin,
    app_name: String,
    cache_name: String,
    precache: Vec<String>,
    fallbacks: FallbackPages,
    lifecycle: RwLock<Lifecycle>,
}

impl Worker {
    /// Create a worker from configuration.
    ///
    /// The worker starts in `WorkerState::Parsed` with the compiled-in
    /// precache manifest.
    pub fn new(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = AppOrigin::parse(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        Ok(Self {
            db,
            network,
            origin,
            app_name: config.app_name.clone(),
            cache_name: config.cache_name(),
            precache: manifest::PRECACHE_URLS.iter().map(|u| u.to_string()).collect(),
            fallbacks: FallbackPages { offline: config.offline_page.clone(), root: config.root_page.clone() },
            lifecycle: RwLock::new(Lifecycle {
                state: WorkerState::Parsed,
                skip_waiting: config.skip_waiting,
                clients_claimed: false,
            }),
        })
    }

    /// Replace the precache manifest.
    #[cfg(test)]
    pub fn with_precache(mut self, urls: Vec<String>) -> Self {
        self.precache = urls;
        self
    }

    /// Name of the bucket this worker owns.
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn origin(&self) -> &AppOrigin {
        &self.origin
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }
}

/// Log a failure nobody is waiting on, then drop it.
pub fn report_unhandled(context: &str, err: impl Display) {
    tracing::error!(context, error = %err, "unhandled failure suppressed");
}
