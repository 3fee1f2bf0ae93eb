//! Install and activation.
//!
//! Install pre-populates the current bucket from the manifest. Activation
//! deletes every other bucket and takes control of clients. A failed manifest
//! entry is logged and reported; the rest of the bucket is kept.

use std::fmt;

use offline_client::Method;
use offline_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Worker;

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Created, nothing cached yet.
    Parsed,
    Installing,
    /// Bucket populated, waiting to activate.
    Installed,
    Activating,
    /// Old buckets retired; intercepting requests.
    Activated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
        };
        f.write_str(name)
    }
}

/// A manifest entry that could not be cached.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallFailure {
    pub url: String,
    pub reason: String,
}

/// Result of an install.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    /// Bucket that was populated.
    pub bucket: String,
    /// Manifest URLs now cached, in manifest order.
    pub cached: Vec<String>,
    /// Manifest URLs that failed.
    pub failed: Vec<InstallFailure>,
}

/// Result of an activation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateReport {
    /// Bucket that remains current.
    pub current: String,
    /// Buckets that were deleted.
    pub deleted: Vec<String>,
    /// Whether the worker now controls clients.
    pub clients_claimed: bool,
}

/// Result of a start: install, then activate when skip-waiting is set.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StartReport {
    pub install: InstallReport,
    pub activate: Option<ActivateReport>,
}

impl Worker {
    pub async fn state(&self) -> WorkerState {
        self.lifecycle.read().await.state
    }

    /// Whether fetches are being intercepted.
    pub async fn controls_clients(&self) -> bool {
        let lifecycle = self.lifecycle.read().await;
        lifecycle.state == WorkerState::Activated && lifecycle.clients_claimed
    }

    /// Open the current bucket and cache every manifest URL.
    ///
    /// Entries that fail to fetch, or answer with a non-OK status, are logged
    /// and listed in the report; they do not abort the install. An active
    /// worker stays active while it re-populates. If the bucket cannot be
    /// opened the previous state is restored.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let previous = {
            let mut lifecycle = self.lifecycle.write().await;
            let previous = lifecycle.state;
            if previous != WorkerState::Activated {
                lifecycle.state = WorkerState::Installing;
            }
            previous
        };
        tracing::info!(bucket = %self.cache_name, "installing");

        if let Err(e) = self.db.open_bucket(&self.cache_name).await {
            self.lifecycle.write().await.state = previous;
            return Err(e);
        }

        let mut cached = Vec::with_capacity(self.precache.len());
        let mut failed = Vec::new();

        for path in &self.precache {
            match self.precache_one(path).await {
                Ok(()) => cached.push(path.clone()),
                Err(e) => {
                    tracing::warn!(url = %path, error = %e, "failed to precache");
                    failed.push(InstallFailure { url: path.clone(), reason: e.to_string() });
                }
            }
        }

        {
            let mut lifecycle = self.lifecycle.write().await;
            if lifecycle.state == WorkerState::Installing {
                lifecycle.state = WorkerState::Installed;
            }
        }

        tracing::info!(
            bucket = %self.cache_name,
            cached = cached.len(),
            failed = failed.len(),
            "installed"
        );

        Ok(InstallReport { bucket: self.cache_name.clone(), cached, failed })
    }

    async fn precache_one(&self, path: &str) -> Result<(), Error> {
        let url = self.origin.resolve(path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let response = self.network.fetch(&Method::GET, &url).await?;

        if !response.status.is_success() {
            return Err(Error::HttpError(format!("{} answered {}", url, response.status.as_u16())));
        }

        let key = url.to_string();
        self.db.put(&self.cache_name, &response.into_cached(&key)).await
    }

    /// Delete every bucket except the current one and claim clients.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the worker has not been installed.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        {
            let mut lifecycle = self.lifecycle.write().await;
            match lifecycle.state {
                WorkerState::Installed | WorkerState::Activated => lifecycle.state = WorkerState::Activating,
                other => return Err(Error::InvalidState(format!("cannot activate while {other}"))),
            }
        }
        tracing::info!(bucket = %self.cache_name, "activating");

        let result = self.retire_old_buckets().await;

        let mut lifecycle = self.lifecycle.write().await;
        match result {
            Ok(deleted) => {
                lifecycle.state = WorkerState::Activated;
                lifecycle.clients_claimed = true;
                tracing::info!(bucket = %self.cache_name, deleted = deleted.len(), "activated; clients claimed");
                Ok(ActivateReport { current: self.cache_name.clone(), deleted, clients_claimed: true })
            }
            Err(e) => {
                lifecycle.state = WorkerState::Installed;
                Err(e)
            }
        }
    }

    async fn retire_old_buckets(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.db.bucket_names().await? {
            if name != self.cache_name {
                tracing::info!(bucket = %name, "deleting old cache");
                self.db.delete_bucket(&name).await?;
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Activate as soon as installation allows.
    ///
    /// Returns the activation report when this call activated the worker.
    pub async fn skip_waiting(&self) -> Result<Option<ActivateReport>, Error> {
        let installed = {
            let mut lifecycle = self.lifecycle.write().await;
            lifecycle.skip_waiting = true;
            lifecycle.state == WorkerState::Installed
        };

        if installed { self.activate().await.map(Some) } else { Ok(None) }
    }

    /// Install, then activate immediately if skip-waiting is set.
    pub async fn start(&self) -> Result<StartReport, Error> {
        let install = self.install().await?;

        let skip_waiting = {
            let lifecycle = self.lifecycle.read().await;
            lifecycle.skip_waiting && lifecycle.state == WorkerState::Installed
        };

        let activate = if skip_waiting { Some(self.activate().await?) } else { None };

        Ok(StartReport { install, activate })
    }
}
