//! Background sync events.

use offline_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Worker, report_unhandled};

/// The only sync tag this worker acts on.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed,
    Failed,
    Ignored,
}

impl Worker {
    /// Handle a sync event. Failures are logged and reported, never raised.
    pub async fn on_sync(&self, tag: &str) -> SyncOutcome {
        tracing::debug!(tag, "background sync event");

        if tag != BACKGROUND_SYNC_TAG {
            return SyncOutcome::Ignored;
        }

        match self.background_sync().await {
            Ok(()) => {
                tracing::info!(tag, "background sync complete");
                SyncOutcome::Completed
            }
            Err(e) => {
                report_unhandled("background_sync", &e);
                SyncOutcome::Failed
            }
        }
    }

    /// Confirm the current bucket is still reachable.
    async fn background_sync(&self) -> Result<(), Error> {
        let entries = self.db.entry_count(&self.cache_name).await?;
        tracing::debug!(bucket = %self.cache_name, entries, "sync checked bucket");
        Ok(())
    }
}
