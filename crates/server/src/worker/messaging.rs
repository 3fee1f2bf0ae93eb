//! Control messages from pages.
//!
//! Messages are JSON objects tagged by `type`. Unknown or malformed messages
//! are ignored, matching how a page's stray `postMessage` is treated.

use offline_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Worker, report_unhandled};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate as soon as possible. No reply.
    SkipWaiting,
    /// Reply with the current bucket name.
    GetVersion,
    /// Delete every bucket, then acknowledge.
    ClearCache,
}

impl ControlMessage {
    /// Parse a message, returning None for anything unrecognised.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum MessageReply {
    Version { version: String },
    Cleared { success: bool },
}

impl Worker {
    /// Handle a control message and produce its reply, if it has one.
    pub async fn handle_message(&self, message: ControlMessage) -> Result<Option<MessageReply>, Error> {
        tracing::debug!(?message, "received control message");

        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting().await?;
                Ok(None)
            }
            ControlMessage::GetVersion => Ok(Some(MessageReply::Version { version: self.cache_name.clone() })),
            ControlMessage::ClearCache => {
                let success = match self.clear_all().await {
                    Ok(_) => true,
                    Err(e) => {
                        report_unhandled("clear_cache", &e);
                        false
                    }
                };
                Ok(Some(MessageReply::Cleared { success }))
            }
        }
    }

    /// Delete every bucket, including the current one.
    ///
    /// Returns the names that were deleted. Buckets are deleted one at a time,
    /// so on error the ones already deleted stay deleted.
    pub async fn clear_all(&self) -> Result<Vec<String>, Error> {
        let names = self.db.bucket_names().await?;
        for name in &names {
            self.db.delete_bucket(name).await?;
        }
        tracing::info!(count = names.len(), "cleared all caches");
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::worker::WorkerState;
    use crate::worker::testing::{
        FakeNetwork, ORIGIN, active_worker, break_storage, remove_db, scratch_db, test_worker,
    };
    use offline_core::{AppConfig, CacheDb};
    use serde_json::json;

    #[test]
    fn test_parse_messages() {
        assert_eq!(ControlMessage::from_value(&json!({"type": "SKIP_WAITING"})), Some(ControlMessage::SkipWaiting));
        assert_eq!(ControlMessage::from_value(&json!({"type": "GET_VERSION"})), Some(ControlMessage::GetVersion));
        assert_eq!(ControlMessage::from_value(&json!({"type": "CLEAR_CACHE"})), Some(ControlMessage::ClearCache));
        assert_eq!(ControlMessage::from_value(&json!({"type": "UPDATE_AVAILABLE"})), None);
        assert_eq!(ControlMessage::from_value(&json!({"kind": "GET_VERSION"})), None);
        assert_eq!(ControlMessage::from_value(&json!("GET_VERSION")), None);
    }

    #[test]
    fn test_reply_wire_format() {
        let version = MessageReply::Version { version: "tounet-cache-v1.0.0".into() };
        assert_eq!(serde_json::to_value(&version).unwrap(), json!({"version": "tounet-cache-v1.0.0"}));

        let cleared = MessageReply::Cleared { success: true };
        assert_eq!(serde_json::to_value(&cleared).unwrap(), json!({"success": true}));
    }

    #[tokio::test]
    async fn test_get_version_returns_bucket_name() {
        let worker = test_worker(FakeNetwork::new(), &[], false).await;
        let reply = worker.handle_message(ControlMessage::GetVersion).await.unwrap();
        assert_eq!(reply, Some(MessageReply::Version { version: "tounet-cache-v1.0.0".into() }));
    }

    #[tokio::test]
    async fn test_clear_cache_leaves_no_buckets() {
        let network = FakeNetwork::new();
        network.serve("/", "root");
        let worker = active_worker(network, &["/"]).await;
        worker.db().open_bucket("another").await.unwrap();

        let reply = worker.handle_message(ControlMessage::ClearCache).await.unwrap();

        assert_eq!(reply, Some(MessageReply::Cleared { success: true }));
        assert!(worker.db().bucket_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_cache_is_idempotent() {
        let worker = test_worker(FakeNetwork::new(), &[], false).await;
        worker.handle_message(ControlMessage::ClearCache).await.unwrap();
        let reply = worker.handle_message(ControlMessage::ClearCache).await.unwrap();
        assert_eq!(reply, Some(MessageReply::Cleared { success: true }));
    }

    #[tokio::test]
    async fn test_skip_waiting_message_activates_installed_worker() {
        let network = FakeNetwork::new();
        network.serve("/", "root");
        let worker = test_worker(network, &["/"], false).await;
        worker.install().await.unwrap();

        let reply = worker.handle_message(ControlMessage::SkipWaiting).await.unwrap();

        assert!(reply.is_none());
        assert_eq!(worker.state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_clear_cache_failure_replies_unsuccessful() {
        let path = scratch_db("clear-failure");
        let config = AppConfig { origin: ORIGIN.to_string(), ..Default::default() };
        let db = CacheDb::open(&path).await.unwrap();
        let worker = Worker::new(&config, db, Arc::new(FakeNetwork::new())).unwrap();
        worker.db().open_bucket("tounet-cache-v1.0.0").await.unwrap();

        break_storage(&path).await;

        let reply = worker.handle_message(ControlMessage::ClearCache).await.unwrap();
        assert_eq!(reply, Some(MessageReply::Cleared { success: false }));
        remove_db(&path);
    }
}
