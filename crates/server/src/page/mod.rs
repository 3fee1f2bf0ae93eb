//! Page-side companion.
//!
//! `PwaTools` is what a page's bootstrap constructs next to the worker: it
//! tracks notification permission and network status and decides how to
//! react to an available update. The caller owns its lifecycle through
//! `init` and `dispose`; every other call requires an initialised instance.

use std::sync::Arc;

use offline_core::{AppConfig, Error};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::worker::{Notification, Worker, notify::display_name};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

/// Descriptive only; the worker always serves cache-first.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInfo {
    pub strategy: String,
    pub cache_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub permission: Permission,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdatePolicy {
    pub auto_update: bool,
    pub prompt_user: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PwaConfig {
    pub app: AppInfo,
    pub cache: CacheInfo,
    pub notifications: NotificationSettings,
    pub update: UpdatePolicy,
}

impl From<&AppConfig> for PwaConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            app: AppInfo { name: display_name(&config.app_name), version: config.app_version.clone() },
            cache: CacheInfo { strategy: "cache-first".into(), cache_name: config.cache_name() },
            notifications: NotificationSettings {
                enabled: config.notifications_enabled,
                permission: Permission::Default,
            },
            update: UpdatePolicy { auto_update: config.update_auto_update, prompt_user: config.update_prompt_user },
        }
    }
}

/// How to react to a newly available version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UpdateDecision {
    /// Ask the user; reload if they accept.
    Prompt,
    /// Reload straight away.
    Reload,
    Ignore,
}

#[derive(Debug)]
struct PageState {
    active: bool,
    online: bool,
    config: PwaConfig,
}

/// Page companion with caller-controlled lifecycle.
pub struct PwaTools {
    worker: Arc<Worker>,
    state: RwLock<PageState>,
}

impl PwaTools {
    pub fn new(config: PwaConfig, worker: Arc<Worker>) -> Self {
        Self { worker, state: RwLock::new(PageState { active: false, online: true, config }) }
    }

    /// Start tracking. Assumes the page is online.
    pub async fn init(&self) {
        let mut state = self.state.write().await;
        state.active = true;
        state.online = true;
        tracing::info!(app = %state.config.app.name, "page tools initialised");
    }

    /// Stop tracking. Later calls fail until `init` runs again.
    pub async fn dispose(&self) {
        self.state.write().await.active = false;
        tracing::info!("page tools disposed");
    }

    pub async fn config(&self) -> PwaConfig {
        self.state.read().await.config.clone()
    }

    fn ensure_active(state: &PageState) -> Result<(), Error> {
        if state.active { Ok(()) } else { Err(Error::InvalidState("page tools are not initialised".into())) }
    }

    /// Record the permission the host obtained from the user.
    pub async fn set_permission(&self, permission: Permission) -> Result<(), Error> {
        let mut state = self.state.write().await;
        Self::ensure_active(&state)?;
        state.config.notifications.permission = permission;
        Ok(())
    }

    /// Build a notification if notifications are enabled and permitted.
    pub async fn send_notification(
        &self, title: &str, body: &str, tag: Option<&str>,
    ) -> Result<Option<Notification>, Error> {
        let state = self.state.read().await;
        Self::ensure_active(&state)?;
        let settings = &state.config.notifications;
        if settings.enabled && settings.permission == Permission::Granted {
            Ok(Some(Notification::simple(title, body, tag)))
        } else {
            tracing::debug!(title, permission = ?settings.permission, "notification suppressed");
            Ok(None)
        }
    }

    /// Record a network status change.
    ///
    /// Coming back online produces a "network restored" notification when
    /// notifications are allowed.
    pub async fn network_status_changed(&self, online: bool) -> Result<Option<Notification>, Error> {
        let was_offline = {
            let mut state = self.state.write().await;
            Self::ensure_active(&state)?;
            let was_offline = !state.online;
            state.online = online;
            was_offline
        };

        tracing::info!(online, "network status changed");

        if was_offline && online {
            self.send_notification("Network restored", "All features are available again", Some("network-status"))
                .await
        } else {
            Ok(None)
        }
    }

    pub async fn update_available(&self) -> Result<UpdateDecision, Error> {
        let state = self.state.read().await;
        Self::ensure_active(&state)?;
        let update = &state.config.update;
        let decision = if update.prompt_user {
            UpdateDecision::Prompt
        } else if update.auto_update {
            UpdateDecision::Reload
        } else {
            UpdateDecision::Ignore
        };
        tracing::info!(?decision, "update available");
        Ok(decision)
    }

    /// Delete every cache bucket. Returns false if clearing failed.
    pub async fn clear_app_data(&self) -> Result<bool, Error> {
        Self::ensure_active(&*self.state.read().await)?;
        match self.worker.clear_all().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::error!(error = %e, "failed to clear app data");
                Ok(false)
            }
        }
    }
}
