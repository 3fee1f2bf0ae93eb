//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFLINE_PROXY_*)
//! 2. TOML config file (if OFFLINE_PROXY_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::manifest;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFLINE_PROXY_*)
/// 2. TOML config file (if OFFLINE_PROXY_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name, used as the bucket name prefix.
    ///
    /// Set via OFFLINE_PROXY_APP_NAME environment variable.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Application release shown by the page companion.
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Semantic version of the cache bucket.
    ///
    /// Bumping this retires every older bucket on activation.
    /// Set via OFFLINE_PROXY_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin of the application being proxied (scheme, host, optional port).
    ///
    /// Set via OFFLINE_PROXY_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite cache storage.
    ///
    /// Set via OFFLINE_PROXY_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Page served for failed document requests.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Page served for any other failed request.
    #[serde(default = "default_root_page")]
    pub root_page: String,

    /// Activate as soon as installation finishes.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Whether the page companion may show notifications.
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,

    /// Prompt the user when a new version is available.
    #[serde(default = "default_true")]
    pub update_prompt_user: bool,

    /// Reload without prompting when a new version is available.
    #[serde(default)]
    pub update_auto_update: bool,
}

fn default_app_name() -> String {
    "tounet".into()
}

fn default_app_version() -> String {
    "4.0.0-202509".into()
}

fn default_cache_version() -> String {
    "1.0.0".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offline-proxy-cache.sqlite")
}

fn default_user_agent() -> String {
    "offline-proxy/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_offline_page() -> String {
    "/pwa/offline.html".into()
}

fn default_root_page() -> String {
    "/index.html".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            app_version: default_app_version(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            offline_page: default_offline_page(),
            root_page: default_root_page(),
            skip_waiting: true,
            notifications_enabled: true,
            update_prompt_user: true,
            update_auto_update: false,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the bucket owned by this build.
    pub fn cache_name(&self) -> String {
        manifest::cache_name(&self.app_name, &self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFLINE_PROXY_`
    /// 2. TOML file from `OFFLINE_PROXY_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFLINE_PROXY_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFLINE_PROXY_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
