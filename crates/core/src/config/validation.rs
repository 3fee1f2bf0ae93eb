//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::manifest::{self, PRECACHE_URLS};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `app_name` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `cache_version` is not a dotted numeric version
    /// - `origin` is not a bare http(s) origin
    /// - `offline_page` or `root_page` is not root-relative
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_name.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "app_name".into(),
                hint: "Set OFFLINE_PROXY_APP_NAME environment variable".into(),
            });
        }

        if !manifest::is_semver(&self.cache_version) {
            return Err(ConfigError::Invalid {
                field: "cache_version".into(),
                reason: format!("'{}' is not a semantic version", self.cache_version),
            });
        }

        self.validate_origin()?;

        for (field, page) in [("offline_page", &self.offline_page), ("root_page", &self.root_page)] {
            if !page.starts_with('/') {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be root-relative".into() });
            }
            if !PRECACHE_URLS.contains(&page.as_str()) {
                tracing::warn!(field, page = %page, "fallback page is not precached; failures will return nothing");
            }
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.update_auto_update && self.update_prompt_user {
            tracing::debug!("both update_prompt_user and update_auto_update are set; prompting takes precedence");
        }

        Ok(())
    }

    fn validate_origin(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid { field: "origin".into(), reason: reason.into() };

        let parsed = url::Url::parse(&self.origin).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("must include a host"));
        }
        if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(invalid("must not include a path, query or fragment"));
        }
        Ok(())
    }
}
