//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
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

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_prefix` or `cache_version` is empty
    /// - `origin` is not an http(s) URL
    /// - a manifest entry cannot be resolved against the origin
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `refresh_interval_secs` is below one minute
    /// - `sync_tag`, `pending_queue` or `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.cache_version.is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }

        match self.origin.scheme() {
            "http" | "https" => {}
            other => return Err(invalid("origin", &format!("unsupported scheme: {other}"))),
        }

        if self.manifest.is_empty() {
            tracing::warn!("manifest is empty; install will create an empty generation");
        }
        self.manifest_urls()?;

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.refresh_interval_secs < 60 {
            return Err(invalid("refresh_interval_secs", "must be at least 60 seconds"));
        }
        if self.refresh_check_secs == 0 {
            return Err(invalid("refresh_check_secs", "must be greater than 0"));
        }

        if self.sync_tag.is_empty() {
            return Err(invalid("sync_tag", "must not be empty"));
        }
        if self.pending_queue.is_empty() {
            return Err(invalid("pending_queue", "must not be empty"));
        }
        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.network_first_paths.iter().any(String::is_empty) {
            return Err(invalid("network_first_paths", "entries must not be empty"));
        }

        Ok(())
    }
}
