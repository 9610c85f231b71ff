//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SW_CACHE_*)
//! 2. TOML config file (if SW_CACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The resulting [`AppConfig`] is constructed once at startup and handed to
//! the worker explicitly; nothing in the workspace reads it from a global.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SW_CACHE_*)
/// 2. TOML config file (if SW_CACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via SW_CACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Prefix shared by every cache generation name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version string of the current generation (e.g. "v2").
    ///
    /// Set via SW_CACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin of the controlled app; relative manifest entries resolve against it.
    #[serde(default = "default_origin")]
    pub origin: Url,

    /// Assets fetched and stored at install time.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Path substrings routed network-first.
    #[serde(default = "default_network_first_paths")]
    pub network_first_paths: Vec<String>,

    /// Minimum time between two periodic refreshes, in seconds.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// How often the scheduler checks whether a refresh is due, in seconds.
    #[serde(default = "default_refresh_check_secs")]
    pub refresh_check_secs: u64,

    /// Sync tag that triggers replay of the pending queue.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Name of the pending mutation queue.
    #[serde(default = "default_pending_queue")]
    pub pending_queue: String,

    /// User-Agent string for network requests.
    ///
    /// Set via SW_CACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SW_CACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Icon attached to push notifications.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    /// Badge attached to push notifications.
    #[serde(default = "default_notification_icon")]
    pub notification_badge: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sw-cache.sqlite")
}

fn default_cache_prefix() -> String {
    "study-support".into()
}

fn default_cache_version() -> String {
    "v2".into()
}

fn default_origin() -> Url {
    Url::parse("http://localhost:5000/").expect("static origin is a valid URL")
}

fn default_manifest() -> Vec<String> {
    [
        "/",
        "/static/main.js",
        "/static/icon-192.png",
        "/static/icon-512.png",
        "https://polyfill.io/v3/polyfill.min.js?features=es6",
        "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_network_first_paths() -> Vec<String> {
    ["/upload", "/task/", "/history", "/api/", "/health", "/monitoring"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_refresh_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_refresh_check_secs() -> u64 {
    15 * 60
}

fn default_sync_tag() -> String {
    "sync-uploads".into()
}

fn default_pending_queue() -> String {
    "pending-uploads".into()
}

fn default_user_agent() -> String {
    "sw-cache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_notification_icon() -> String {
    "/static/icon-192.png".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            manifest: default_manifest(),
            network_first_paths: default_network_first_paths(),
            refresh_interval_secs: default_refresh_interval_secs(),
            refresh_check_secs: default_refresh_check_secs(),
            sync_tag: default_sync_tag(),
            pending_queue: default_pending_queue(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            notification_icon: default_notification_icon(),
            notification_badge: default_notification_icon(),
        }
    }
}

impl AppConfig {
    /// Name of the generation this worker version owns, e.g. `study-support-v2`.
    pub fn generation_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }

    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn refresh_check(&self) -> Duration {
        Duration::from_secs(self.refresh_check_secs)
    }

    /// Manifest entries resolved against the origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if an entry cannot be joined to the origin.
    pub fn manifest_urls(&self) -> Result<Vec<Url>, ConfigError> {
        self.manifest
            .iter()
            .map(|entry| {
                self.origin.join(entry).map_err(|e| ConfigError::Invalid {
                    field: "manifest".into(),
                    reason: format!("{entry}: {e}"),
                })
            })
            .collect()
    }

    /// Resolve a path or absolute URL against the origin.
    pub fn resolve(&self, path: &str) -> Option<Url> {
        self.origin.join(path).ok()
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SW_CACHE_`
    /// 2. TOML file from `SW_CACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SW_CACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SW_CACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
