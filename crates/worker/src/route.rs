//! Request routing policy.
//!
//! Maps every intercepted request to the strategy that serves it. The
//! mapping depends only on the method and the URL path, so it never touches
//! the store or the network.

use serde::{Deserialize, Serialize};
use sw_cache_core::AppConfig;
use url::Url;

/// Strategy selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    /// Not intercepted; the request goes to the network untouched.
    Ignore,
    /// Live answer preferred, cache only on network failure.
    NetworkFirst,
    /// Cached answer preferred, refreshed in the background.
    CacheFirst,
}

/// Path substrings that mark dynamic endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    network_first: Vec<String>,
}

impl RoutePolicy {
    pub fn new(network_first: Vec<String>) -> Self {
        Self { network_first }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.network_first_paths.clone())
    }

    /// Classify a request.
    ///
    /// - any method other than GET → [`Route::Ignore`]
    /// - path contains an allow-listed substring → [`Route::NetworkFirst`]
    /// - everything else → [`Route::CacheFirst`]
    pub fn classify(&self, method: &str, url: &Url) -> Route {
        if !method.eq_ignore_ascii_case("GET") {
            return Route::Ignore;
        }

        let path = url.path();
        if self.network_first.iter().any(|prefix| path.contains(prefix.as_str())) {
            Route::NetworkFirst
        } else {
            Route::CacheFirst
        }
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
