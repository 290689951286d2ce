//! Client configuration.
//!
//! Plain structs with code defaults, overlaid by environment variables in
//! [`ClientConfig::from_env`] and by CLI flags in the `directory` binary.

use std::time::Duration;

use directory_core::SortDirection;
use tracing::warn;

/// Environment variable holding the backend base URL.
pub const ENV_BASE_URL: &str = "DIRECTORY_API_BASE_URL";
/// Environment variable holding the list page size.
pub const ENV_PAGE_SIZE: &str = "DIRECTORY_PAGE_SIZE";
/// Environment variable holding the per-request timeout in seconds.
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "DIRECTORY_REQUEST_TIMEOUT_SECS";

/// Top-level client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, without the `/api` prefix.
    pub base_url: String,
    /// Page size requested by the record list.
    pub page_size: u32,
    /// Sort field requested by the record list.
    pub default_sort: String,
    /// Sort direction requested by the record list.
    pub default_direction: SortDirection,
    /// Maximum time a single HTTP attempt may take.
    pub request_timeout: Duration,
    /// Number of query keys whose pages are kept in the list cache.
    pub cache_capacity: usize,
    /// Logging setup.
    pub log: LogConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            page_size: 10,
            default_sort: "createdAt".to_string(),
            default_direction: SortDirection::Desc,
            request_timeout: Duration::from_secs(30),
            cache_capacity: 64,
            log: LogConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with the `DIRECTORY_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup`. Malformed numbers are
    /// ignored with a warning.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = base_url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            match raw.trim().parse::<u32>() {
                Ok(size) if size > 0 => self.page_size = size,
                _ => warn!(key = ENV_PAGE_SIZE, value = %raw, "ignoring invalid page size"),
            }
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout = Duration::from_secs(secs),
                _ => warn!(key = ENV_REQUEST_TIMEOUT_SECS, value = %raw, "ignoring invalid timeout"),
            }
        }
        self
    }
}

/// Logging configuration consumed by [`crate::observability::init_tracing`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            json: false,
        }
    }
}
