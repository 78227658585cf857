//! Batching cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use twingate_core::config::env_or;
use twingate_core::{Error, ResourceFilter, Result};

/// Environment variable overriding [`CacheConfig::collect_window_ms`].
pub const ENV_COLLECT_WINDOW_MS: &str = "TWINGATE_CACHE_COLLECT_WINDOW_MS";

/// Environment variable overriding [`CacheConfig::min_batch_size`].
pub const ENV_MIN_BATCH_SIZE: &str = "TWINGATE_CACHE_MIN_BATCH_SIZE";

/// Environment variable overriding [`CacheConfig::queue_capacity`].
pub const ENV_QUEUE_CAPACITY: &str = "TWINGATE_CACHE_QUEUE_CAPACITY";

const DEFAULT_COLLECT_WINDOW_MS: u64 = 70;
const DEFAULT_MIN_BATCH_SIZE: usize = 10;
const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Settings of one [`BatchingCache`](crate::BatchingCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Disabled caches serve entries that were set explicitly but never
    /// fetch in the background or warm up.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How long the collector gathers misses before draining them.
    #[serde(default = "default_collect_window_ms")]
    pub collect_window_ms: u64,

    /// Distinct ids a window must hold before a bulk read is issued.
    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: usize,

    /// Misses that may queue behind the collector before `get` waits for room.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Restricts warm-up to matching resources.
    #[serde(default)]
    pub filter: Option<ResourceFilter>,
}

fn default_enabled() -> bool {
    true
}

fn default_collect_window_ms() -> u64 {
    DEFAULT_COLLECT_WINDOW_MS
}

fn default_min_batch_size() -> usize {
    DEFAULT_MIN_BATCH_SIZE
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            collect_window_ms: default_collect_window_ms(),
            min_batch_size: default_min_batch_size(),
            queue_capacity: default_queue_capacity(),
            filter: None,
        }
    }
}

impl CacheConfig {
    /// Defaults overridden by the `TWINGATE_CACHE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            collect_window_ms: env_or(ENV_COLLECT_WINDOW_MS, DEFAULT_COLLECT_WINDOW_MS),
            min_batch_size: env_or(ENV_MIN_BATCH_SIZE, DEFAULT_MIN_BATCH_SIZE),
            queue_capacity: env_or(ENV_QUEUE_CAPACITY, DEFAULT_QUEUE_CAPACITY),
            ..Self::default()
        }
    }

    /// A configuration with background work turned off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Enable or disable the cache.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the collection window.
    #[must_use]
    pub fn with_collect_window(mut self, window: Duration) -> Self {
        self.collect_window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the minimum batch size.
    #[must_use]
    pub fn with_min_batch_size(mut self, min_batch_size: usize) -> Self {
        self.min_batch_size = min_batch_size;
        self
    }

    /// Set the request queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Restrict warm-up to resources matching `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: ResourceFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// The collection window as a [`Duration`].
    #[must_use]
    pub fn collect_window(&self) -> Duration {
        Duration::from_millis(self.collect_window_ms)
    }

    /// Check the configuration before a collector is started with it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a zero window, batch size or queue capacity.
    pub fn validate(&self) -> Result<()> {
        if self.collect_window_ms == 0 {
            return Err(Error::configuration(
                "collect_window_ms must be greater than zero",
            ));
        }
        if self.min_batch_size == 0 {
            return Err(Error::configuration(
                "min_batch_size must be at least 1",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(Error::configuration(
                "queue_capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}
