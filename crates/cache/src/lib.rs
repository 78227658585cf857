//! Read-through cache for Twingate resources with batched background refills.
//!
//! A [`BatchingCache`] answers lookups by id from an in-memory store. Misses
//! are handed to a background collector which gathers the ids requested during
//! a short window and, once enough distinct ids are waiting, refills the store
//! with a single bulk read through the injected [`BulkReader`]. Every waiter
//! learns the outcome of its own window through a [`Lookup`].
//!
//! A [`CacheRegistry`] holds one cache per resource type and drives their
//! lifecycle together.
//!
//! ```ignore
//! use std::sync::Arc;
//! use twingate_cache::{BatchingCache, CacheConfig, Lookup};
//!
//! let cache = BatchingCache::with_reader(CacheConfig::from_env(), Arc::new(GroupReader::new(client)));
//! cache.start()?;
//!
//! match cache.get("R3JvdXA6MQ==").await {
//!     Lookup::Found(group) => use_group(group),
//!     _ => read_group_directly().await?,
//! }
//! ```

mod cache;
mod collector;
mod config;
mod lookup;
mod reader;
mod registry;
mod stats;
mod store;

pub use cache::BatchingCache;
pub use config::{
    CacheConfig, ENV_COLLECT_WINDOW_MS, ENV_MIN_BATCH_SIZE, ENV_QUEUE_CAPACITY,
};
pub use lookup::Lookup;
pub use reader::{BulkReader, Identifiable};
pub use registry::CacheRegistry;
pub use stats::CacheStats;
