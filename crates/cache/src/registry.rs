//! One cache per resource type

use std::any::{Any, TypeId};
use std::collections::HashMap;

use futures::future::{BoxFuture, FutureExt, join_all};
use tracing::{info, warn};
use twingate_core::Result;

use crate::{BatchingCache, Identifiable};

/// Type-erased view of a [`BatchingCache`] for lifecycle calls.
trait ManagedCache: Send + Sync {
    fn resource_type(&self) -> &'static str;
    fn is_enabled(&self) -> bool;
    fn start(&self) -> Result<()>;
    fn stop(&self) -> BoxFuture<'_, ()>;
    fn warm_up(&self) -> BoxFuture<'_, Result<()>>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Identifiable> ManagedCache for BatchingCache<T> {
    fn resource_type(&self) -> &'static str {
        Self::resource_type(self)
    }

    fn is_enabled(&self) -> bool {
        self.config().enabled
    }

    fn start(&self) -> Result<()> {
        Self::start(self)
    }

    fn stop(&self) -> BoxFuture<'_, ()> {
        Self::stop(self).boxed()
    }

    fn warm_up(&self) -> BoxFuture<'_, Result<()>> {
        Self::warm_up(self).boxed()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Registry of caches keyed by resource type.
///
/// # Example
///
/// ```ignore
/// let mut registry = CacheRegistry::new();
/// registry.register(BatchingCache::with_reader(config.clone(), Arc::new(GroupReader::new(client.clone()))));
/// registry.register(BatchingCache::with_reader(config, Arc::new(ConnectorReader::new(client))));
/// registry.start_all()?;
///
/// let groups = registry.get::<Group>().expect("group cache registered");
/// ```
#[derive(Default)]
pub struct CacheRegistry {
    caches: HashMap<TypeId, Box<dyn ManagedCache>>,
}

impl CacheRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the cache for `T`, replacing any previous one.
    pub fn register<T: Identifiable>(&mut self, cache: BatchingCache<T>) {
        self.caches.insert(TypeId::of::<T>(), Box::new(cache));
    }

    /// The cache for `T`, if registered.
    #[must_use]
    pub fn get<T: Identifiable>(&self) -> Option<BatchingCache<T>> {
        self.caches
            .get(&TypeId::of::<T>())
            .and_then(|cache| cache.as_any().downcast_ref::<BatchingCache<T>>())
            .cloned()
    }

    /// Whether a cache for `T` is registered.
    #[must_use]
    pub fn has<T: Identifiable>(&self) -> bool {
        self.caches.contains_key(&TypeId::of::<T>())
    }

    /// Short names of the registered resource types, sorted.
    #[must_use]
    pub fn resource_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.caches.values().map(|c| c.resource_type()).collect();
        types.sort_unstable();
        types
    }

    /// Number of registered caches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    /// Whether no cache is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Start every cache's collector.
    ///
    /// # Errors
    ///
    /// Tries every cache and returns the first error.
    pub fn start_all(&self) -> Result<()> {
        let mut first_error = None;
        for cache in self.caches.values() {
            if let Err(e) = cache.start() {
                warn!(resource_type = cache.resource_type(), error = %e, "Failed to start cache");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Stop every cache's collector.
    pub async fn stop_all(&self) {
        join_all(self.caches.values().map(|cache| cache.stop())).await;
    }

    /// Warm up every enabled cache concurrently.
    ///
    /// # Errors
    ///
    /// Waits for every warm-up and returns the first error.
    pub async fn warm_up_all(&self) -> Result<()> {
        let mut warm_ups = Vec::new();
        for cache in self.caches.values() {
            if cache.is_enabled() {
                warm_ups.push(async move { (cache.resource_type(), cache.warm_up().await) });
            } else {
                info!(resource_type = cache.resource_type(), "Cache warm-up skipped: disabled");
            }
        }

        let mut first_error = None;
        for (resource_type, result) in join_all(warm_ups).await {
            if let Err(e) = result {
                warn!(resource_type, error = %e, "Cache warm-up failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("resource_types", &self.resource_types())
            .finish()
    }
}
