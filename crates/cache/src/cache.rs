//! The batching cache handle

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OnceCell, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use twingate_core::{CACHE_CALLER, Error, RequestContext, ResourceFilter, Result};

use crate::collector::{Collector, Request};
use crate::stats::StatsCounters;
use crate::store::ResourceStore;
use crate::{BulkReader, CacheConfig, CacheStats, Identifiable, Lookup};

/// Read-through cache of one resource type, refilled by windowed bulk reads.
///
/// Cloning is cheap and every clone shares the same store and collector.
/// The collector runs between [`start`](Self::start) and
/// [`stop`](Self::stop); dropping the last handle stops it as well.
///
/// # Example
///
/// ```ignore
/// let cache = BatchingCache::with_reader(CacheConfig::default(), Arc::new(reader));
/// cache.start()?;
///
/// let (a, b) = tokio::join!(cache.get("id-a"), cache.get("id-b"));
/// cache.stop().await;
/// ```
pub struct BatchingCache<T: Identifiable> {
    inner: Arc<Inner<T>>,
}

struct Inner<T: Identifiable> {
    resource_type: &'static str,
    config: CacheConfig,
    store: Arc<ResourceStore<T>>,
    reader: Option<Arc<dyn BulkReader<T>>>,
    stats: Arc<StatsCounters>,
    requests: Mutex<Option<mpsc::Sender<Request<T>>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
    warmed_up: OnceCell<()>,
}

impl<T: Identifiable> Drop for Inner<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl<T: Identifiable> Clone for BatchingCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Identifiable> std::fmt::Debug for BatchingCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchingCache")
            .field("resource_type", &self.inner.resource_type)
            .field("entries", &self.inner.store.len())
            .field("has_reader", &self.inner.reader.is_some())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl<T: Identifiable> BatchingCache<T> {
    /// A cache with no bulk reader.
    ///
    /// Every [`get`](Self::get) resolves [`Lookup::Skipped`] without waiting.
    /// Entries set explicitly are visible only through
    /// [`contains`](Self::contains), [`match_resources`](Self::match_resources)
    /// and [`len`](Self::len).
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self::build(config, None)
    }

    /// A cache that refills itself through `reader`.
    #[must_use]
    pub fn with_reader(config: CacheConfig, reader: Arc<dyn BulkReader<T>>) -> Self {
        Self::build(config, Some(reader))
    }

    fn build(config: CacheConfig, reader: Option<Arc<dyn BulkReader<T>>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                resource_type: short_type_name::<T>(),
                config,
                store: Arc::default(),
                reader,
                stats: Arc::default(),
                requests: Mutex::new(None),
                task: Mutex::new(None),
                shutdown: CancellationToken::new(),
                warmed_up: OnceCell::new(),
            }),
        }
    }

    /// Short name of the cached resource type, used in logs.
    #[must_use]
    pub fn resource_type(&self) -> &'static str {
        self.inner.resource_type
    }

    /// The configuration the cache was built with.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Spawn the background collector on the current tokio runtime.
    ///
    /// Does nothing when there is no reader, when the cache is disabled, when
    /// it is already running, or after [`stop`](Self::stop).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration is invalid or no
    /// tokio runtime is available.
    pub fn start(&self) -> Result<()> {
        let inner = &self.inner;
        inner.config.validate()?;

        let Some(reader) = inner.reader.clone() else {
            debug!(
                resource_type = inner.resource_type,
                "No bulk reader configured, cache collector not started"
            );
            return Ok(());
        };
        if !inner.config.enabled {
            debug!(
                resource_type = inner.resource_type,
                "Cache disabled, collector not started"
            );
            return Ok(());
        }
        if inner.shutdown.is_cancelled() {
            warn!(
                resource_type = inner.resource_type,
                "Cache was stopped and cannot be restarted"
            );
            return Ok(());
        }

        let mut task = inner.task.lock();
        if task.is_some() {
            return Ok(());
        }
        // stop() may have cancelled since the check above.
        if inner.shutdown.is_cancelled() {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::configuration(format!("cache collector needs a tokio runtime: {e}"))
        })?;

        let (tx, rx) = mpsc::channel(inner.config.queue_capacity);
        let collector = Collector {
            resource_type: inner.resource_type,
            requests: rx,
            store: Arc::clone(&inner.store),
            reader,
            stats: Arc::clone(&inner.stats),
            collect_window: inner.config.collect_window(),
            min_batch_size: inner.config.min_batch_size,
            shutdown: inner.shutdown.clone(),
        };
        *task = Some(runtime.spawn(collector.run()));
        *inner.requests.lock() = Some(tx);

        info!(
            resource_type = inner.resource_type,
            collect_window_ms = inner.config.collect_window_ms,
            min_batch_size = inner.config.min_batch_size,
            queue_capacity = inner.config.queue_capacity,
            "Cache collector started"
        );
        Ok(())
    }

    /// Stop the collector and wait for it to finish.
    ///
    /// Waiters of the open window resolve [`Lookup::Skipped`], as do all
    /// later misses. Stored entries stay readable.
    pub async fn stop(&self) {
        self.inner.shutdown.cancel();
        let task = {
            let mut task = self.inner.task.lock();
            self.inner.requests.lock().take();
            task.take()
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(
                    resource_type = self.inner.resource_type,
                    error = %e,
                    "Cache collector ended abnormally"
                );
            }
            info!(
                resource_type = self.inner.resource_type,
                "Cache collector stopped"
            );
        }
    }

    /// Whether the collector is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Look up a resource by id.
    ///
    /// Stored resources are returned at once. A miss joins the current
    /// collection window and resolves when that window drains.
    pub async fn get(&self, id: &str) -> Lookup<T> {
        let inner = &self.inner;
        if inner.reader.is_none() {
            return Lookup::Skipped;
        }

        if let Some(resource) = inner.store.get(id) {
            inner.stats.hit();
            return Lookup::Found(resource);
        }
        inner.stats.miss();

        let sender = inner.requests.lock().clone();
        let Some(sender) = sender else {
            debug!(
                resource_type = inner.resource_type,
                id, "Cache miss while collector is not running"
            );
            return Lookup::Skipped;
        };

        let (reply, response) = oneshot::channel();
        let request = Request {
            id: id.to_string(),
            reply,
        };
        if sender.send(request).await.is_err() {
            return Lookup::Skipped;
        }
        response.await.unwrap_or(Lookup::Skipped)
    }

    /// Whether `id` is stored, without counting a lookup.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.inner.store.contains(id)
    }

    /// Insert or replace one resource.
    pub fn set_resource(&self, resource: T) {
        self.inner.store.insert(resource);
    }

    /// Insert or replace several resources.
    pub fn set_resources(&self, resources: impl IntoIterator<Item = T>) {
        let written = self.inner.store.insert_many(resources);
        debug!(resource_type = self.inner.resource_type, written, "Resources stored");
    }

    /// Remove one resource so the next lookup of `id` misses.
    ///
    /// Returns whether an entry was removed.
    pub fn invalidate_resource(&self, id: &str) -> bool {
        self.inner.store.remove(id).is_some()
    }

    /// Remove every stored resource.
    pub fn clear(&self) {
        self.inner.store.clear();
    }

    /// Copies of the stored resources that match `filter`.
    #[must_use]
    pub fn match_resources(&self, filter: &ResourceFilter) -> Vec<T> {
        self.inner.store.matching(filter)
    }

    /// Number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load the store once from the reader.
    ///
    /// Uses [`BulkReader::read_filtered`] when the configuration carries a
    /// filter, [`BulkReader::read_all`] otherwise. A successful warm-up is not
    /// repeated; a failed one may be retried. Disabled caches and caches
    /// without a reader return `Ok` without reading.
    ///
    /// # Errors
    ///
    /// Returns the reader's error.
    pub async fn warm_up(&self) -> Result<()> {
        let inner = &self.inner;
        let Some(reader) = inner.reader.as_ref() else {
            return Ok(());
        };
        if !inner.config.enabled {
            info!(resource_type = inner.resource_type, "Cache warm-up skipped: disabled");
            return Ok(());
        }

        inner
            .warmed_up
            .get_or_try_init(|| async {
                let ctx = RequestContext::new()
                    .with_operation(format!("read{}", inner.resource_type))
                    .with_caller(CACHE_CALLER);
                info!(
                    resource_type = inner.resource_type,
                    filtered = inner.config.filter.is_some(),
                    "Cache warm-up started"
                );

                let read = match &inner.config.filter {
                    Some(filter) => reader.read_filtered(&ctx, filter).await,
                    None => reader.read_all(&ctx).await,
                };
                let resources = read.inspect_err(|e| {
                    warn!(
                        resource_type = inner.resource_type,
                        error = %e,
                        "Cache warm-up failed"
                    );
                })?;

                let stored = inner.store.insert_many(resources);
                info!(
                    resource_type = inner.resource_type,
                    stored, "Cache warm-up finished"
                );
                Ok::<(), Error>(())
            })
            .await?;
        Ok(())
    }

    /// Whether [`warm_up`](Self::warm_up) has completed successfully.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.warmed_up.initialized()
    }

    /// Snapshot of the lookup and refill counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot()
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
