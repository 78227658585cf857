//! Integration tests for windowed batching, coalescing and lifecycle

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use twingate_cache::{BatchingCache, BulkReader, CacheConfig, Identifiable, Lookup};
use twingate_core::{CACHE_CALLER, Error, FilterBy, RequestContext, ResourceFilter, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Group {
    id: String,
    name: String,
}

impl Group {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format!("group-{id}"),
        }
    }
}

impl Identifiable for Group {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Bulk reader over a fixed set of groups that counts its reads.
#[derive(Default)]
struct StubReader {
    groups: Vec<Group>,
    reads: AtomicUsize,
    fail: AtomicBool,
    callers: Mutex<Vec<Option<String>>>,
    delay: Duration,
}

impl StubReader {
    fn with_ids(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            groups: ids.iter().map(|id| Group::new(id)).collect(),
            ..Self::default()
        })
    }

    fn slow(ids: &[&str], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            groups: ids.iter().map(|id| Group::new(id)).collect(),
            delay,
            ..Self::default()
        })
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BulkReader<Group> for StubReader {
    async fn read_all(&self, ctx: &RequestContext) -> Result<Vec<Group>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.callers
            .lock()
            .unwrap()
            .push(ctx.caller().map(str::to_string));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::http("/api/graphql/", 503, b"unavailable"));
        }
        Ok(self.groups.clone())
    }
}

fn ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("g{i}")).collect()
}

fn config(window_ms: u64, min_batch_size: usize) -> CacheConfig {
    CacheConfig::default()
        .with_collect_window(Duration::from_millis(window_ms))
        .with_min_batch_size(min_batch_size)
}

fn started(config: CacheConfig, reader: Arc<StubReader>) -> BatchingCache<Group> {
    let cache = BatchingCache::with_reader(config, reader);
    cache.start().unwrap();
    cache
}

async fn get_all(cache: &BatchingCache<Group>, ids: &[String]) -> Vec<Lookup<Group>> {
    join_all(ids.iter().map(|id| cache.get(id))).await
}

#[tokio::test]
async fn test_window_below_minimum_skips_bulk_read() {
    let wanted = ids(9);
    let names: Vec<&str> = wanted.iter().map(String::as_str).collect();
    let reader = StubReader::with_ids(&names);
    let cache = started(config(30, 10), reader.clone());

    let results = get_all(&cache, &wanted).await;

    assert!(results.iter().all(|r| matches!(r, Lookup::Skipped)));
    assert_eq!(reader.reads(), 0);
    let stats = cache.stats();
    assert_eq!(stats.misses, 9);
    assert_eq!(stats.batches_skipped, 1);
    assert_eq!(stats.batches_fetched, 0);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_window_at_minimum_fetches_once() {
    let wanted = ids(10);
    let names: Vec<&str> = wanted.iter().map(String::as_str).collect();
    let reader = StubReader::with_ids(&names);
    let cache = started(config(30, 10), reader.clone());

    let results = get_all(&cache, &wanted).await;

    assert_eq!(reader.reads(), 1);
    for (id, result) in wanted.iter().zip(&results) {
        assert_eq!(result.as_found().map(Identifiable::id), Some(id.as_str()));
    }
    assert_eq!(cache.len(), 10);
    assert_eq!(cache.stats().batches_fetched, 1);
    assert_eq!(
        *reader.callers.lock().unwrap(),
        vec![Some(CACHE_CALLER.to_string())]
    );

    // Refilled entries are now served from the store.
    assert!(cache.get("g3").await.is_found());
    assert_eq!(reader.reads(), 1);
    assert_eq!(cache.stats().hits, 1);
}

#[tokio::test]
async fn test_stored_resource_skips_the_window() {
    let reader = StubReader::with_ids(&[]);
    let cache = started(config(10_000, 1), reader.clone());
    cache.set_resources([Group::new("a"), Group::new("b")]);

    let found = tokio::time::timeout(Duration::from_millis(200), cache.get("a"))
        .await
        .expect("stored resource should not wait for the window");

    assert_eq!(found.into_option(), Some(Group::new("a")));
    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 0);
    assert_eq!(reader.reads(), 0);
}

#[tokio::test]
async fn test_invalidate_removes_only_that_resource() {
    let reader = StubReader::with_ids(&["a", "b", "c"]);
    let cache = started(config(20, 1), reader.clone());
    cache.set_resources([Group::new("a"), Group::new("b"), Group::new("c")]);

    assert!(cache.invalidate_resource("b"));
    assert!(!cache.invalidate_resource("b"));
    assert!(!cache.contains("b"));

    for id in ["a", "c"] {
        let hit = tokio::time::timeout(Duration::from_millis(200), cache.get(id))
            .await
            .unwrap();
        assert!(hit.is_found());
    }
    assert_eq!(cache.stats().misses, 0);

    assert!(cache.get("b").await.is_found());
    assert_eq!(cache.stats().misses, 1);
    assert_eq!(reader.reads(), 1);
}

#[tokio::test]
async fn test_id_missing_from_bulk_read_is_absent() {
    let reader = StubReader::with_ids(&["a"]);
    let cache = started(config(20, 1), reader.clone());

    assert!(matches!(cache.get("zzz").await, Lookup::Absent));
    assert_eq!(reader.reads(), 1);
    assert!(cache.contains("a"));
}

#[tokio::test]
async fn test_failed_bulk_read_reaches_every_waiter() {
    let reader = StubReader::with_ids(&["a", "b"]);
    reader.fail.store(true, Ordering::SeqCst);
    let cache = started(config(20, 2), reader.clone());

    let results = get_all(&cache, &["a".to_string(), "b".to_string()]).await;

    for result in &results {
        let err = result.error().expect("bulk read failure is reported");
        assert!(matches!(err, Error::Http { status: 503, .. }));
    }
    assert!(cache.is_empty());
    assert_eq!(cache.stats().fetch_failures, 1);

    // The next window tries again.
    reader.fail.store(false, Ordering::SeqCst);
    let results = get_all(&cache, &["a".to_string(), "b".to_string()]).await;
    assert!(results.iter().all(Lookup::is_found));
    assert_eq!(reader.reads(), 2);
}

#[tokio::test]
async fn test_duplicate_ids_coalesce() {
    let reader = StubReader::with_ids(&["a", "b"]);
    let cache = started(config(20, 2), reader.clone());

    let wanted: Vec<String> = ["a", "a", "b", "a"].iter().map(|s| (*s).to_string()).collect();
    let results = get_all(&cache, &wanted).await;

    assert!(results.iter().all(Lookup::is_found));
    assert_eq!(reader.reads(), 1);
    assert_eq!(cache.stats().misses, 4);
}

#[tokio::test]
async fn test_duplicates_count_once_towards_minimum() {
    let reader = StubReader::with_ids(&["a"]);
    let cache = started(config(20, 2), reader.clone());

    let wanted = vec!["a".to_string(); 5];
    let results = get_all(&cache, &wanted).await;

    assert!(results.iter().all(|r| matches!(r, Lookup::Skipped)));
    assert_eq!(reader.reads(), 0);
}

#[tokio::test]
async fn test_lookups_before_start_are_skipped() {
    let reader = StubReader::with_ids(&["a"]);
    let cache = BatchingCache::<Group>::with_reader(config(20, 1), reader.clone());

    assert!(matches!(cache.get("a").await, Lookup::Skipped));
    assert!(!cache.is_running());
    assert_eq!(reader.reads(), 0);
}

#[tokio::test]
async fn test_disabled_cache_does_not_start() {
    let reader = StubReader::with_ids(&["a"]);
    let cache = started(config(20, 1).with_enabled(false), reader.clone());
    cache.set_resource(Group::new("b"));

    assert!(!cache.is_running());
    assert!(matches!(cache.get("a").await, Lookup::Skipped));
    assert!(cache.get("b").await.is_found());
    cache.warm_up().await.unwrap();
    assert_eq!(reader.reads(), 0);
}

#[tokio::test]
async fn test_stop_releases_pending_waiters() {
    let reader = StubReader::with_ids(&["a"]);
    let cache = started(config(10_000, 1), reader.clone());
    assert!(cache.is_running());

    let waiter = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get("a").await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    cache.stop().await;

    let result = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Lookup::Skipped));
    assert!(!cache.is_running());
    assert!(matches!(cache.get("a").await, Lookup::Skipped));
    assert_eq!(reader.reads(), 0);

    // Stopped caches stay stopped.
    cache.start().unwrap();
    assert!(!cache.is_running());
}

#[tokio::test]
async fn test_warm_up_loads_once() {
    let reader = StubReader::with_ids(&["a", "b", "c"]);
    let cache = BatchingCache::<Group>::with_reader(config(20, 1), reader.clone());
    assert!(!cache.is_ready());

    cache.warm_up().await.unwrap();
    cache.warm_up().await.unwrap();

    assert!(cache.is_ready());
    assert_eq!(cache.len(), 3);
    assert_eq!(reader.reads(), 1);
}

#[tokio::test]
async fn test_warm_up_with_filter() {
    let reader = StubReader::with_ids(&["a1", "a2", "b1"]);
    let filter = ResourceFilter::by_name("group-a").with_filter_by(FilterBy::Prefix);
    let cache = BatchingCache::<Group>::with_reader(config(20, 1).with_filter(filter), reader.clone());

    cache.warm_up().await.unwrap();

    assert_eq!(cache.len(), 2);
    assert!(!cache.contains("b1"));
}

#[tokio::test]
async fn test_failed_warm_up_can_be_retried() {
    let reader = StubReader::with_ids(&["a"]);
    reader.fail.store(true, Ordering::SeqCst);
    let cache = BatchingCache::<Group>::with_reader(config(20, 1), reader.clone());

    assert!(cache.warm_up().await.is_err());
    assert!(!cache.is_ready());

    reader.fail.store(false, Ordering::SeqCst);
    cache.warm_up().await.unwrap();
    assert!(cache.is_ready());
    assert_eq!(reader.reads(), 2);
}

#[tokio::test]
async fn test_match_resources_and_clear() {
    let cache = BatchingCache::<Group>::with_reader(config(20, 1), StubReader::with_ids(&[]));
    cache.set_resources(["x1", "x2", "y1"].map(Group::new));

    let mut matched: Vec<String> = cache
        .match_resources(&ResourceFilter::by_name("x").with_filter_by(FilterBy::Contains))
        .into_iter()
        .map(|g| g.id)
        .collect();
    matched.sort();
    assert_eq!(matched, vec!["x1", "x2"]);

    cache.clear();
    assert!(cache.is_empty());
    assert!(cache.match_resources(&ResourceFilter::default()).is_empty());
}

#[tokio::test]
async fn test_dropping_last_handle_stops_collector() {
    let reader = StubReader::with_ids(&["a"]);
    let cache = started(config(20, 1), reader.clone());
    assert_eq!(Arc::strong_count(&reader), 3);

    drop(cache);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(Arc::strong_count(&reader), 1);
}

#[tokio::test]
async fn test_small_queue_applies_backpressure() {
    let wanted = ids(50);
    let names: Vec<&str> = wanted.iter().map(String::as_str).collect();
    let reader = StubReader::with_ids(&names);
    let cache = started(config(50, 10).with_queue_capacity(1), reader.clone());

    let results = get_all(&cache, &wanted).await;

    assert_eq!(results.iter().filter(|r| r.is_found()).count(), 50);
    assert_eq!(reader.reads(), 1);
}

#[tokio::test]
async fn test_misses_during_drain_resolve_from_store() {
    let reader = StubReader::slow(&["a", "b", "c"], Duration::from_millis(200));
    let cache = started(config(20, 1), reader.clone());

    let first = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get("a").await }
    });
    // Let the first window drain and its bulk read start.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(reader.reads(), 1);

    let late = get_all(&cache, &["a".to_string(), "b".to_string(), "c".to_string()]).await;

    assert!(first.await.unwrap().is_found());
    assert!(late.iter().all(Lookup::is_found));
    assert_eq!(reader.reads(), 1);
}
