//! Background collector that turns windows of misses into bulk reads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use twingate_core::{CACHE_CALLER, RequestContext};

use crate::stats::StatsCounters;
use crate::store::ResourceStore;
use crate::{BulkReader, Identifiable, Lookup};

/// A miss waiting for its window to drain.
pub(crate) struct Request<T> {
    pub(crate) id: String,
    pub(crate) reply: oneshot::Sender<Lookup<T>>,
}

type Waiters<T> = Vec<oneshot::Sender<Lookup<T>>>;

/// State machine: idle until the first miss arrives, then collecting until
/// the window deadline, then draining with at most one bulk read in flight.
/// Misses that arrive during a drain wait in the channel for the next window.
pub(crate) struct Collector<T: Identifiable> {
    pub(crate) resource_type: &'static str,
    pub(crate) requests: mpsc::Receiver<Request<T>>,
    pub(crate) store: Arc<ResourceStore<T>>,
    pub(crate) reader: Arc<dyn BulkReader<T>>,
    pub(crate) stats: Arc<StatsCounters>,
    pub(crate) collect_window: Duration,
    pub(crate) min_batch_size: usize,
    pub(crate) shutdown: CancellationToken,
}

impl<T: Identifiable> Collector<T> {
    pub(crate) async fn run(mut self) {
        let mut pending: HashMap<String, Waiters<T>> = HashMap::new();
        let mut deadline: Option<Instant> = None;

        debug!(resource_type = self.resource_type, "Cache collector running");

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    let window = std::mem::take(&mut pending);
                    self.drain(window).await;
                }

                request = self.requests.recv() => {
                    let Some(request) = request else { break };
                    self.accept(request, &mut pending, &mut deadline);
                }
            }
        }

        self.requests.close();
        let mut abandoned = pending.values().map(Vec::len).sum::<usize>();
        for waiter in pending.into_values().flatten() {
            let _ = waiter.send(Lookup::Skipped);
        }
        while let Ok(request) = self.requests.try_recv() {
            abandoned += 1;
            let _ = request.reply.send(Lookup::Skipped);
        }

        debug!(
            resource_type = self.resource_type,
            abandoned, "Cache collector stopped"
        );
    }

    fn accept(
        &self,
        request: Request<T>,
        pending: &mut HashMap<String, Waiters<T>>,
        deadline: &mut Option<Instant>,
    ) {
        // A drain may have stored the resource after the caller missed.
        if let Some(resource) = self.store.get(&request.id) {
            let _ = request.reply.send(Lookup::Found(resource));
            return;
        }

        if deadline.is_none() {
            *deadline = Some(Instant::now() + self.collect_window);
            debug!(
                resource_type = self.resource_type,
                window_ms = self.collect_window.as_millis(),
                "Collection window opened"
            );
        }
        pending.entry(request.id).or_default().push(request.reply);
    }

    async fn drain(&self, window: HashMap<String, Waiters<T>>) {
        let distinct = window.len();
        if distinct == 0 {
            return;
        }

        if distinct < self.min_batch_size {
            self.stats.batch_skipped();
            debug!(
                resource_type = self.resource_type,
                pending = distinct,
                min_batch_size = self.min_batch_size,
                "Window below minimum batch size, skipping bulk read"
            );
            resolve_all(window, &Lookup::Skipped);
            return;
        }

        let ctx = RequestContext::new()
            .with_operation(format!("read{}", self.resource_type))
            .with_caller(CACHE_CALLER);

        let outcome = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => None,
            result = self.reader.read_all(&ctx) => Some(result),
        };

        match outcome {
            None => resolve_all(window, &Lookup::Skipped),
            Some(Ok(resources)) => {
                let stored = self.store.insert_many(resources);
                self.stats.batch_fetched();
                info!(
                    resource_type = self.resource_type,
                    requested = distinct,
                    stored,
                    correlation_id = %ctx.correlation_id(),
                    "Cache refilled from bulk read"
                );
                for (id, waiters) in window {
                    let lookup = Lookup::from(self.store.get(&id));
                    resolve(waiters, &lookup);
                }
            }
            Some(Err(e)) => {
                self.stats.fetch_failed();
                warn!(
                    resource_type = self.resource_type,
                    requested = distinct,
                    correlation_id = %ctx.correlation_id(),
                    error = %e,
                    "Bulk read for cache failed"
                );
                resolve_all(window, &Lookup::Failed(Arc::new(e)));
            }
        }
    }
}

fn resolve<T: Clone>(waiters: Waiters<T>, lookup: &Lookup<T>) {
    for waiter in waiters {
        // The caller may have given up waiting.
        let _ = waiter.send(lookup.clone());
    }
}

fn resolve_all<T: Clone>(window: HashMap<String, Waiters<T>>, lookup: &Lookup<T>) {
    for waiters in window.into_values() {
        resolve(waiters, lookup);
    }
}
