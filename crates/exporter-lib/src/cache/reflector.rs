//! Reflector loop: list, watch, relist

use super::{CacheEvent, CacheObject, ListWatch, WatchCache};
use crate::error::CacheError;
use crate::health::HealthRegistry;
use crate::observability::ExporterMetrics;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Retry timing for failed list/watch attempts
#[derive(Debug, Clone)]
pub struct ReflectorConfig {
    /// Delay before the first relist after a failure
    pub initial_backoff: Duration,
    /// Upper bound on the relist delay
    pub max_backoff: Duration,
}

impl Default for ReflectorConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// Smallest delay between relist attempts
const MIN_BACKOFF: Duration = Duration::from_millis(1);

/// Exponential backoff, doubling up to a cap
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// `initial` is floored at 1ms and `max` at `initial`
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.max(MIN_BACKOFF);
        Self {
            initial,
            max: max.max(initial),
            current: initial,
        }
    }

    /// Delay to wait now; advances the next one
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Keeps one [`WatchCache`] in sync with its [`ListWatch`] source
pub struct Reflector<K, S> {
    cache: Arc<WatchCache<K>>,
    source: S,
    config: ReflectorConfig,
    health: HealthRegistry,
    metrics: ExporterMetrics,
}

impl<K, S> Reflector<K, S>
where
    K: CacheObject,
    S: ListWatch<K>,
{
    pub fn new(
        cache: Arc<WatchCache<K>>,
        source: S,
        config: ReflectorConfig,
        health: HealthRegistry,
        metrics: ExporterMetrics,
    ) -> Self {
        Self {
            cache,
            source,
            config,
            health,
            metrics,
        }
    }

    /// Run until a shutdown signal arrives.
    ///
    /// A watch session that ends cleanly (server timeout) is followed by an
    /// immediate relist. A failed session is followed by a relist after an
    /// exponentially growing delay.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let kind = self.cache.kind();
        info!(kind = %kind, "Starting reflector");

        let mut backoff = Backoff::new(self.config.initial_backoff, self.config.max_backoff);

        loop {
            let outcome = tokio::select! {
                outcome = self.list_and_watch() => outcome,
                _ = shutdown.recv() => break,
            };

            match outcome {
                Ok(()) => {
                    backoff.reset();
                    info!(kind = %kind, "Watch closed, resyncing");
                }
                Err(e) => {
                    self.report_failure(&e).await;
                    let delay = backoff.next_delay();
                    warn!(
                        kind = %kind,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "List/watch failed, relisting after backoff"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.recv() => break,
                    }
                }
            }
        }

        info!(kind = %kind, "Reflector stopped");
    }

    /// One full cycle: list into the cache, then apply watch events until
    /// the stream ends.
    async fn list_and_watch(&self) -> Result<(), CacheError> {
        let kind = self.cache.kind();

        let listing = self.source.list().await.map_err(|e| {
            self.metrics.inc_list_error(kind);
            e
        })?;
        let count = listing.items.len();
        self.cache.replace(listing.items);
        self.metrics.inc_relist(kind);
        self.metrics.set_cache_objects(kind, count);
        self.health.set_healthy(kind.component()).await;
        info!(
            kind = %kind,
            objects = count,
            resource_version = %listing.resource_version,
            "List succeeded"
        );

        let mut events = self.source.watch(&listing.resource_version).await?;
        debug!(kind = %kind, "Watcher connected, receiving events");

        while let Some(event) = events.next().await {
            let event = event?;
            self.metrics.inc_watch_event(kind, event.type_name());
            if let CacheEvent::Bookmark(rv) = &event {
                debug!(kind = %kind, resource_version = %rv, "Bookmark");
                continue;
            }
            if self.cache.apply(event) {
                self.metrics.set_cache_objects(kind, self.cache.len());
            }
        }

        Ok(())
    }

    async fn report_failure(&self, error: &CacheError) {
        let component = self.cache.kind().component();
        if self.cache.has_synced() {
            // still serving the last good snapshot
            self.health
                .set_degraded(component, format!("stale: {}", error))
                .await;
        } else {
            self.health.set_unhealthy(component, error.to_string()).await;
        }
    }
}
