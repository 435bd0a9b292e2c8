//! The exporter's own metrics
//!
//! Watch cache activity and push ingestion counters, registered into the
//! same registry as the resource collectors.

use crate::error::Result;
use crate::models::ResourceKind;
use crate::registry::MetricsRegistry;
use prometheus::{IntCounter, IntCounterVec, IntGaugeVec, Opts};

/// Cloneable handle; clones share the underlying series
#[derive(Clone)]
pub struct ExporterMetrics {
    watch_events: IntCounterVec,
    relists: IntCounterVec,
    list_errors: IntCounterVec,
    cache_objects: IntGaugeVec,
    push_points: IntCounter,
    push_rejected: IntCounterVec,
}

impl ExporterMetrics {
    /// Create the metrics and register them into `registry`
    pub fn new(registry: &MetricsRegistry) -> Result<Self> {
        let metrics = Self::unregistered();
        registry.register(metrics.watch_events.clone())?;
        registry.register(metrics.relists.clone())?;
        registry.register(metrics.list_errors.clone())?;
        registry.register(metrics.cache_objects.clone())?;
        registry.register(metrics.push_points.clone())?;
        registry.register(metrics.push_rejected.clone())?;
        Ok(metrics)
    }

    /// Metrics not attached to any registry, for code paths that only
    /// need somewhere to count
    pub fn unregistered() -> Self {
        // Names and label sets are static, construction cannot fail.
        Self {
            watch_events: IntCounterVec::new(
                Opts::new(
                    "kube_state_exporter_watch_events_total",
                    "Watch events received, by resource kind and event type",
                ),
                &["kind", "type"],
            )
            .expect("valid watch_events metric"),
            relists: IntCounterVec::new(
                Opts::new(
                    "kube_state_exporter_relists_total",
                    "Successful full lists per resource kind",
                ),
                &["kind"],
            )
            .expect("valid relists metric"),
            list_errors: IntCounterVec::new(
                Opts::new(
                    "kube_state_exporter_list_errors_total",
                    "Failed list calls per resource kind",
                ),
                &["kind"],
            )
            .expect("valid list_errors metric"),
            cache_objects: IntGaugeVec::new(
                Opts::new(
                    "kube_state_exporter_cache_objects",
                    "Objects currently held in each watch cache",
                ),
                &["kind"],
            )
            .expect("valid cache_objects metric"),
            push_points: IntCounter::new(
                "kube_state_exporter_push_points_total",
                "Pushed metric points accepted and forwarded",
            )
            .expect("valid push_points metric"),
            push_rejected: IntCounterVec::new(
                Opts::new(
                    "kube_state_exporter_push_rejected_total",
                    "Push requests rejected, by reason",
                ),
                &["reason"],
            )
            .expect("valid push_rejected metric"),
        }
    }

    pub fn inc_watch_event(&self, kind: ResourceKind, event_type: &str) {
        self.watch_events
            .with_label_values(&[kind.as_str(), event_type])
            .inc();
    }

    pub fn inc_relist(&self, kind: ResourceKind) {
        self.relists.with_label_values(&[kind.as_str()]).inc();
    }

    pub fn inc_list_error(&self, kind: ResourceKind) {
        self.list_errors.with_label_values(&[kind.as_str()]).inc();
    }

    pub fn set_cache_objects(&self, kind: ResourceKind, count: usize) {
        self.cache_objects
            .with_label_values(&[kind.as_str()])
            .set(count as i64);
    }

    pub fn inc_push_points(&self, count: usize) {
        self.push_points.inc_by(count as u64);
    }

    pub fn inc_push_rejected(&self, reason: &str) {
        self.push_rejected.with_label_values(&[reason]).inc();
    }

    pub fn relists(&self, kind: ResourceKind) -> u64 {
        self.relists.with_label_values(&[kind.as_str()]).get()
    }

    pub fn list_errors(&self, kind: ResourceKind) -> u64 {
        self.list_errors.with_label_values(&[kind.as_str()]).get()
    }

    pub fn push_points(&self) -> u64 {
        self.push_points.get()
    }
}
