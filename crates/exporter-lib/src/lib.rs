//! Cluster state metrics exporter library
//!
//! This crate provides:
//! - Watch caches mirroring deployments, pods, nodes and replication
//!   controllers from the Kubernetes API
//! - Scrape-time collectors rendering those caches as Prometheus gauges
//! - An explicit metrics registry and the HTTP API serving it
//! - Push ingestion of externally produced metric points

pub mod api;
pub mod cache;
pub mod caches;
pub mod client;
pub mod collector;
pub mod error;
pub mod health;
pub mod lister;
pub mod models;
pub mod observability;
pub mod push;
pub mod quantity;
pub mod registry;

pub use caches::{ResourceCaches, SyncSettings};
pub use error::{CacheError, ExporterError, ListerError};
pub use health::{ComponentHealth, ComponentStatus, HealthRegistry, ReadinessResponse};
pub use models::*;
pub use observability::ExporterMetrics;
pub use registry::MetricsRegistry;
