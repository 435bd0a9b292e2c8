//! The four resource caches and their wiring
//!
//! Builds one [`WatchCache`] per kind, registers a collector reading each
//! one, and spawns a reflector per kind against the cluster API.

use crate::cache::{CacheObject, KubeSource, ListWatch, Reflector, ReflectorConfig, WatchCache};
use crate::collector::{
    DeploymentCollector, NodeCollector, PodCollector, ReplicationControllerCollector,
};
use crate::error::{ExporterError, Result};
use crate::health::HealthRegistry;
use crate::lister::CacheLister;
use crate::models::ResourceKind;
use crate::observability::ExporterMetrics;
use crate::registry::MetricsRegistry;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Node, Pod, ReplicationController};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// How the reflectors talk to the API server
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Length of each watch session; every expiry triggers a relist
    pub resync_period: Duration,
    pub reflector: ReflectorConfig,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            resync_period: Duration::from_secs(300),
            reflector: ReflectorConfig::default(),
        }
    }
}

pub struct ResourceCaches {
    pub deployments: Arc<WatchCache<Deployment>>,
    pub pods: Arc<WatchCache<Pod>>,
    pub nodes: Arc<WatchCache<Node>>,
    pub replication_controllers: Arc<WatchCache<ReplicationController>>,
}

impl Default for ResourceCaches {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCaches {
    pub fn new() -> Self {
        Self {
            deployments: Arc::new(WatchCache::new(ResourceKind::Deployment)),
            pods: Arc::new(WatchCache::new(ResourceKind::Pod)),
            nodes: Arc::new(WatchCache::new(ResourceKind::Node)),
            replication_controllers: Arc::new(WatchCache::new(
                ResourceKind::ReplicationController,
            )),
        }
    }

    /// Register one collector per cache. Fails on duplicate metric names.
    pub fn register_collectors(&self, registry: &MetricsRegistry) -> Result<()> {
        registry.register(
            DeploymentCollector::new(CacheLister::new(self.deployments.clone()))
                .map_err(ExporterError::Registration)?,
        )?;
        registry.register(
            PodCollector::new(CacheLister::new(self.pods.clone()))
                .map_err(ExporterError::Registration)?,
        )?;
        registry.register(
            NodeCollector::new(CacheLister::new(self.nodes.clone()))
                .map_err(ExporterError::Registration)?,
        )?;
        registry.register(
            ReplicationControllerCollector::new(CacheLister::new(
                self.replication_controllers.clone(),
            ))
            .map_err(ExporterError::Registration)?,
        )?;
        Ok(())
    }

    /// Mark every cache as pending in the health registry
    pub async fn register_health(&self, health: &HealthRegistry) {
        for kind in ResourceKind::ALL {
            health.register_pending(kind.component()).await;
        }
    }

    /// Spawn a reflector per kind against the cluster API
    pub fn spawn(
        &self,
        client: kube::Client,
        settings: &SyncSettings,
        health: &HealthRegistry,
        metrics: &ExporterMetrics,
        shutdown: &broadcast::Sender<()>,
    ) -> Vec<JoinHandle<()>> {
        let period = settings.resync_period;
        let spawner = Spawner {
            config: settings.reflector.clone(),
            health,
            metrics,
            shutdown,
        };
        vec![
            spawner.spawn(
                self.deployments.clone(),
                KubeSource::<Deployment>::new(client.clone(), period),
            ),
            spawner.spawn(
                self.pods.clone(),
                KubeSource::<Pod>::new(client.clone(), period),
            ),
            spawner.spawn(
                self.nodes.clone(),
                KubeSource::<Node>::new(client.clone(), period),
            ),
            spawner.spawn(
                self.replication_controllers.clone(),
                KubeSource::<ReplicationController>::new(client, period),
            ),
        ]
    }

    /// True once every cache has completed its first list
    pub fn all_synced(&self) -> bool {
        self.deployments.has_synced()
            && self.pods.has_synced()
            && self.nodes.has_synced()
            && self.replication_controllers.has_synced()
    }
}

struct Spawner<'a> {
    config: ReflectorConfig,
    health: &'a HealthRegistry,
    metrics: &'a ExporterMetrics,
    shutdown: &'a broadcast::Sender<()>,
}

impl Spawner<'_> {
    fn spawn<K, S>(&self, cache: Arc<WatchCache<K>>, source: S) -> JoinHandle<()>
    where
        K: CacheObject,
        S: ListWatch<K> + 'static,
    {
        let reflector = Reflector::new(
            cache,
            source,
            self.config.clone(),
            self.health.clone(),
            self.metrics.clone(),
        );
        tokio::spawn(reflector.run(self.shutdown.subscribe()))
    }
}
