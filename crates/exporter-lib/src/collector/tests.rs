//! Tests for the per-kind collectors
//!
//! Objects are built in memory and fed through static or cache-backed
//! listers, then the gathered families are inspected by name and labels.

use super::*;
use crate::cache::{CacheEvent, WatchCache};
use crate::error::ListerError;
use crate::lister::{CacheLister, StaticLister};
use crate::registry::MetricsRegistry;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStatus};
use k8s_openapi::api::core::v1::{
    Container, ContainerStatus, Node, NodeCondition, NodeSpec, NodeStatus, NodeSystemInfo, Pod,
    PodCondition, PodSpec, PodStatus, ReplicationController, ReplicationControllerSpec,
    ReplicationControllerStatus, ResourceRequirements,
};
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;

fn meta(namespace: Option<&str>, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        ..Default::default()
    }
}

fn quantities(pairs: &[(&str, &str)]) -> BTreeMap<String, Quantity> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
        .collect()
}

fn pod(name: &str, phase: &str) -> Pod {
    Pod {
        metadata: meta(Some("default"), name),
        spec: Some(PodSpec {
            node_name: Some("worker-1".into()),
            containers: vec![Container {
                name: "app".into(),
                resources: Some(ResourceRequirements {
                    requests: Some(quantities(&[("cpu", "250m"), ("memory", "64Mi")])),
                    limits: Some(quantities(&[("cpu", "1"), ("memory", "not-a-size")])),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            host_ip: Some("10.0.0.5".into()),
            pod_ip: Some("172.16.0.9".into()),
            conditions: Some(vec![PodCondition {
                type_: "Ready".into(),
                status: "True".into(),
                ..Default::default()
            }]),
            container_statuses: Some(vec![ContainerStatus {
                name: "app".into(),
                restart_count: 3,
                ready: true,
                ..Default::default()
            }]),
            ..Default::default()
        }),
    }
}

fn node(name: &str) -> Node {
    Node {
        metadata: meta(None, name),
        spec: Some(NodeSpec {
            unschedulable: Some(true),
            ..Default::default()
        }),
        status: Some(NodeStatus {
            capacity: Some(quantities(&[("cpu", "4"), ("memory", "8Gi"), ("pods", "110")])),
            allocatable: Some(quantities(&[
                ("cpu", "3800m"),
                ("memory", "7Gi"),
                ("pods", "110"),
            ])),
            conditions: Some(vec![
                NodeCondition {
                    type_: "Ready".into(),
                    status: "True".into(),
                    ..Default::default()
                },
                NodeCondition {
                    type_: "MemoryPressure".into(),
                    status: "False".into(),
                    ..Default::default()
                },
            ]),
            node_info: Some(NodeSystemInfo {
                kernel_version: "6.1.0".into(),
                os_image: "Debian GNU/Linux 12".into(),
                container_runtime_version: "containerd://1.7.2".into(),
                kubelet_version: "v1.28.3".into(),
                kube_proxy_version: "v1.28.3".into(),
                ..Default::default()
            }),
            ..Default::default()
        }),
    }
}

fn deployment(name: &str, replicas: Option<i32>) -> Deployment {
    let mut metadata = meta(Some("default"), name);
    metadata.generation = Some(4);
    Deployment {
        metadata,
        spec: Some(DeploymentSpec {
            replicas,
            paused: Some(true),
            ..Default::default()
        }),
        status: Some(DeploymentStatus {
            replicas: Some(3),
            available_replicas: Some(2),
            unavailable_replicas: Some(1),
            updated_replicas: Some(3),
            observed_generation: Some(3),
            ..Default::default()
        }),
    }
}

fn replication_controller(name: &str, with_status: bool) -> ReplicationController {
    ReplicationController {
        metadata: meta(Some("legacy"), name),
        spec: Some(ReplicationControllerSpec {
            replicas: Some(2),
            ..Default::default()
        }),
        status: with_status.then(|| ReplicationControllerStatus {
            replicas: 2,
            fully_labeled_replicas: Some(2),
            ready_replicas: Some(1),
            available_replicas: Some(1),
            observed_generation: Some(7),
            ..Default::default()
        }),
    }
}

fn family<'a>(families: &'a [MetricFamily], name: &str) -> Option<&'a MetricFamily> {
    families.iter().find(|f| f.get_name() == name)
}

fn sample_count(families: &[MetricFamily], name: &str) -> usize {
    family(families, name).map_or(0, |f| f.get_metric().len())
}

/// Value of the single sample whose labels include every given pair
fn sample(families: &[MetricFamily], name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    family(families, name)?
        .get_metric()
        .iter()
        .find(|m| {
            labels.iter().all(|(k, v)| {
                m.get_label()
                    .iter()
                    .any(|l| l.get_name() == *k && l.get_value() == *v)
            })
        })
        .map(|m| m.get_gauge().get_value())
}

fn failing<K>() -> impl Fn() -> Result<Vec<K>, ListerError> + Send + Sync {
    || Err(ListerError::Unavailable("cache not available".into()))
}

mod pod_collector_tests {
    use super::*;

    #[test]
    fn test_one_phase_sample_per_pod() {
        let collector = PodCollector::new(StaticLister::new(vec![
            pod("web-0", "Running"),
            pod("web-1", "Pending"),
        ]))
        .unwrap();

        let families = collector.collect();

        assert_eq!(sample_count(&families, "kube_pod_status_phase"), 2);
        assert_eq!(
            sample(
                &families,
                "kube_pod_status_phase",
                &[("pod", "web-0"), ("phase", "Running")]
            ),
            Some(1.0)
        );
        assert_eq!(
            sample(
                &families,
                "kube_pod_status_phase",
                &[("pod", "web-1"), ("phase", "Pending")]
            ),
            Some(1.0)
        );
    }

    #[test]
    fn test_deleted_pod_disappears_from_next_scrape() {
        let cache = Arc::new(WatchCache::new(ResourceKind::Pod));
        cache.replace(vec![pod("web-0", "Running"), pod("web-1", "Pending")]);
        let collector = PodCollector::new(CacheLister::new(cache.clone())).unwrap();

        assert_eq!(sample_count(&collector.collect(), "kube_pod_status_phase"), 2);

        cache.apply(CacheEvent::Deleted(pod("web-1", "Pending")));

        let families = collector.collect();
        assert_eq!(sample_count(&families, "kube_pod_status_phase"), 1);
        assert_eq!(
            sample(&families, "kube_pod_status_phase", &[("pod", "web-1")]),
            None
        );
    }

    #[test]
    fn test_info_and_conditions() {
        let collector = PodCollector::new(StaticLister::new(vec![pod("web-0", "Running")])).unwrap();
        let families = collector.collect();

        assert_eq!(
            sample(
                &families,
                "kube_pod_info",
                &[
                    ("namespace", "default"),
                    ("pod", "web-0"),
                    ("host_ip", "10.0.0.5"),
                    ("pod_ip", "172.16.0.9"),
                    ("node", "worker-1"),
                ]
            ),
            Some(1.0)
        );
        assert_eq!(sample_count(&families, "kube_pod_status_ready"), 3);
        assert_eq!(
            sample(&families, "kube_pod_status_ready", &[("condition", "true")]),
            Some(1.0)
        );
        assert_eq!(
            sample(&families, "kube_pod_status_ready", &[("condition", "false")]),
            Some(0.0)
        );
        assert_eq!(
            sample(&families, "kube_pod_status_ready", &[("condition", "unknown")]),
            Some(0.0)
        );
        // no PodScheduled condition on this pod
        assert_eq!(sample_count(&families, "kube_pod_status_scheduled"), 0);
    }

    #[test]
    fn test_container_gauges() {
        let collector = PodCollector::new(StaticLister::new(vec![pod("web-0", "Running")])).unwrap();
        let families = collector.collect();
        let labels = [("pod", "web-0"), ("container", "app")];

        assert_eq!(
            sample(&families, "kube_pod_container_status_restarts", &labels),
            Some(3.0)
        );
        assert_eq!(
            sample(&families, "kube_pod_container_status_ready", &labels),
            Some(1.0)
        );
        assert_eq!(
            sample(
                &families,
                "kube_pod_container_resource_requests_cpu_cores",
                &labels
            ),
            Some(0.25)
        );
        assert_eq!(
            sample(
                &families,
                "kube_pod_container_resource_requests_memory_bytes",
                &labels
            ),
            Some(64.0 * 1024.0 * 1024.0)
        );
        assert_eq!(
            sample(
                &families,
                "kube_pod_container_resource_limits_cpu_cores",
                &labels
            ),
            Some(1.0)
        );
        // unparseable limit is skipped, not zeroed
        assert_eq!(
            sample_count(&families, "kube_pod_container_resource_limits_memory_bytes"),
            0
        );
    }

    #[test]
    fn test_pod_without_status_only_has_info() {
        let bare = Pod {
            metadata: meta(Some("default"), "bare"),
            ..Default::default()
        };
        let collector = PodCollector::new(StaticLister::new(vec![bare])).unwrap();
        let families = collector.collect();

        assert_eq!(sample_count(&families, "kube_pod_info"), 1);
        assert_eq!(sample_count(&families, "kube_pod_status_phase"), 0);
    }
}

mod node_collector_tests {
    use super::*;

    #[test]
    fn test_capacity_and_allocatable() {
        let collector = NodeCollector::new(StaticLister::new(vec![node("worker-1")])).unwrap();
        let families = collector.collect();
        let labels = [("node", "worker-1")];

        assert_eq!(
            sample(&families, "kube_node_status_capacity_cpu_cores", &labels),
            Some(4.0)
        );
        assert_eq!(
            sample(&families, "kube_node_status_capacity_memory_bytes", &labels),
            Some(8.0 * 1024.0 * 1024.0 * 1024.0)
        );
        assert_eq!(
            sample(&families, "kube_node_status_capacity_pods", &labels),
            Some(110.0)
        );
        assert_eq!(
            sample(&families, "kube_node_status_allocatable_cpu_cores", &labels),
            Some(3.8)
        );
        assert_eq!(
            sample(&families, "kube_node_status_allocatable_memory_bytes", &labels),
            Some(7.0 * 1024.0 * 1024.0 * 1024.0)
        );
    }

    #[test]
    fn test_ready_condition_and_info() {
        let collector = NodeCollector::new(StaticLister::new(vec![node("worker-1")])).unwrap();
        let families = collector.collect();

        assert_eq!(
            sample(
                &families,
                "kube_node_status_ready",
                &[("node", "worker-1"), ("condition", "true")]
            ),
            Some(1.0)
        );
        assert_eq!(
            sample(
                &families,
                "kube_node_status_ready",
                &[("node", "worker-1"), ("condition", "false")]
            ),
            Some(0.0)
        );
        assert_eq!(
            sample(
                &families,
                "kube_node_status_condition",
                &[("condition", "MemoryPressure"), ("status", "false")]
            ),
            Some(1.0)
        );
        assert_eq!(
            sample(
                &families,
                "kube_node_info",
                &[("kubelet_version", "v1.28.3"), ("kernel_version", "6.1.0")]
            ),
            Some(1.0)
        );
        assert_eq!(
            sample(&families, "kube_node_spec_unschedulable", &[("node", "worker-1")]),
            Some(1.0)
        );
    }
}

mod deployment_collector_tests {
    use super::*;

    #[test]
    fn test_replica_gauges() {
        let collector =
            DeploymentCollector::new(StaticLister::new(vec![deployment("api", Some(3))])).unwrap();
        let families = collector.collect();
        let labels = [("namespace", "default"), ("deployment", "api")];

        assert_eq!(
            sample(&families, "kube_deployment_spec_replicas", &labels),
            Some(3.0)
        );
        assert_eq!(
            sample(&families, "kube_deployment_status_replicas_available", &labels),
            Some(2.0)
        );
        assert_eq!(
            sample(&families, "kube_deployment_status_replicas_unavailable", &labels),
            Some(1.0)
        );
        assert_eq!(
            sample(&families, "kube_deployment_spec_paused", &labels),
            Some(1.0)
        );
        assert_eq!(
            sample(&families, "kube_deployment_metadata_generation", &labels),
            Some(4.0)
        );
        assert_eq!(
            sample(&families, "kube_deployment_status_observed_generation", &labels),
            Some(3.0)
        );
    }

    #[test]
    fn test_unset_spec_replicas_defaults_to_one() {
        let collector =
            DeploymentCollector::new(StaticLister::new(vec![deployment("api", None)])).unwrap();
        let families = collector.collect();

        assert_eq!(
            sample(
                &families,
                "kube_deployment_spec_replicas",
                &[("deployment", "api")]
            ),
            Some(1.0)
        );
    }
}

mod replication_controller_collector_tests {
    use super::*;

    #[test]
    fn test_replica_gauges() {
        let collector = ReplicationControllerCollector::new(StaticLister::new(vec![
            replication_controller("frontend", true),
        ]))
        .unwrap();
        let families = collector.collect();
        let labels = [("namespace", "legacy"), ("replicationcontroller", "frontend")];

        assert_eq!(
            sample(&families, "kube_replicationcontroller_spec_replicas", &labels),
            Some(2.0)
        );
        assert_eq!(
            sample(
                &families,
                "kube_replicationcontroller_status_ready_replicas",
                &labels
            ),
            Some(1.0)
        );
        assert_eq!(
            sample(
                &families,
                "kube_replicationcontroller_status_observed_generation",
                &labels
            ),
            Some(7.0)
        );
    }

    #[test]
    fn test_missing_status_skips_status_gauges() {
        let collector = ReplicationControllerCollector::new(StaticLister::new(vec![
            replication_controller("frontend", false),
        ]))
        .unwrap();
        let families = collector.collect();

        assert_eq!(
            sample_count(&families, "kube_replicationcontroller_spec_replicas"),
            1
        );
        assert_eq!(
            sample_count(&families, "kube_replicationcontroller_status_replicas"),
            0
        );
    }

    #[test]
    fn test_unset_spec_replicas_defaults_to_one() {
        let mut rc = replication_controller("frontend", true);
        rc.spec = None;
        let collector = ReplicationControllerCollector::new(StaticLister::new(vec![rc])).unwrap();
        let families = collector.collect();

        assert_eq!(
            sample(
                &families,
                "kube_replicationcontroller_spec_replicas",
                &[("replicationcontroller", "frontend")]
            ),
            Some(1.0)
        );
    }
}

mod registry_tests {
    use super::*;

    fn register_all(
        registry: &MetricsRegistry,
        pods: impl Lister<Pod> + 'static,
    ) -> crate::error::Result<()> {
        registry.register(PodCollector::new(pods).unwrap())?;
        registry.register(NodeCollector::new(StaticLister::new(vec![node("worker-1")])).unwrap())?;
        registry.register(
            DeploymentCollector::new(StaticLister::new(vec![deployment("api", Some(2))])).unwrap(),
        )?;
        registry.register(
            ReplicationControllerCollector::new(StaticLister::new(vec![
                replication_controller("frontend", true),
            ]))
            .unwrap(),
        )?;
        Ok(())
    }

    #[test]
    fn test_failing_lister_isolated_to_its_kind() {
        let registry = MetricsRegistry::new();
        register_all(&registry, failing::<Pod>()).unwrap();

        let families = registry.gather();

        assert!(families.iter().all(|f| !f.get_name().starts_with("kube_pod_")));
        assert_eq!(sample_count(&families, "kube_node_status_capacity_pods"), 1);
        assert_eq!(sample_count(&families, "kube_deployment_spec_replicas"), 1);
        assert_eq!(
            sample_count(&families, "kube_replicationcontroller_spec_replicas"),
            1
        );
    }

    #[test]
    fn test_render_includes_every_kind() {
        let registry = MetricsRegistry::new();
        register_all(&registry, StaticLister::new(vec![pod("web-0", "Running")])).unwrap();

        let text = String::from_utf8(registry.render().unwrap()).unwrap();

        assert!(text.contains("kube_pod_status_phase{"));
        assert!(text.contains("kube_node_status_ready{"));
        assert!(text.contains("kube_deployment_status_replicas{"));
        assert!(text.contains("kube_replicationcontroller_status_replicas{"));
    }

    #[test]
    fn test_duplicate_collector_rejected() {
        let registry = MetricsRegistry::new();
        registry
            .register(PodCollector::new(StaticLister::new(Vec::<Pod>::new())).unwrap())
            .unwrap();

        let second = registry.register(PodCollector::new(StaticLister::new(Vec::<Pod>::new())).unwrap());

        assert!(second.is_err());
    }

    #[test]
    fn test_empty_caches_render_without_error() {
        let registry = MetricsRegistry::new();
        register_all(&registry, StaticLister::new(Vec::<Pod>::new())).unwrap();

        assert!(registry.render().is_ok());
    }
}

#[test]
fn test_gauge_family_fresh_is_independent() {
    let family = GaugeFamily::new("test_gauge", "help", &["a"]).unwrap();
    let first = family.fresh().unwrap();
    first.with_label_values(&["x"]).set(1.0);

    let second = family.fresh().unwrap();
    assert_eq!(second.collect()[0].get_metric().len(), 0);
    assert_eq!(family.name(), "test_gauge");
}

#[test]
fn test_resource_value_parses_and_skips() {
    let resources = quantities(&[("cpu", "500m"), ("memory", "bogus")]);
    assert_eq!(resource_value(Some(&resources), "cpu"), Some(0.5));
    assert_eq!(resource_value(Some(&resources), "memory"), None);
    assert_eq!(resource_value(Some(&resources), "pods"), None);
    assert_eq!(resource_value(None, "cpu"), None);
}
