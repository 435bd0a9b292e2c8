use super::{bool_gauge, collect_kind, descs, families, resource_value, GaugeFamily};
use crate::lister::Lister;
use crate::models::ResourceKind;
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;

const NODE: &[&str] = &["node"];

/// Node info, schedulability, conditions, capacity and allocatable gauges
pub struct NodeCollector {
    lister: Box<dyn Lister<Node>>,
    info: GaugeFamily,
    unschedulable: GaugeFamily,
    ready: GaugeFamily,
    condition: GaugeFamily,
    capacity_cpu: GaugeFamily,
    capacity_memory: GaugeFamily,
    capacity_pods: GaugeFamily,
    allocatable_cpu: GaugeFamily,
    allocatable_memory: GaugeFamily,
    allocatable_pods: GaugeFamily,
}

impl NodeCollector {
    pub fn new(lister: impl Lister<Node> + 'static) -> prometheus::Result<Self> {
        Ok(Self {
            lister: Box::new(lister),
            info: GaugeFamily::new(
                "kube_node_info",
                "Information about a cluster node.",
                &[
                    "node",
                    "kernel_version",
                    "os_image",
                    "container_runtime_version",
                    "kubelet_version",
                    "kube_proxy_version",
                ],
            )?,
            unschedulable: GaugeFamily::new(
                "kube_node_spec_unschedulable",
                "Whether a node can schedule new pods.",
                NODE,
            )?,
            ready: GaugeFamily::new(
                "kube_node_status_ready",
                "The ready status of a cluster node.",
                &["node", "condition"],
            )?,
            condition: GaugeFamily::new(
                "kube_node_status_condition",
                "The condition of a cluster node.",
                &["node", "condition", "status"],
            )?,
            capacity_cpu: GaugeFamily::new(
                "kube_node_status_capacity_cpu_cores",
                "The total CPU resources of the node.",
                NODE,
            )?,
            capacity_memory: GaugeFamily::new(
                "kube_node_status_capacity_memory_bytes",
                "The total memory resources of the node.",
                NODE,
            )?,
            capacity_pods: GaugeFamily::new(
                "kube_node_status_capacity_pods",
                "The total pod resources of the node.",
                NODE,
            )?,
            allocatable_cpu: GaugeFamily::new(
                "kube_node_status_allocatable_cpu_cores",
                "The CPU resources of a node that are available for scheduling.",
                NODE,
            )?,
            allocatable_memory: GaugeFamily::new(
                "kube_node_status_allocatable_memory_bytes",
                "The memory resources of a node that are available for scheduling.",
                NODE,
            )?,
            allocatable_pods: GaugeFamily::new(
                "kube_node_status_allocatable_pods",
                "The pod resources of a node that are available for scheduling.",
                NODE,
            )?,
        })
    }

    fn all(&self) -> [&GaugeFamily; 10] {
        [
            &self.info,
            &self.unschedulable,
            &self.ready,
            &self.condition,
            &self.capacity_cpu,
            &self.capacity_memory,
            &self.capacity_pods,
            &self.allocatable_cpu,
            &self.allocatable_memory,
            &self.allocatable_pods,
        ]
    }

    fn render(&self, nodes: &[Node]) -> prometheus::Result<Vec<MetricFamily>> {
        let info = self.info.fresh()?;
        let unschedulable = self.unschedulable.fresh()?;
        let ready = self.ready.fresh()?;
        let condition = self.condition.fresh()?;
        let capacity_cpu = self.capacity_cpu.fresh()?;
        let capacity_memory = self.capacity_memory.fresh()?;
        let capacity_pods = self.capacity_pods.fresh()?;
        let allocatable_cpu = self.allocatable_cpu.fresh()?;
        let allocatable_memory = self.allocatable_memory.fresh()?;
        let allocatable_pods = self.allocatable_pods.fresh()?;

        for node in nodes {
            let name = node.name_any();
            let status = node.status.as_ref();

            if let Some(ni) = status.and_then(|s| s.node_info.as_ref()) {
                info.with_label_values(&[
                    &name,
                    &ni.kernel_version,
                    &ni.os_image,
                    &ni.container_runtime_version,
                    &ni.kubelet_version,
                    &ni.kube_proxy_version,
                ])
                .set(1.0);
            }

            let cordoned = node
                .spec
                .as_ref()
                .and_then(|s| s.unschedulable)
                .unwrap_or(false);
            unschedulable
                .with_label_values(&[&name])
                .set(bool_gauge(cordoned));

            for cond in status.and_then(|s| s.conditions.as_ref()).into_iter().flatten() {
                for value in ["true", "false", "unknown"] {
                    let current = bool_gauge(cond.status.eq_ignore_ascii_case(value));
                    condition
                        .with_label_values(&[&name, &cond.type_, value])
                        .set(current);
                    if cond.type_ == "Ready" {
                        ready.with_label_values(&[&name, value]).set(current);
                    }
                }
            }

            let capacity = status.and_then(|s| s.capacity.as_ref());
            let allocatable = status.and_then(|s| s.allocatable.as_ref());
            let gauges = [
                (capacity, "cpu", &capacity_cpu),
                (capacity, "memory", &capacity_memory),
                (capacity, "pods", &capacity_pods),
                (allocatable, "cpu", &allocatable_cpu),
                (allocatable, "memory", &allocatable_memory),
                (allocatable, "pods", &allocatable_pods),
            ];
            for (resources, resource, gauge) in gauges {
                if let Some(v) = resource_value(resources, resource) {
                    gauge.with_label_values(&[&name]).set(v);
                }
            }
        }

        Ok(families(&[
            info,
            unschedulable,
            ready,
            condition,
            capacity_cpu,
            capacity_memory,
            capacity_pods,
            allocatable_cpu,
            allocatable_memory,
            allocatable_pods,
        ]))
    }
}

impl Collector for NodeCollector {
    fn desc(&self) -> Vec<&Desc> {
        descs(&self.all())
    }

    fn collect(&self) -> Vec<MetricFamily> {
        collect_kind(ResourceKind::Node, self.lister.as_ref(), |nodes| {
            self.render(nodes)
        })
    }
}
