use super::{bool_gauge, collect_kind, descs, families, resource_value, GaugeFamily};
use crate::lister::Lister;
use crate::models::ResourceKind;
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;

const CONTAINER: &[&str] = &["namespace", "pod", "container"];
const CONTAINER_RESOURCE: &[&str] = &["namespace", "pod", "container", "node"];

/// Pod phase, readiness, container status and resource gauges
pub struct PodCollector {
    lister: Box<dyn Lister<Pod>>,
    info: GaugeFamily,
    phase: GaugeFamily,
    ready: GaugeFamily,
    scheduled: GaugeFamily,
    restarts: GaugeFamily,
    container_ready: GaugeFamily,
    requests_cpu: GaugeFamily,
    requests_memory: GaugeFamily,
    limits_cpu: GaugeFamily,
    limits_memory: GaugeFamily,
}

impl PodCollector {
    pub fn new(lister: impl Lister<Pod> + 'static) -> prometheus::Result<Self> {
        Ok(Self {
            lister: Box::new(lister),
            info: GaugeFamily::new(
                "kube_pod_info",
                "Information about pod.",
                &["namespace", "pod", "host_ip", "pod_ip", "node"],
            )?,
            phase: GaugeFamily::new(
                "kube_pod_status_phase",
                "The pods current phase.",
                &["namespace", "pod", "phase"],
            )?,
            ready: GaugeFamily::new(
                "kube_pod_status_ready",
                "Describes whether the pod is ready to serve requests.",
                &["namespace", "pod", "condition"],
            )?,
            scheduled: GaugeFamily::new(
                "kube_pod_status_scheduled",
                "Describes the status of the scheduling process for the pod.",
                &["namespace", "pod", "condition"],
            )?,
            restarts: GaugeFamily::new(
                "kube_pod_container_status_restarts",
                "The number of container restarts per container.",
                CONTAINER,
            )?,
            container_ready: GaugeFamily::new(
                "kube_pod_container_status_ready",
                "Describes whether the containers readiness check succeeded.",
                CONTAINER,
            )?,
            requests_cpu: GaugeFamily::new(
                "kube_pod_container_resource_requests_cpu_cores",
                "The number of requested cpu cores by a container.",
                CONTAINER_RESOURCE,
            )?,
            requests_memory: GaugeFamily::new(
                "kube_pod_container_resource_requests_memory_bytes",
                "The number of requested memory bytes by a container.",
                CONTAINER_RESOURCE,
            )?,
            limits_cpu: GaugeFamily::new(
                "kube_pod_container_resource_limits_cpu_cores",
                "The limit on cpu cores to be used by a container.",
                CONTAINER_RESOURCE,
            )?,
            limits_memory: GaugeFamily::new(
                "kube_pod_container_resource_limits_memory_bytes",
                "The limit on memory to be used by a container in bytes.",
                CONTAINER_RESOURCE,
            )?,
        })
    }

    fn all(&self) -> [&GaugeFamily; 10] {
        [
            &self.info,
            &self.phase,
            &self.ready,
            &self.scheduled,
            &self.restarts,
            &self.container_ready,
            &self.requests_cpu,
            &self.requests_memory,
            &self.limits_cpu,
            &self.limits_memory,
        ]
    }

    fn render(&self, pods: &[Pod]) -> prometheus::Result<Vec<MetricFamily>> {
        let info = self.info.fresh()?;
        let phase = self.phase.fresh()?;
        let ready = self.ready.fresh()?;
        let scheduled = self.scheduled.fresh()?;
        let restarts = self.restarts.fresh()?;
        let container_ready = self.container_ready.fresh()?;
        let requests_cpu = self.requests_cpu.fresh()?;
        let requests_memory = self.requests_memory.fresh()?;
        let limits_cpu = self.limits_cpu.fresh()?;
        let limits_memory = self.limits_memory.fresh()?;

        for pod in pods {
            let ns = pod.namespace().unwrap_or_default();
            let name = pod.name_any();
            let status = pod.status.as_ref();
            let node = pod
                .spec
                .as_ref()
                .and_then(|s| s.node_name.clone())
                .unwrap_or_default();

            let host_ip = status.and_then(|s| s.host_ip.clone()).unwrap_or_default();
            let pod_ip = status.and_then(|s| s.pod_ip.clone()).unwrap_or_default();
            info.with_label_values(&[&ns, &name, &host_ip, &pod_ip, &node])
                .set(1.0);

            if let Some(p) = status.and_then(|s| s.phase.as_deref()) {
                phase.with_label_values(&[&ns, &name, p]).set(1.0);
            }

            for cond in status.and_then(|s| s.conditions.as_ref()).into_iter().flatten() {
                let target = match cond.type_.as_str() {
                    "Ready" => &ready,
                    "PodScheduled" => &scheduled,
                    _ => continue,
                };
                for value in ["true", "false", "unknown"] {
                    let current = cond.status.eq_ignore_ascii_case(value);
                    target
                        .with_label_values(&[&ns, &name, value])
                        .set(bool_gauge(current));
                }
            }

            for cs in status
                .and_then(|s| s.container_statuses.as_ref())
                .into_iter()
                .flatten()
            {
                let labels = [ns.as_str(), name.as_str(), cs.name.as_str()];
                restarts
                    .with_label_values(&labels)
                    .set(f64::from(cs.restart_count));
                container_ready
                    .with_label_values(&labels)
                    .set(bool_gauge(cs.ready));
            }

            for c in pod.spec.iter().flat_map(|s| s.containers.iter()) {
                let labels = [ns.as_str(), name.as_str(), c.name.as_str(), node.as_str()];
                let requests = c.resources.as_ref().and_then(|r| r.requests.as_ref());
                let limits = c.resources.as_ref().and_then(|r| r.limits.as_ref());

                if let Some(v) = resource_value(requests, "cpu") {
                    requests_cpu.with_label_values(&labels).set(v);
                }
                if let Some(v) = resource_value(requests, "memory") {
                    requests_memory.with_label_values(&labels).set(v);
                }
                if let Some(v) = resource_value(limits, "cpu") {
                    limits_cpu.with_label_values(&labels).set(v);
                }
                if let Some(v) = resource_value(limits, "memory") {
                    limits_memory.with_label_values(&labels).set(v);
                }
            }
        }

        Ok(families(&[
            info,
            phase,
            ready,
            scheduled,
            restarts,
            container_ready,
            requests_cpu,
            requests_memory,
            limits_cpu,
            limits_memory,
        ]))
    }
}

impl Collector for PodCollector {
    fn desc(&self) -> Vec<&Desc> {
        descs(&self.all())
    }

    fn collect(&self) -> Vec<MetricFamily> {
        collect_kind(ResourceKind::Pod, self.lister.as_ref(), |pods| {
            self.render(pods)
        })
    }
}
