use super::{bool_gauge, collect_kind, descs, families, GaugeFamily};
use crate::lister::Lister;
use crate::models::ResourceKind;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
use kube::ResourceExt;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;

const LABELS: &[&str] = &["namespace", "deployment"];

/// Replica count and rollout gauges per deployment
pub struct DeploymentCollector {
    lister: Box<dyn Lister<Deployment>>,
    spec_replicas: GaugeFamily,
    replicas: GaugeFamily,
    available: GaugeFamily,
    unavailable: GaugeFamily,
    updated: GaugeFamily,
    paused: GaugeFamily,
    generation: GaugeFamily,
    observed_generation: GaugeFamily,
}

impl DeploymentCollector {
    pub fn new(lister: impl Lister<Deployment> + 'static) -> prometheus::Result<Self> {
        Ok(Self {
            lister: Box::new(lister),
            spec_replicas: GaugeFamily::new(
                "kube_deployment_spec_replicas",
                "Number of desired pods for a deployment.",
                LABELS,
            )?,
            replicas: GaugeFamily::new(
                "kube_deployment_status_replicas",
                "The number of replicas per deployment.",
                LABELS,
            )?,
            available: GaugeFamily::new(
                "kube_deployment_status_replicas_available",
                "The number of available replicas per deployment.",
                LABELS,
            )?,
            unavailable: GaugeFamily::new(
                "kube_deployment_status_replicas_unavailable",
                "The number of unavailable replicas per deployment.",
                LABELS,
            )?,
            updated: GaugeFamily::new(
                "kube_deployment_status_replicas_updated",
                "The number of updated replicas per deployment.",
                LABELS,
            )?,
            paused: GaugeFamily::new(
                "kube_deployment_spec_paused",
                "Whether the deployment is paused and will not be processed by the deployment controller.",
                LABELS,
            )?,
            generation: GaugeFamily::new(
                "kube_deployment_metadata_generation",
                "Sequence number representing a specific generation of the desired state.",
                LABELS,
            )?,
            observed_generation: GaugeFamily::new(
                "kube_deployment_status_observed_generation",
                "The generation observed by the deployment controller.",
                LABELS,
            )?,
        })
    }

    fn all(&self) -> [&GaugeFamily; 8] {
        [
            &self.spec_replicas,
            &self.replicas,
            &self.available,
            &self.unavailable,
            &self.updated,
            &self.paused,
            &self.generation,
            &self.observed_generation,
        ]
    }

    fn render(&self, deployments: &[Deployment]) -> prometheus::Result<Vec<MetricFamily>> {
        let spec_replicas = self.spec_replicas.fresh()?;
        let replicas = self.replicas.fresh()?;
        let available = self.available.fresh()?;
        let unavailable = self.unavailable.fresh()?;
        let updated = self.updated.fresh()?;
        let paused = self.paused.fresh()?;
        let generation = self.generation.fresh()?;
        let observed_generation = self.observed_generation.fresh()?;

        for d in deployments {
            let ns = d.namespace().unwrap_or_default();
            let name = d.name_any();
            let labels = [ns.as_str(), name.as_str()];
            let spec = d.spec.as_ref();
            let status = d.status.as_ref();

            // an unset spec.replicas means the API default of 1
            let desired = spec.and_then(|s| s.replicas).unwrap_or(1);
            spec_replicas.with_label_values(&labels).set(f64::from(desired));
            paused
                .with_label_values(&labels)
                .set(bool_gauge(spec.and_then(|s| s.paused).unwrap_or(false)));

            let count = |f: fn(&DeploymentStatus) -> Option<i32>| {
                f64::from(status.and_then(f).unwrap_or(0))
            };
            replicas.with_label_values(&labels).set(count(|s| s.replicas));
            available
                .with_label_values(&labels)
                .set(count(|s| s.available_replicas));
            unavailable
                .with_label_values(&labels)
                .set(count(|s| s.unavailable_replicas));
            updated
                .with_label_values(&labels)
                .set(count(|s| s.updated_replicas));

            if let Some(g) = d.metadata.generation {
                generation.with_label_values(&labels).set(g as f64);
            }
            if let Some(g) = status.and_then(|s| s.observed_generation) {
                observed_generation.with_label_values(&labels).set(g as f64);
            }
        }

        Ok(families(&[
            spec_replicas,
            replicas,
            available,
            unavailable,
            updated,
            paused,
            generation,
            observed_generation,
        ]))
    }
}

impl Collector for DeploymentCollector {
    fn desc(&self) -> Vec<&Desc> {
        descs(&self.all())
    }

    fn collect(&self) -> Vec<MetricFamily> {
        collect_kind(ResourceKind::Deployment, self.lister.as_ref(), |deployments| {
            self.render(deployments)
        })
    }
}
