use super::{collect_kind, descs, families, GaugeFamily};
use crate::lister::Lister;
use crate::models::ResourceKind;
use k8s_openapi::api::core::v1::ReplicationController;
use kube::ResourceExt;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;

const LABELS: &[&str] = &["namespace", "replicationcontroller"];

/// Desired vs. current replica gauges per replication controller
pub struct ReplicationControllerCollector {
    lister: Box<dyn Lister<ReplicationController>>,
    spec_replicas: GaugeFamily,
    replicas: GaugeFamily,
    fully_labeled: GaugeFamily,
    ready: GaugeFamily,
    available: GaugeFamily,
    generation: GaugeFamily,
    observed_generation: GaugeFamily,
}

impl ReplicationControllerCollector {
    pub fn new(lister: impl Lister<ReplicationController> + 'static) -> prometheus::Result<Self> {
        Ok(Self {
            lister: Box::new(lister),
            spec_replicas: GaugeFamily::new(
                "kube_replicationcontroller_spec_replicas",
                "Number of desired pods for a ReplicationController.",
                LABELS,
            )?,
            replicas: GaugeFamily::new(
                "kube_replicationcontroller_status_replicas",
                "The number of replicas per ReplicationController.",
                LABELS,
            )?,
            fully_labeled: GaugeFamily::new(
                "kube_replicationcontroller_status_fully_labeled_replicas",
                "The number of fully labeled replicas per ReplicationController.",
                LABELS,
            )?,
            ready: GaugeFamily::new(
                "kube_replicationcontroller_status_ready_replicas",
                "The number of ready replicas per ReplicationController.",
                LABELS,
            )?,
            available: GaugeFamily::new(
                "kube_replicationcontroller_status_available_replicas",
                "The number of available replicas per ReplicationController.",
                LABELS,
            )?,
            generation: GaugeFamily::new(
                "kube_replicationcontroller_metadata_generation",
                "Sequence number representing a specific generation of the desired state.",
                LABELS,
            )?,
            observed_generation: GaugeFamily::new(
                "kube_replicationcontroller_status_observed_generation",
                "The generation observed by the ReplicationController controller.",
                LABELS,
            )?,
        })
    }

    fn all(&self) -> [&GaugeFamily; 7] {
        [
            &self.spec_replicas,
            &self.replicas,
            &self.fully_labeled,
            &self.ready,
            &self.available,
            &self.generation,
            &self.observed_generation,
        ]
    }

    fn render(&self, rcs: &[ReplicationController]) -> prometheus::Result<Vec<MetricFamily>> {
        let spec_replicas = self.spec_replicas.fresh()?;
        let replicas = self.replicas.fresh()?;
        let fully_labeled = self.fully_labeled.fresh()?;
        let ready = self.ready.fresh()?;
        let available = self.available.fresh()?;
        let generation = self.generation.fresh()?;
        let observed_generation = self.observed_generation.fresh()?;

        for rc in rcs {
            let ns = rc.namespace().unwrap_or_default();
            let name = rc.name_any();
            let labels = [ns.as_str(), name.as_str()];

            // an unset spec.replicas means the API default of 1
            let desired = rc.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
            spec_replicas.with_label_values(&labels).set(f64::from(desired));
            if let Some(g) = rc.metadata.generation {
                generation.with_label_values(&labels).set(g as f64);
            }

            let Some(status) = rc.status.as_ref() else {
                continue;
            };
            replicas
                .with_label_values(&labels)
                .set(f64::from(status.replicas));
            fully_labeled
                .with_label_values(&labels)
                .set(f64::from(status.fully_labeled_replicas.unwrap_or(0)));
            ready
                .with_label_values(&labels)
                .set(f64::from(status.ready_replicas.unwrap_or(0)));
            available
                .with_label_values(&labels)
                .set(f64::from(status.available_replicas.unwrap_or(0)));
            if let Some(g) = status.observed_generation {
                observed_generation.with_label_values(&labels).set(g as f64);
            }
        }

        Ok(families(&[
            spec_replicas,
            replicas,
            fully_labeled,
            ready,
            available,
            generation,
            observed_generation,
        ]))
    }
}

impl Collector for ReplicationControllerCollector {
    fn desc(&self) -> Vec<&Desc> {
        descs(&self.all())
    }

    fn collect(&self) -> Vec<MetricFamily> {
        collect_kind(
            ResourceKind::ReplicationController,
            self.lister.as_ref(),
            |rcs| self.render(rcs),
        )
    }
}
