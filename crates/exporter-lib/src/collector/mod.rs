//! Scrape-time collectors, one per resource kind
//!
//! Each collector lists its kind on every scrape and renders the objects
//! into a fixed set of gauge families. Series are built fresh per scrape,
//! so nothing outlives the gather call that produced it and concurrent
//! scrapes never share state.
//!
//! A lister failure is logged and yields no samples for that kind only.

mod deployment;
mod node;
mod pod;
mod replication_controller;

#[cfg(test)]
mod tests;

pub use deployment::DeploymentCollector;
pub use node::NodeCollector;
pub use pod::PodCollector;
pub use replication_controller::ReplicationControllerCollector;

use crate::lister::Lister;
use crate::models::ResourceKind;
use crate::quantity;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Static description of one gauge family plus a factory for fresh series
pub struct GaugeFamily {
    name: &'static str,
    help: &'static str,
    labels: &'static [&'static str],
    template: GaugeVec,
}

impl GaugeFamily {
    pub fn new(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> prometheus::Result<Self> {
        let template = GaugeVec::new(Opts::new(name, help), labels)?;
        Ok(Self {
            name,
            help,
            labels,
            template,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn desc(&self) -> Vec<&Desc> {
        self.template.desc()
    }

    /// Empty series set for one scrape
    pub fn fresh(&self) -> prometheus::Result<GaugeVec> {
        GaugeVec::new(Opts::new(self.name, self.help), self.labels)
    }
}

/// Merge rendered series into metric families
pub(crate) fn families(vecs: &[GaugeVec]) -> Vec<MetricFamily> {
    vecs.iter().flat_map(|v| v.collect()).collect()
}

/// Shared collect path: list, render, and isolate failures
pub(crate) fn collect_kind<K, R>(
    kind: ResourceKind,
    lister: &dyn Lister<K>,
    render: R,
) -> Vec<MetricFamily>
where
    R: FnOnce(&[K]) -> prometheus::Result<Vec<MetricFamily>>,
{
    let objects = match lister.list() {
        Ok(objects) => objects,
        Err(e) => {
            warn!(kind = %kind, error = %e, "Lister failed, skipping kind for this scrape");
            return Vec::new();
        }
    };

    match render(&objects) {
        Ok(families) => families,
        Err(e) => {
            warn!(kind = %kind, error = %e, "Failed to render metrics");
            Vec::new()
        }
    }
}

/// Every family's descriptors, for [`Collector::desc`]
pub(crate) fn descs<'a>(families: &[&'a GaugeFamily]) -> Vec<&'a Desc> {
    families.iter().flat_map(|&f| f.desc()).collect()
}

/// Look up and parse one resource quantity; unparseable values are skipped
pub(crate) fn resource_value(
    resources: Option<&BTreeMap<String, Quantity>>,
    name: &str,
) -> Option<f64> {
    let q = resources?.get(name)?;
    match quantity::to_f64(q) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(resource = %name, error = %e, "Skipping unparseable quantity");
            None
        }
    }
}

fn bool_gauge(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
