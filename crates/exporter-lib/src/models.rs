//! Core data models for the exporter

use kube::{Resource, ResourceExt};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// The resource kinds mirrored into watch caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Deployment,
    Pod,
    Node,
    ReplicationController,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Deployment,
        ResourceKind::Pod,
        ResourceKind::Node,
        ResourceKind::ReplicationController,
    ];

    /// Lowercase name used in metric labels and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Deployment => "deployment",
            ResourceKind::Pod => "pod",
            ResourceKind::Node => "node",
            ResourceKind::ReplicationController => "replicationcontroller",
        }
    }

    /// Health component name of this kind's cache
    pub fn component(&self) -> &'static str {
        match self {
            ResourceKind::Deployment => "deployment_cache",
            ResourceKind::Pod => "pod_cache",
            ResourceKind::Node => "node_cache",
            ResourceKind::ReplicationController => "replicationcontroller_cache",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one cached object: kind + namespace + name.
///
/// Cluster-scoped objects (nodes) have no namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn new(kind: impl Into<String>, namespace: Option<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace,
            name: name.into(),
        }
    }

    /// Key of a typed Kubernetes object
    pub fn of<K>(object: &K) -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        Self {
            kind: K::kind(&()).into_owned(),
            namespace: object.namespace(),
            name: object.name_any(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// A metric point pushed by an external agent.
///
/// Wire-compatible with the open-falcon `MetricValue` JSON shape. Only
/// `metric` and `value` are required; `value` is forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    /// Originating identity, defaulted to the local hostname when empty
    #[serde(default, deserialize_with = "null_as_default")]
    pub endpoint: String,
    pub metric: String,
    pub value: serde_json::Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub step: i64,
    #[serde(rename = "counterType", default, deserialize_with = "null_as_default")]
    pub counter_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: i64,
}

/// Explicit `null` reads the same as an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl MetricValue {
    /// Fill the endpoint if the sender left it out. Returns true if it was filled.
    pub fn fill_endpoint(&mut self, hostname: &str) -> bool {
        if self.endpoint.is_empty() {
            self.endpoint = hostname.to_string();
            true
        } else {
            false
        }
    }
}
