//! List/watch sources feeding the reflectors

use super::CacheEvent;
use crate::error::CacheError;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use kube::{
    api::{Api, ListParams, WatchEvent, WatchParams},
    Client, Resource,
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Stream of watch events; an `Err` item ends the watch session
pub type EventStream<K> = BoxStream<'static, Result<CacheEvent<K>, CacheError>>;

/// Server-side ceiling on watch timeouts
const MAX_WATCH_TIMEOUT_SECS: u64 = 290;

/// A full listing together with the resource version to watch from
#[derive(Debug, Clone)]
pub struct Listing<K> {
    pub items: Vec<K>,
    pub resource_version: String,
}

/// The list + watch verbs of a remote resource collection
#[async_trait]
pub trait ListWatch<K>: Send + Sync {
    /// Fetch every object of the kind across all namespaces
    async fn list(&self) -> Result<Listing<K>, CacheError>;

    /// Subscribe to changes after `resource_version`
    async fn watch(&self, resource_version: &str) -> Result<EventStream<K>, CacheError>;
}

#[async_trait]
impl<K, S> ListWatch<K> for Arc<S>
where
    K: Send + 'static,
    S: ListWatch<K> + ?Sized,
{
    async fn list(&self) -> Result<Listing<K>, CacheError> {
        (**self).list().await
    }

    async fn watch(&self, resource_version: &str) -> Result<EventStream<K>, CacheError> {
        (**self).watch(resource_version).await
    }
}

/// [`ListWatch`] backed by the Kubernetes API, unscoped by namespace
pub struct KubeSource<K> {
    api: Api<K>,
    watch_timeout: u32,
}

impl<K> KubeSource<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    /// `watch_timeout` bounds each watch session, after which the reflector
    /// relists. It is clamped below the API server's limit.
    pub fn new(client: Client, watch_timeout: Duration) -> Self {
        let secs = watch_timeout.as_secs().clamp(1, MAX_WATCH_TIMEOUT_SECS);
        Self {
            api: Api::all(client),
            watch_timeout: secs as u32,
        }
    }
}

#[async_trait]
impl<K> ListWatch<K> for KubeSource<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    async fn list(&self) -> Result<Listing<K>, CacheError> {
        let list = self.api.list(&ListParams::default()).await?;
        Ok(Listing {
            items: list.items,
            resource_version: list.metadata.resource_version.unwrap_or_default(),
        })
    }

    async fn watch(&self, resource_version: &str) -> Result<EventStream<K>, CacheError> {
        let params = WatchParams::default().timeout(self.watch_timeout);
        let events = self.api.watch(&params, resource_version).await?;

        Ok(events
            .map(|event| match event {
                Ok(WatchEvent::Added(o)) => Ok(CacheEvent::Added(o)),
                Ok(WatchEvent::Modified(o)) => Ok(CacheEvent::Modified(o)),
                Ok(WatchEvent::Deleted(o)) => Ok(CacheEvent::Deleted(o)),
                Ok(WatchEvent::Bookmark(b)) => Ok(CacheEvent::Bookmark(b.metadata.resource_version)),
                Ok(WatchEvent::Error(e)) => Err(CacheError::Expired(format!(
                    "{} ({})",
                    e.message, e.code
                ))),
                Err(e) => Err(CacheError::Api(e)),
            })
            .boxed())
    }
}
