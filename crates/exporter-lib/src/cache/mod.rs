//! Watch caches mirroring cluster resources
//!
//! A [`WatchCache`] holds the current objects of one resource kind. It is
//! filled by a [`Reflector`] that lists everything once, then applies watch
//! events in arrival order. Any interruption of the watch stream leads to a
//! full relist which replaces the whole store in one step.
//!
//! The store has a single writer (the reflector task) and any number of
//! readers calling [`WatchCache::list`] from scrape requests.

mod reflector;
mod source;


pub use reflector::{Backoff, Reflector, ReflectorConfig};
pub use source::{EventStream, KubeSource, ListWatch, Listing};

use crate::models::{ObjectKey, ResourceKind};
use kube::Resource;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// An object that can live in a watch cache
pub trait CacheObject: Clone + PartialEq + Send + Sync + 'static {
    fn key(&self) -> ObjectKey;
}

impl<K> CacheObject for K
where
    K: Resource<DynamicType = ()> + Clone + PartialEq + Send + Sync + 'static,
{
    fn key(&self) -> ObjectKey {
        ObjectKey::of(self)
    }
}

/// One change delivered by a watch stream
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent<K> {
    Added(K),
    Modified(K),
    Deleted(K),
    /// Progress marker carrying a newer resource version, no object change
    Bookmark(String),
}

impl<K> CacheEvent<K> {
    /// Short name used as the `type` label of the event counter
    pub fn type_name(&self) -> &'static str {
        match self {
            CacheEvent::Added(_) => "added",
            CacheEvent::Modified(_) => "modified",
            CacheEvent::Deleted(_) => "deleted",
            CacheEvent::Bookmark(_) => "bookmark",
        }
    }
}

/// Eventually-consistent local copy of all objects of one kind
pub struct WatchCache<K> {
    kind: ResourceKind,
    store: RwLock<HashMap<ObjectKey, K>>,
    synced: AtomicBool,
}

impl<K: CacheObject> WatchCache<K> {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            store: RwLock::new(HashMap::new()),
            synced: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Independent copy of the current contents, in no particular order
    pub fn list(&self) -> Vec<K> {
        self.store.read().values().cloned().collect()
    }

    pub fn get(&self, key: &ObjectKey) -> Option<K> {
        self.store.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    /// True once the first full list has been stored
    pub fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Replace the whole store with a fresh listing.
    ///
    /// The new map is built outside the lock so readers only ever see the
    /// old or the new contents.
    pub fn replace(&self, objects: Vec<K>) {
        let fresh: HashMap<ObjectKey, K> = objects.into_iter().map(|o| (o.key(), o)).collect();
        *self.store.write() = fresh;
        self.synced.store(true, Ordering::Release);
    }

    /// Apply one watch event. Returns true if the store changed.
    pub fn apply(&self, event: CacheEvent<K>) -> bool {
        match event {
            CacheEvent::Added(object) | CacheEvent::Modified(object) => {
                let key = object.key();
                let mut store = self.store.write();
                if store.get(&key) == Some(&object) {
                    debug!(kind = %self.kind, key = %key, "Object already up to date");
                    return false;
                }
                store.insert(key, object);
                true
            }
            CacheEvent::Deleted(object) => {
                let key = object.key();
                if self.store.write().remove(&key).is_none() {
                    debug!(kind = %self.kind, key = %key, "Delete for unknown key");
                    return false;
                }
                true
            }
            CacheEvent::Bookmark(_) => false,
        }
    }
}
