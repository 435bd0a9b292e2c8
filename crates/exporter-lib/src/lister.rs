//! Typed snapshot accessors used by the collectors

use crate::cache::{CacheObject, WatchCache};
use crate::error::ListerError;
use std::sync::Arc;

/// Produces a snapshot of all objects of one kind
pub trait Lister<K>: Send + Sync {
    fn list(&self) -> Result<Vec<K>, ListerError>;
}

/// Reads straight from a [`WatchCache`]
pub struct CacheLister<K> {
    cache: Arc<WatchCache<K>>,
}

impl<K> CacheLister<K> {
    pub fn new(cache: Arc<WatchCache<K>>) -> Self {
        Self { cache }
    }
}

impl<K: CacheObject> Lister<K> for CacheLister<K> {
    fn list(&self) -> Result<Vec<K>, ListerError> {
        Ok(self.cache.list())
    }
}

/// Fixed set of objects
pub struct StaticLister<K> {
    objects: Vec<K>,
}

impl<K> StaticLister<K> {
    pub fn new(objects: Vec<K>) -> Self {
        Self { objects }
    }
}

impl<K: Clone + Send + Sync> Lister<K> for StaticLister<K> {
    fn list(&self) -> Result<Vec<K>, ListerError> {
        Ok(self.objects.clone())
    }
}

impl<K, F> Lister<K> for F
where
    F: Fn() -> Result<Vec<K>, ListerError> + Send + Sync,
{
    fn list(&self) -> Result<Vec<K>, ListerError> {
        self()
    }
}
