//! Error types shared across the exporter

use thiserror::Error;

/// Failures of the list/watch source feeding a watch cache.
///
/// All of these are recovered inside the reflector loop by a full relist,
/// they never reach a scrape caller.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("kubernetes api error: {0}")]
    Api(#[from] kube::Error),

    /// The server sent an error event on the watch stream (usually 410 Gone)
    #[error("watch expired: {0}")]
    Expired(String),

    #[error("list/watch source failed: {0}")]
    Source(String),
}

/// Returned by a lister that cannot produce a snapshot.
#[derive(Debug, Error)]
pub enum ListerError {
    #[error("lister unavailable: {0}")]
    Unavailable(String),
}

/// Startup and serving errors
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("metric registration failed: {0}")]
    Registration(#[source] prometheus::Error),

    #[error("failed to encode metrics: {0}")]
    Encode(#[source] prometheus::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("kubernetes client error: {0}")]
    Kube(#[from] kube::Error),

    #[error("failed to load kubernetes config: {0}")]
    KubeConfig(String),
}

pub type Result<T, E = ExporterError> = std::result::Result<T, E>;
