//! Exporter configuration

use anyhow::Result;
use exporter_lib::cache::ReflectorConfig;
use exporter_lib::client::ClientSettings;
use exporter_lib::SyncSettings;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Exporter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExporterConfig {
    /// API server URL; overrides the host of the resolved kube config
    #[serde(default)]
    pub apiserver: Option<String>,

    /// Use the pod's service account
    #[serde(default)]
    pub in_cluster: bool,

    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Listen port for metrics, health and push
    #[serde(default = "default_port")]
    pub port: u16,

    /// Endpoint given to pushed points that carry none
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Where pushed batches are forwarded
    #[serde(default)]
    pub transfer_url: Option<String>,

    #[serde(default = "default_push_enabled")]
    pub push_enabled: bool,

    /// Watch session length; every expiry triggers a relist
    #[serde(default = "default_resync_period")]
    pub resync_period_secs: u64,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_port() -> u16 {
    80
}

fn default_hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_push_enabled() -> bool {
    true
}

fn default_resync_period() -> u64 {
    300
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    60
}

impl ExporterConfig {
    /// Load from an optional `exporter.{toml,yaml,json}` file overlaid by
    /// `EXPORTER_*` environment variables, then validate.
    pub fn load() -> Result<Self> {
        let source = config::Config::builder()
            .add_source(config::File::with_name("exporter").required(false))
            .add_source(config::Environment::with_prefix("EXPORTER").try_parsing(true))
            .build()?;
        Self::from_source(source)
    }

    fn from_source(source: config::Config) -> Result<Self> {
        let config: Self = source.try_deserialize()?;
        config.client_settings().validate()?;
        Ok(config)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            apiserver: self.apiserver.clone(),
            in_cluster: self.in_cluster,
            kubeconfig: self.kubeconfig.clone(),
        }
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            resync_period: Duration::from_secs(self.resync_period_secs),
            reflector: ReflectorConfig {
                initial_backoff: Duration::from_millis(self.initial_backoff_ms),
                max_backoff: Duration::from_secs(self.max_backoff_secs),
            },
        }
    }
}
