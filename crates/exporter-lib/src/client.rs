//! Cluster client construction
//!
//! Resolves credentials in-cluster, from an explicit kubeconfig, or by
//! inference, applies an optional API server override and checks that the
//! server answers before anything else starts.

use crate::error::{ExporterError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::PathBuf;
use tracing::info;

/// Where the client gets its connection settings
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    /// Overrides the host from the resolved config
    pub apiserver: Option<String>,
    /// Use the pod's service account
    pub in_cluster: bool,
    pub kubeconfig: Option<PathBuf>,
}

impl ClientSettings {
    /// Reject settings that cannot possibly reach a server
    pub fn validate(&self) -> Result<()> {
        let has_apiserver = self.apiserver.as_deref().is_some_and(|s| !s.is_empty());
        if !has_apiserver && !self.in_cluster && self.kubeconfig.is_none() {
            return Err(ExporterError::Config(
                "apiserver not set, in_cluster is false and no kubeconfig given; \
                 apiserver must be set to a valid URL"
                    .to_string(),
            ));
        }
        Ok(())
    }

    async fn resolve(&self) -> Result<Config> {
        let mut config = if self.in_cluster {
            Config::incluster().map_err(|e| ExporterError::KubeConfig(e.to_string()))?
        } else if let Some(path) = &self.kubeconfig {
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|e| ExporterError::KubeConfig(e.to_string()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| ExporterError::KubeConfig(e.to_string()))?
        } else {
            Config::infer()
                .await
                .map_err(|e| ExporterError::KubeConfig(e.to_string()))?
        };

        if let Some(apiserver) = self.apiserver.as_deref().filter(|s| !s.is_empty()) {
            config.cluster_url = apiserver.parse().map_err(|e| {
                ExporterError::Config(format!("invalid apiserver URL {:?}: {}", apiserver, e))
            })?;
        }
        Ok(config)
    }
}

/// Build a client and confirm the API server is reachable
pub async fn connect(settings: &ClientSettings) -> Result<Client> {
    settings.validate()?;
    let config = settings.resolve().await?;

    let token_present = config.auth_info.token.is_some() || config.auth_info.token_file.is_some();
    info!(
        host = %config.cluster_url,
        in_cluster = settings.in_cluster,
        token_present,
        "Creating kubernetes client"
    );

    let client = Client::try_from(config)?;

    // list/watch failures are retried forever, so surface a bad address here
    let version = client.apiserver_version().await?;
    info!(
        version = %version.git_version,
        platform = %version.platform,
        "Connected to API server"
    );

    Ok(client)
}
