//! Cluster connection and Kubernetes version lookup

use async_trait::async_trait;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use mapkubeapis_core::KubeVersion;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::error::{KubeError, Result};

/// Default bound on the server version request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where to find the cluster
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Explicit kubeconfig file; otherwise `KUBECONFIG`, `~/.kube/config` or in-cluster
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context; otherwise the current context
    pub context: Option<String>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Build a client from these options
    pub async fn connect(&self) -> Result<Client> {
        let options = KubeConfigOptions {
            context: self.context.clone(),
            ..Default::default()
        };

        let config = match &self.kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)?;
                Config::from_custom_kubeconfig(kubeconfig, &options).await?
            }
            None if self.context.is_some() => Config::from_kubeconfig(&options).await?,
            None => Config::infer()
                .await
                .map_err(|e| KubeError::Kubeconfig(e.to_string()))?,
        };

        debug!(cluster_url = %config.cluster_url, "connecting to cluster");
        Ok(Client::try_from(config)?)
    }
}

/// Source of the cluster's Kubernetes version
#[async_trait]
pub trait VersionProvider: Send + Sync {
    async fn server_version(&self) -> Result<KubeVersion>;
}

/// Asks the API server for its version
pub struct ClusterVersion {
    client: Client,
    timeout: Duration,
}

impl ClusterVersion {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl VersionProvider for ClusterVersion {
    async fn server_version(&self) -> Result<KubeVersion> {
        let info = tokio::time::timeout(self.timeout, self.client.apiserver_version())
            .await
            .map_err(|_| {
                KubeError::ClusterUnreachable(format!(
                    "timed out after {}s waiting for the server version",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| KubeError::ClusterUnreachable(e.to_string()))?;

        debug!(git_version = %info.git_version, "API server version");
        Ok(info.git_version.parse()?)
    }
}

/// A fixed version, for offline runs
#[derive(Debug, Clone)]
pub struct StaticVersion(KubeVersion);

impl StaticVersion {
    pub fn new(version: KubeVersion) -> Self {
        Self(version)
    }
}

impl std::str::FromStr for StaticVersion {
    type Err = KubeError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(s.parse()?))
    }
}

#[async_trait]
impl VersionProvider for StaticVersion {
    async fn server_version(&self) -> Result<KubeVersion> {
        Ok(self.0.clone())
    }
}
