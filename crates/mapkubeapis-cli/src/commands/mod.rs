//! CLI commands

pub mod manifest;
pub mod mappings;
pub mod release;

use clap::Args;
use mapkubeapis_core::{KubeVersion, LabelStrategy, Mapper, MappingTable};
use mapkubeapis_kube::{ClusterVersion, ConnectOptions, StaticVersion, VersionProvider};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;

/// Flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Mapping file (defaults to the built-in mappings)
    #[arg(long, global = true, value_name = "PATH")]
    pub mapfile: Option<PathBuf>,

    /// Kubernetes version to map for, instead of asking the cluster
    #[arg(long, global = true, value_name = "VERSION")]
    pub kube_version: Option<String>,

    /// Path to the kubeconfig file (KUBECONFIG is honoured when omitted)
    #[arg(long, global = true, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Name of the kubeconfig context to use
    #[arg(long, global = true, env = "HELM_KUBECONTEXT", value_name = "CONTEXT")]
    pub kube_context: Option<String>,

    /// Namespace of the release
    #[arg(
        short,
        long,
        global = true,
        env = "HELM_NAMESPACE",
        default_value = "default"
    )]
    pub namespace: String,

    /// Release storage driver (secret or configmap)
    #[arg(long, global = true, env = "HELM_DRIVER", default_value = "secret")]
    pub storage: String,

    /// Seconds to wait for the cluster version
    #[arg(long, global = true, default_value_t = 30, value_name = "SECONDS")]
    pub timeout: u64,

    /// How Deployment labels are repaired (union or selector)
    #[arg(long, global = true, default_value = "union")]
    pub label_strategy: LabelStrategy,
}

impl GlobalArgs {
    /// Build the mapper from `--mapfile` and `--label-strategy`
    pub fn mapper(&self) -> Result<Mapper> {
        let table = match &self.mapfile {
            Some(path) => MappingTable::from_file(path)?,
            None => MappingTable::builtin()?,
        };
        debug!(mappings = table.len(), "mapping table loaded");

        Ok(Mapper::builder(table)
            .label_strategy(self.label_strategy)
            .build())
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            kubeconfig: self.kubeconfig.clone(),
            context: self.kube_context.clone(),
        }
    }

    /// `--kube-version` if given, otherwise ask the API server
    pub async fn cluster_version(&self, client: Option<kube::Client>) -> Result<KubeVersion> {
        let provider: Box<dyn VersionProvider> = match (&self.kube_version, client) {
            (Some(version), _) => Box::new(version.parse::<StaticVersion>()?),
            (None, Some(client)) => Box::new(
                ClusterVersion::new(client).with_timeout(Duration::from_secs(self.timeout)),
            ),
            (None, None) => {
                let client = self.connect_options().connect().await?;
                Box::new(
                    ClusterVersion::new(client).with_timeout(Duration::from_secs(self.timeout)),
                )
            }
        };

        let version = provider.server_version().await?;
        debug!(cluster_version = %version, "Kubernetes version");
        Ok(version)
    }
}
