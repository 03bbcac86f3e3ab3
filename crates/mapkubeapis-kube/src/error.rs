//! Error types for mapkubeapis-kube

use thiserror::Error;

/// Result type for mapkubeapis-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while talking to the cluster or release storage
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Mapping pipeline error
    #[error(transparent)]
    Core(#[from] mapkubeapis_core::CoreError),

    /// Cluster could not be reached in time (never retried)
    #[error("kubernetes cluster unreachable: {0}")]
    ClusterUnreachable(String),

    /// Kubeconfig could not be loaded
    #[error("invalid kubeconfig: {0}")]
    Kubeconfig(String),

    /// Release not found
    #[error("release '{name}' not found in namespace '{namespace}'")]
    ReleaseNotFound { name: String, namespace: String },

    /// Release has no deployed revision to map
    #[error("release '{name}' in namespace '{namespace}' has no deployed revision")]
    ReleaseNotDeployed { name: String, namespace: String },

    /// Release revision already exists
    #[error("release '{name}' revision {version} already exists in namespace '{namespace}'")]
    ReleaseAlreadyExists {
        name: String,
        namespace: String,
        version: u32,
    },

    /// Storage error
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Compression error
    #[error("compression error: {0}")]
    Compression(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<kube::config::KubeconfigError> for KubeError {
    fn from(e: kube::config::KubeconfigError) -> Self {
        KubeError::Kubeconfig(e.to_string())
    }
}

impl KubeError {
    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 404)
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 409)
    }
}
