//! mapkubeapis Kube - Helm release storage and cluster access
//!
//! This crate provides:
//! - **Release records**: the Helm v3 release object, unknown fields preserved
//! - **Storage Drivers**: Helm's Secret and ConfigMap layouts, plus an in-memory driver
//! - **Cluster**: client construction from kubeconfig and server version lookup
//! - **Actions**: mapping the deprecated APIs of a stored release into a new revision

pub mod actions;
pub mod cluster;
pub mod error;
pub mod release;
pub mod storage;

pub use actions::{MapOptions, MapOutcome, map_release};
pub use cluster::{ClusterVersion, ConnectOptions, StaticVersion, VersionProvider};
pub use error::{KubeError, Result};
pub use release::{HelmRelease, ReleaseInfo, ReleaseStatus};
pub use storage::{
    ConfigMapDriver, MemoryDriver, OperationCounts, SecretsDriver, StorageDriver, StorageKind,
};
