//! Helm v3 release storage drivers
//!
//! Helm keeps one object per release revision, named
//! `sh.helm.release.v1.<name>.v<version>`, whose `release` key holds the
//! release JSON, gzipped and base64 encoded:
//! - **Secrets** (Helm default): `type: helm.sh/release.v1` Secrets
//! - **ConfigMap**: same layout in ConfigMaps
//! - **Memory**: in-process store for tests and offline use

mod configmap;
mod memory;
mod secrets;

pub use configmap::ConfigMapDriver;
pub use memory::{MemoryDriver, OperationCounts};
pub use secrets::SecretsDriver;

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::str::FromStr;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::{KubeError, Result};
use crate::release::HelmRelease;

/// Key under which the encoded release is stored
pub const RELEASE_KEY: &str = "release";

/// Owner label value Helm uses for its storage objects
pub const OWNER_HELM: &str = "helm";

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// Storage driver trait for release persistence
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Get a specific release revision
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<HelmRelease>;

    /// Get all revisions of a release, newest first
    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<HelmRelease>>;

    /// Store a new revision
    async fn create(&self, release: &HelmRelease) -> Result<()>;

    /// Replace an existing revision
    async fn update(&self, release: &HelmRelease) -> Result<()>;

    /// Get the newest revision with status `deployed`
    async fn last_deployed(&self, namespace: &str, name: &str) -> Result<HelmRelease> {
        self.history(namespace, name)
            .await?
            .into_iter()
            .find(HelmRelease::is_deployed)
            .ok_or_else(|| KubeError::ReleaseNotDeployed {
                name: name.to_string(),
                namespace: namespace.to_string(),
            })
    }
}

/// Which Kubernetes object kind holds release records
///
/// Helm's `sql` driver is not supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageKind {
    #[default]
    Secrets,
    ConfigMaps,
}

impl FromStr for StorageKind {
    type Err = KubeError;

    /// Accepts the values of Helm's `HELM_DRIVER`
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "" | "secret" | "secrets" => Ok(Self::Secrets),
            "configmap" | "configmaps" => Ok(Self::ConfigMaps),
            other => Err(KubeError::InvalidConfig(format!(
                "unsupported storage driver '{}', expected 'secret' or 'configmap'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Secrets => write!(f, "secret"),
            Self::ConfigMaps => write!(f, "configmap"),
        }
    }
}

impl StorageKind {
    /// Build the driver for this kind
    pub fn driver(self, client: kube::Client) -> Box<dyn StorageDriver> {
        match self {
            Self::Secrets => Box::new(SecretsDriver::new(client)),
            Self::ConfigMaps => Box::new(ConfigMapDriver::new(client)),
        }
    }
}

/// Encode a release for storage (serialize + gzip + base64)
#[must_use = "encoded data should be used for storage"]
pub fn encode_release(release: &HelmRelease) -> Result<String> {
    let json = serde_json::to_vec(release)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(&json)
        .map_err(|e| KubeError::Compression(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| KubeError::Compression(e.to_string()))?;

    Ok(STANDARD.encode(compressed))
}

/// Decode a stored release (base64 + optional gunzip + deserialize)
#[must_use = "decoded release should be used"]
pub fn decode_release(data: &str) -> Result<HelmRelease> {
    let decoded = STANDARD
        .decode(data.trim())
        .map_err(|e| KubeError::Serialization(format!("base64 decode error: {}", e)))?;

    if decoded.starts_with(&GZIP_MAGIC) {
        let mut json = Vec::new();
        GzDecoder::new(decoded.as_slice())
            .read_to_end(&mut json)
            .map_err(|e| KubeError::Compression(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    } else {
        Ok(serde_json::from_slice(&decoded)?)
    }
}

/// Labels Helm puts on release storage objects
#[must_use = "labels should be applied to resources"]
pub fn storage_labels(release: &HelmRelease) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("name".to_string(), release.name.clone());
    labels.insert("owner".to_string(), OWNER_HELM.to_string());
    labels.insert("status".to_string(), release.info.status.as_str().to_string());
    labels.insert("version".to_string(), release.version.to_string());
    labels
}

/// Label selector matching every revision of a release
pub fn release_selector(name: &str) -> String {
    format!("owner={},name={}", OWNER_HELM, name)
}

/// Sort newest first and fail when nothing was found
fn newest_first(
    mut releases: Vec<HelmRelease>,
    namespace: &str,
    name: &str,
) -> Result<Vec<HelmRelease>> {
    if releases.is_empty() {
        return Err(KubeError::ReleaseNotFound {
            name: name.to_string(),
            namespace: namespace.to_string(),
        });
    }
    releases.sort_by(|a, b| b.version.cmp(&a.version));
    Ok(releases)
}
