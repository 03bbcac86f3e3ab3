//! Helm v3 release records
//!
//! Only the fields mapping reads or writes are typed. Chart, values, hooks
//! and anything newer Helm versions add are carried through untouched in
//! the flattened `extra` maps.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Release status, as stored by Helm
///
/// Note: This enum is non-exhaustive - new variants may be added in future versions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ReleaseStatus {
    #[default]
    Unknown,
    Deployed,
    Uninstalled,
    Superseded,
    Failed,
    Uninstalling,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
}

impl ReleaseStatus {
    /// Status name as used in storage labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Deployed => "deployed",
            Self::Uninstalled => "uninstalled",
            Self::Superseded => "superseded",
            Self::Failed => "failed",
            Self::Uninstalling => "uninstalling",
            Self::PendingInstall => "pending-install",
            Self::PendingUpgrade => "pending-upgrade",
            Self::PendingRollback => "pending-rollback",
        }
    }
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `info` block of a release
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReleaseInfo {
    #[serde(default)]
    pub status: ReleaseStatus,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_deployed: Option<String>,

    /// `first_deployed`, `deleted`, `notes`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A Helm v3 release revision
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HelmRelease {
    pub name: String,

    #[serde(default)]
    pub info: ReleaseInfo,

    /// Rendered manifest (all Kubernetes resources)
    #[serde(default)]
    pub manifest: String,

    /// Revision number (1-indexed, increments with each upgrade)
    pub version: u32,

    pub namespace: String,

    /// `chart`, `config`, `hooks`, `labels`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HelmRelease {
    /// Create a minimal deployed release
    pub fn new(name: &str, namespace: &str, version: u32, manifest: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            version,
            manifest: manifest.to_string(),
            info: ReleaseInfo {
                status: ReleaseStatus::Deployed,
                ..Default::default()
            },
            extra: Map::new(),
        }
    }

    /// Storage object name, `sh.helm.release.v1.<name>.v<version>`
    pub fn storage_key(&self) -> String {
        storage_key(&self.name, self.version)
    }

    pub fn is_deployed(&self) -> bool {
        self.info.status == ReleaseStatus::Deployed
    }

    /// Chart name and version, `name-version`, if the chart metadata is present
    pub fn chart_ref(&self) -> Option<String> {
        let metadata = self.extra.get("chart")?.get("metadata")?;
        let name = metadata.get("name")?.as_str()?;
        match metadata.get("version").and_then(Value::as_str) {
            Some(version) => Some(format!("{}-{}", name, version)),
            None => Some(name.to_string()),
        }
    }

    /// Build revision `version` carrying a new manifest
    ///
    /// Everything else (chart, values, hooks) is copied from this revision.
    /// `version` must be above every stored revision, not just this one.
    pub fn next_revision(&self, version: u32, manifest: String, description: &str) -> Self {
        let mut next = self.clone();
        next.version = version;
        next.manifest = manifest;
        next.info.status = ReleaseStatus::Deployed;
        next.info.description = description.to_string();
        next.info.last_deployed = Some(now());
        next
    }

    /// Mark this revision as replaced by a newer one
    pub fn mark_superseded(&mut self) {
        self.info.status = ReleaseStatus::Superseded;
    }
}

/// Storage object name for a release revision
pub fn storage_key(name: &str, version: u32) -> String {
    format!("sh.helm.release.v1.{}.v{}", name, version)
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn helm_json() -> Value {
        json!({
            "name": "testing",
            "info": {
                "first_deployed": "2020-03-18T11:26:38.393287Z",
                "last_deployed": "2020-03-18T11:26:38.393287Z",
                "deleted": "",
                "description": "Install complete",
                "status": "deployed"
            },
            "chart": {
                "metadata": { "name": "startnet-auto-deploy", "version": "0.1.0", "apiVersion": "v1" },
                "templates": []
            },
            "config": { "replicaCount": 1 },
            "manifest": "---\napiVersion: v1\nkind: Service\n",
            "version": 3,
            "namespace": "default"
        })
    }

    #[test]
    fn test_deserialize_helm_release() {
        let release: HelmRelease = serde_json::from_value(helm_json()).unwrap();

        assert_eq!(release.name, "testing");
        assert_eq!(release.version, 3);
        assert!(release.is_deployed());
        assert_eq!(release.info.description, "Install complete");
        assert_eq!(release.chart_ref().as_deref(), Some("startnet-auto-deploy-0.1.0"));
        assert_eq!(release.storage_key(), "sh.helm.release.v1.testing.v3");
    }

    #[test]
    fn test_unknown_fields_roundtrip() {
        let release: HelmRelease = serde_json::from_value(helm_json()).unwrap();
        let back = serde_json::to_value(&release).unwrap();
        assert_eq!(back, helm_json());
    }

    #[test]
    fn test_next_revision() {
        let mut current: HelmRelease = serde_json::from_value(helm_json()).unwrap();
        let next = current.next_revision(6, "new manifest".to_string(), "mapped");
        current.mark_superseded();

        assert_eq!(next.version, 6);
        assert_eq!(next.manifest, "new manifest");
        assert_eq!(next.info.status, ReleaseStatus::Deployed);
        assert_eq!(next.info.description, "mapped");
        assert_ne!(next.info.last_deployed, current.info.last_deployed);
        assert_eq!(next.extra.get("config"), current.extra.get("config"));
        assert_eq!(current.info.status, ReleaseStatus::Superseded);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_value(ReleaseStatus::PendingUpgrade).unwrap(),
            json!("pending-upgrade")
        );
        assert_eq!(ReleaseStatus::Superseded.to_string(), "superseded");
    }
}
