//! Release mapping action

use mapkubeapis_core::{KubeVersion, MapReport, Mapper, UPGRADE_DESCRIPTION};
use tracing::{info, warn};

use crate::error::{KubeError, Result};
use crate::release::HelmRelease;
use crate::storage::StorageDriver;

/// Options for mapping a stored release
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    /// Release name
    pub name: String,

    /// Release namespace
    pub namespace: String,

    /// Report only, write nothing
    pub dry_run: bool,
}

impl MapOptions {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Enable dry-run mode
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Result of mapping a release
#[derive(Debug, Clone)]
pub struct MapOutcome {
    /// The revision whose manifest was mapped
    pub release: HelmRelease,

    /// Revision written, if any
    pub written: Option<u32>,

    pub report: MapReport,
}

impl MapOutcome {
    pub fn is_written(&self) -> bool {
        self.written.is_some()
    }
}

/// Map the latest deployed revision of a release
///
/// When at least one deprecated API is found, the current revision is marked
/// superseded and a new deployed revision with the mapped manifest is stored.
/// The new revision is numbered after the newest stored revision, which may
/// be a newer failed or pending one. If it cannot be stored, the current
/// revision is put back to `deployed`.
pub async fn map_release<S: StorageDriver + ?Sized>(
    storage: &S,
    mapper: &Mapper,
    cluster_version: &KubeVersion,
    options: &MapOptions,
) -> Result<MapOutcome> {
    let history = storage.history(&options.namespace, &options.name).await?;
    let latest = history.first().map_or(0, |release| release.version);
    let current = history
        .into_iter()
        .find(HelmRelease::is_deployed)
        .ok_or_else(|| KubeError::ReleaseNotDeployed {
            name: options.name.clone(),
            namespace: options.namespace.clone(),
        })?;
    info!(
        release = %options.name,
        namespace = %options.namespace,
        version = current.version,
        "checking release for deprecated or removed APIs"
    );

    let report = mapper.map_for(&current.manifest, cluster_version)?;

    if !report.has_mappings() {
        info!(release = %options.name, "release has no deprecated or removed APIs");
        return Ok(MapOutcome {
            release: current,
            written: None,
            report,
        });
    }

    if options.dry_run {
        info!(
            release = %options.name,
            mappings = report.applied.len(),
            "dry run, release not updated"
        );
        return Ok(MapOutcome {
            release: current,
            written: None,
            report,
        });
    }

    let next = current.next_revision(latest + 1, report.manifest.clone(), UPGRADE_DESCRIPTION);

    let mut superseded = current.clone();
    superseded.mark_superseded();
    storage.update(&superseded).await?;

    if let Err(err) = storage.create(&next).await {
        warn!(
            release = %options.name,
            version = next.version,
            error = %err,
            "failed to store new revision, restoring revision {}",
            current.version
        );
        if let Err(restore) = storage.update(&current).await {
            warn!(
                release = %options.name,
                version = current.version,
                error = %restore,
                "failed to restore deployed status"
            );
        }
        return Err(err);
    }

    info!(
        release = %options.name,
        namespace = %options.namespace,
        from = current.version,
        to = next.version,
        "release updated with supported APIs"
    );

    Ok(MapOutcome {
        release: current,
        written: Some(next.version),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseStatus;
    use crate::storage::MemoryDriver;
    use mapkubeapis_core::MappingTable;

    const DEPRECATED: &str = "---
# Source: web/templates/deployment.yaml
apiVersion: extensions/v1beta1
kind: Deployment
metadata:
  name: web
  labels:
    app: web
    chart: web-0.1.0
    release: web
spec:
  template:
    metadata:
      labels:
        app: web
        release: web
";

    const CURRENT: &str = "---
apiVersion: v1
kind: Service
metadata:
  name: web
";

    fn version(v: &str) -> KubeVersion {
        v.parse().unwrap()
    }

    fn mapper() -> Mapper {
        Mapper::new(MappingTable::builtin().unwrap())
    }

    #[tokio::test]
    async fn test_map_release_writes_new_revision() {
        let storage = MemoryDriver::with_releases([HelmRelease::new("web", "default", 2, DEPRECATED)]);
        let options = MapOptions::new("web", "default");

        let outcome = map_release(&storage, &mapper(), &version("v1.16.0"), &options)
            .await
            .unwrap();

        assert_eq!(outcome.release.version, 2);
        assert_eq!(outcome.written, Some(3));

        let old = storage.get("default", "web", 2).await.unwrap();
        assert_eq!(old.info.status, ReleaseStatus::Superseded);
        assert_eq!(old.manifest, DEPRECATED);

        let new = storage.get("default", "web", 3).await.unwrap();
        assert!(new.is_deployed());
        assert_eq!(new.info.description, UPGRADE_DESCRIPTION);
        assert!(new.info.last_deployed.is_some());
        assert!(new.manifest.contains("apiVersion: apps/v1"));
        assert!(!new.manifest.contains("extensions/v1beta1"));
        assert!(new.manifest.contains("# Source: web/templates/deployment.yaml"));

        let counts = storage.operation_counts();
        assert_eq!(counts.updates, 1);
        assert_eq!(counts.creates, 1);
    }

    #[tokio::test]
    async fn test_map_release_without_deprecated_apis() {
        let storage = MemoryDriver::with_releases([HelmRelease::new("web", "default", 1, CURRENT)]);
        let options = MapOptions::new("web", "default");

        let outcome = map_release(&storage, &mapper(), &version("v1.22.0"), &options)
            .await
            .unwrap();

        assert!(!outcome.is_written());
        assert_eq!(storage.all_releases().len(), 1);
        assert_eq!(storage.operation_counts().updates, 0);
    }

    #[tokio::test]
    async fn test_map_release_dry_run() {
        let storage = MemoryDriver::with_releases([HelmRelease::new("web", "default", 1, DEPRECATED)]);
        let options = MapOptions::new("web", "default").dry_run();

        let outcome = map_release(&storage, &mapper(), &version("v1.16.0"), &options)
            .await
            .unwrap();

        assert!(!outcome.is_written());
        assert!(outcome.report.has_mappings());
        assert!(outcome.report.manifest.contains("apps/v1"));

        let counts = storage.operation_counts();
        assert_eq!(counts.updates, 0);
        assert_eq!(counts.creates, 0);
    }

    #[tokio::test]
    async fn test_map_release_cluster_too_old() {
        let storage = MemoryDriver::with_releases([HelmRelease::new("web", "default", 1, DEPRECATED)]);
        let options = MapOptions::new("web", "default");

        let outcome = map_release(&storage, &mapper(), &version("v1.8.0"), &options)
            .await
            .unwrap();

        assert!(!outcome.is_written());
        assert!(!outcome.report.skipped.is_empty());
    }

    fn deployed_versions(storage: &MemoryDriver) -> Vec<u32> {
        storage
            .all_releases()
            .into_iter()
            .filter(HelmRelease::is_deployed)
            .map(|release| release.version)
            .collect()
    }

    #[tokio::test]
    async fn test_map_release_uses_latest_deployed() {
        let mut v1 = HelmRelease::new("web", "default", 1, CURRENT);
        v1.mark_superseded();
        let mut v3 = HelmRelease::new("web", "default", 3, CURRENT);
        v3.info.status = ReleaseStatus::Failed;
        let storage = MemoryDriver::with_releases([
            v1,
            HelmRelease::new("web", "default", 2, DEPRECATED),
            v3,
        ]);

        let outcome = map_release(
            &storage,
            &mapper(),
            &version("v1.16.0"),
            &MapOptions::new("web", "default"),
        )
        .await
        .unwrap();

        // numbered after the failed revision 3, mapped from deployed revision 2
        assert_eq!(outcome.release.version, 2);
        assert_eq!(outcome.written, Some(4));
        assert_eq!(deployed_versions(&storage), vec![4]);

        let failed = storage.get("default", "web", 3).await.unwrap();
        assert_eq!(failed.info.status, ReleaseStatus::Failed);
        let new = storage.get("default", "web", 4).await.unwrap();
        assert!(new.manifest.contains("apiVersion: apps/v1"));
    }

    #[tokio::test]
    async fn test_map_release_after_failed_upgrade() {
        let mut v2 = HelmRelease::new("web", "default", 2, DEPRECATED);
        v2.info.status = ReleaseStatus::Failed;
        let storage = MemoryDriver::with_releases([
            HelmRelease::new("web", "default", 1, DEPRECATED),
            v2,
        ]);

        let outcome = map_release(
            &storage,
            &mapper(),
            &version("v1.22.0"),
            &MapOptions::new("web", "default"),
        )
        .await
        .unwrap();

        assert_eq!(outcome.release.version, 1);
        assert_eq!(outcome.written, Some(3));
        assert_eq!(deployed_versions(&storage), vec![3]);

        // a second run finds revision 3 current and leaves it alone
        let again = map_release(
            &storage,
            &mapper(),
            &version("v1.22.0"),
            &MapOptions::new("web", "default"),
        )
        .await
        .unwrap();
        assert_eq!(again.release.version, 3);
        assert!(!again.is_written());
        assert_eq!(deployed_versions(&storage), vec![3]);
    }

    /// Memory storage whose creates always fail
    struct RejectingCreates(MemoryDriver);

    #[async_trait::async_trait]
    impl StorageDriver for RejectingCreates {
        async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<HelmRelease> {
            self.0.get(namespace, name, version).await
        }

        async fn history(&self, namespace: &str, name: &str) -> Result<Vec<HelmRelease>> {
            self.0.history(namespace, name).await
        }

        async fn create(&self, _release: &HelmRelease) -> Result<()> {
            Err(KubeError::Storage("secrets is forbidden".to_string()))
        }

        async fn update(&self, release: &HelmRelease) -> Result<()> {
            self.0.update(release).await
        }
    }

    #[tokio::test]
    async fn test_map_release_restores_deployed_when_create_fails() {
        let storage = RejectingCreates(MemoryDriver::with_releases([HelmRelease::new(
            "web",
            "default",
            1,
            DEPRECATED,
        )]));

        let result = map_release(
            &storage,
            &mapper(),
            &version("v1.16.0"),
            &MapOptions::new("web", "default"),
        )
        .await;

        assert!(matches!(result, Err(KubeError::Storage(_))));
        assert_eq!(deployed_versions(&storage.0), vec![1]);

        let v1 = storage.get("default", "web", 1).await.unwrap();
        assert_eq!(v1.manifest, DEPRECATED);
        // superseded, then restored
        assert_eq!(storage.0.operation_counts().updates, 2);
    }

    #[tokio::test]
    async fn test_map_release_not_found() {
        let storage = MemoryDriver::new();
        let result = map_release(
            &storage,
            &mapper(),
            &version("v1.16.0"),
            &MapOptions::new("missing", "default"),
        )
        .await;
        assert!(matches!(result, Err(KubeError::ReleaseNotFound { .. })));
    }
}
