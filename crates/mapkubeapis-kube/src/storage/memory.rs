//! In-memory storage driver
//!
//! Keeps releases in process, for unit tests and for mapping a release
//! record that was loaded from somewhere other than a cluster.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::StorageDriver;
use crate::error::{KubeError, Result};
use crate::release::HelmRelease;

/// namespace -> name -> version -> release
type Store = HashMap<String, HashMap<String, HashMap<u32, HelmRelease>>>;

/// In-memory storage driver
#[derive(Clone, Default)]
pub struct MemoryDriver {
    store: Arc<RwLock<Store>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
}

/// Counts of operations performed, for test assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub lists: usize,
    pub creates: usize,
    pub updates: usize,
}

impl MemoryDriver {
    /// Create a new empty driver
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated releases
    pub fn with_releases(releases: impl IntoIterator<Item = HelmRelease>) -> Self {
        let mut store = Store::new();
        for release in releases {
            store
                .entry(release.namespace.clone())
                .or_default()
                .entry(release.name.clone())
                .or_default()
                .insert(release.version, release);
        }
        Self {
            store: Arc::new(RwLock::new(store)),
            operations: Arc::default(),
        }
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations
            .read()
            .map(|ops| ops.clone())
            .unwrap_or_default()
    }

    /// All stored releases, in no particular order
    pub fn all_releases(&self) -> Vec<HelmRelease> {
        match self.store.read() {
            Ok(store) => store
                .values()
                .flat_map(|ns| ns.values())
                .flat_map(|versions| versions.values())
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Store>> {
        self.store
            .read()
            .map_err(|_| KubeError::Storage("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Store>> {
        self.store
            .write()
            .map_err(|_| KubeError::Storage("memory store lock poisoned".to_string()))
    }

    fn count(&self, f: impl FnOnce(&mut OperationCounts)) {
        if let Ok(mut ops) = self.operations.write() {
            f(&mut *ops);
        }
    }
}

#[async_trait]
impl StorageDriver for MemoryDriver {
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<HelmRelease> {
        self.count(|ops| ops.gets += 1);

        self.read()?
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .and_then(|versions| versions.get(&version))
            .cloned()
            .ok_or_else(|| KubeError::ReleaseNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            })
    }

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<HelmRelease>> {
        self.count(|ops| ops.lists += 1);

        let releases: Vec<HelmRelease> = self
            .read()?
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .map(|versions| versions.values().cloned().collect())
            .unwrap_or_default();

        super::newest_first(releases, namespace, name)
    }

    async fn create(&self, release: &HelmRelease) -> Result<()> {
        self.count(|ops| ops.creates += 1);

        let mut store = self.write()?;
        let versions = store
            .entry(release.namespace.clone())
            .or_default()
            .entry(release.name.clone())
            .or_default();

        if versions.contains_key(&release.version) {
            return Err(KubeError::ReleaseAlreadyExists {
                name: release.name.clone(),
                namespace: release.namespace.clone(),
                version: release.version,
            });
        }

        versions.insert(release.version, release.clone());
        Ok(())
    }

    async fn update(&self, release: &HelmRelease) -> Result<()> {
        self.count(|ops| ops.updates += 1);

        let mut store = self.write()?;
        let slot = store
            .get_mut(&release.namespace)
            .and_then(|ns| ns.get_mut(&release.name))
            .and_then(|versions| versions.get_mut(&release.version))
            .ok_or_else(|| KubeError::ReleaseNotFound {
                name: release.name.clone(),
                namespace: release.namespace.clone(),
            })?;

        *slot = release.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseStatus;

    fn release(name: &str, namespace: &str, version: u32) -> HelmRelease {
        HelmRelease::new(name, namespace, version, "apiVersion: v1\nkind: ConfigMap")
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let driver = MemoryDriver::new();

        driver.create(&release("myapp", "default", 1)).await.unwrap();

        let retrieved = driver.get("default", "myapp", 1).await.unwrap();
        assert_eq!(retrieved.name, "myapp");
        assert_eq!(retrieved.version, 1);

        let counts = driver.operation_counts();
        assert_eq!(counts.creates, 1);
        assert_eq!(counts.gets, 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let driver = MemoryDriver::new();
        let r = release("myapp", "default", 1);
        driver.create(&r).await.unwrap();

        let result = driver.create(&r).await;
        assert!(matches!(
            result,
            Err(KubeError::ReleaseAlreadyExists { version: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let driver = MemoryDriver::new();
        let result = driver.get("default", "nonexistent", 1).await;
        assert!(matches!(result, Err(KubeError::ReleaseNotFound { .. })));
    }

    #[tokio::test]
    async fn test_history_is_scoped_and_sorted() {
        let driver = MemoryDriver::with_releases([
            release("myapp", "default", 1),
            release("myapp", "default", 3),
            release("myapp", "default", 2),
            release("myapp", "staging", 7),
            release("other", "default", 9),
        ]);

        let history = driver.history("default", "myapp").await.unwrap();
        let versions: Vec<u32> = history.iter().map(|r| r.version).collect();
        assert_eq!(versions, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_update_replaces_revision() {
        let driver = MemoryDriver::with_releases([release("myapp", "default", 1)]);

        let mut r = driver.get("default", "myapp", 1).await.unwrap();
        r.mark_superseded();
        driver.update(&r).await.unwrap();

        let stored = driver.get("default", "myapp", 1).await.unwrap();
        assert_eq!(stored.info.status, ReleaseStatus::Superseded);
        assert_eq!(driver.all_releases().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_revision_fails() {
        let driver = MemoryDriver::new();
        let result = driver.update(&release("myapp", "default", 1)).await;
        assert!(matches!(result, Err(KubeError::ReleaseNotFound { .. })));
    }

    #[tokio::test]
    async fn test_last_deployed_skips_newer_failed_revision() {
        let mut failed = release("myapp", "default", 3);
        failed.info.status = ReleaseStatus::Failed;
        let mut old = release("myapp", "default", 1);
        old.mark_superseded();

        let driver = MemoryDriver::with_releases([old, release("myapp", "default", 2), failed]);

        let deployed = driver.last_deployed("default", "myapp").await.unwrap();
        assert_eq!(deployed.version, 2);
    }

    #[tokio::test]
    async fn test_last_deployed_none() {
        let mut r = release("myapp", "default", 1);
        r.info.status = ReleaseStatus::Uninstalled;
        let driver = MemoryDriver::with_releases([r]);

        let result = driver.last_deployed("default", "myapp").await;
        assert!(matches!(result, Err(KubeError::ReleaseNotDeployed { .. })));
    }
}
