//! Kubernetes ConfigMap storage driver
//!
//! Same record layout as the Secrets driver, selected by Helm with
//! `HELM_DRIVER=configmap`.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Client;
use kube::api::{Api, ListParams, PostParams};
use std::collections::BTreeMap;

use super::{
    RELEASE_KEY, StorageDriver, decode_release, encode_release, newest_first, release_selector,
    storage_labels,
};
use crate::error::{KubeError, Result};
use crate::release::{HelmRelease, storage_key};

/// Kubernetes ConfigMap storage driver
pub struct ConfigMapDriver {
    client: Client,
}

impl ConfigMapDriver {
    /// Create a driver using an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn configmaps_api(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn build_configmap(release: &HelmRelease) -> Result<ConfigMap> {
        let mut data = BTreeMap::new();
        data.insert(RELEASE_KEY.to_string(), encode_release(release)?);

        Ok(ConfigMap {
            metadata: ObjectMeta {
                name: Some(release.storage_key()),
                namespace: Some(release.namespace.clone()),
                labels: Some(storage_labels(release)),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        })
    }

    fn parse_configmap(configmap: &ConfigMap) -> Result<HelmRelease> {
        let encoded = configmap
            .data
            .as_ref()
            .and_then(|d| d.get(RELEASE_KEY))
            .ok_or_else(|| KubeError::Storage("ConfigMap missing 'release' data".to_string()))?;

        decode_release(encoded)
    }
}

#[async_trait]
impl StorageDriver for ConfigMapDriver {
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<HelmRelease> {
        match self
            .configmaps_api(namespace)
            .get(&storage_key(name, version))
            .await
        {
            Ok(configmap) => Self::parse_configmap(&configmap),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(KubeError::ReleaseNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<HelmRelease>> {
        let lp = ListParams::default().labels(&release_selector(name));
        let configmaps = self.configmaps_api(namespace).list(&lp).await?;

        let mut releases = Vec::with_capacity(configmaps.items.len());
        for configmap in &configmaps.items {
            match Self::parse_configmap(configmap) {
                Ok(release) => releases.push(release),
                Err(e) => tracing::warn!(
                    configmap = ?configmap.metadata.name,
                    error = %e,
                    "skipping unreadable release record"
                ),
            }
        }

        newest_first(releases, namespace, name)
    }

    async fn create(&self, release: &HelmRelease) -> Result<()> {
        let configmap = Self::build_configmap(release)?;

        match self
            .configmaps_api(&release.namespace)
            .create(&PostParams::default(), &configmap)
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 409 => Err(KubeError::ReleaseAlreadyExists {
                name: release.name.clone(),
                namespace: release.namespace.clone(),
                version: release.version,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, release: &HelmRelease) -> Result<()> {
        let configmap = Self::build_configmap(release)?;
        self.configmaps_api(&release.namespace)
            .replace(&release.storage_key(), &PostParams::default(), &configmap)
            .await?;
        Ok(())
    }
}
