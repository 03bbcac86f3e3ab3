//! Kubernetes Secrets storage driver
//!
//! Helm's default driver. Each revision is a Secret of type
//! `helm.sh/release.v1` whose `release` key holds the encoded release.

use async_trait::async_trait;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
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

/// Secret type Helm uses for release records
pub const SECRET_TYPE: &str = "helm.sh/release.v1";

/// Kubernetes Secrets storage driver
pub struct SecretsDriver {
    client: Client,
}

impl SecretsDriver {
    /// Create a driver using an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Get the Secret API for a namespace
    fn secrets_api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Build a Secret from a release
    fn build_secret(release: &HelmRelease) -> Result<Secret> {
        let encoded = encode_release(release)?;

        let mut data = BTreeMap::new();
        data.insert(RELEASE_KEY.to_string(), ByteString(encoded.into_bytes()));

        Ok(Secret {
            metadata: ObjectMeta {
                name: Some(release.storage_key()),
                namespace: Some(release.namespace.clone()),
                labels: Some(storage_labels(release)),
                ..Default::default()
            },
            type_: Some(SECRET_TYPE.to_string()),
            data: Some(data),
            ..Default::default()
        })
    }

    /// Parse a release from a Secret
    fn parse_secret(secret: &Secret) -> Result<HelmRelease> {
        let data = secret
            .data
            .as_ref()
            .and_then(|d| d.get(RELEASE_KEY))
            .ok_or_else(|| KubeError::Storage("Secret missing 'release' data".to_string()))?;

        let encoded = std::str::from_utf8(&data.0)
            .map_err(|e| KubeError::Storage(format!("Invalid UTF-8 in secret: {}", e)))?;

        decode_release(encoded)
    }
}

#[async_trait]
impl StorageDriver for SecretsDriver {
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<HelmRelease> {
        match self.secrets_api(namespace).get(&storage_key(name, version)).await {
            Ok(secret) => Self::parse_secret(&secret),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(KubeError::ReleaseNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<HelmRelease>> {
        let lp = ListParams::default().labels(&release_selector(name));
        let secrets = self.secrets_api(namespace).list(&lp).await?;

        let mut releases = Vec::with_capacity(secrets.items.len());
        for secret in &secrets.items {
            match Self::parse_secret(secret) {
                Ok(release) => releases.push(release),
                Err(e) => tracing::warn!(
                    secret = ?secret.metadata.name,
                    error = %e,
                    "skipping unreadable release record"
                ),
            }
        }

        newest_first(releases, namespace, name)
    }

    async fn create(&self, release: &HelmRelease) -> Result<()> {
        let secret = Self::build_secret(release)?;

        match self
            .secrets_api(&release.namespace)
            .create(&PostParams::default(), &secret)
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
        let secret = Self::build_secret(release)?;
        self.secrets_api(&release.namespace)
            .replace(&release.storage_key(), &PostParams::default(), &secret)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_parse_secret() {
        let release = HelmRelease::new("myapp", "prod", 2, "---\napiVersion: v1\nkind: Service\n");
        let secret = SecretsDriver::build_secret(&release).unwrap();

        assert_eq!(secret.metadata.name.as_deref(), Some("sh.helm.release.v1.myapp.v2"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("prod"));
        assert_eq!(secret.type_.as_deref(), Some(SECRET_TYPE));

        let labels = secret.metadata.labels.as_ref().unwrap();
        assert_eq!(labels.get("owner"), Some(&"helm".to_string()));
        assert_eq!(labels.get("version"), Some(&"2".to_string()));

        let parsed = SecretsDriver::parse_secret(&secret).unwrap();
        assert_eq!(parsed, release);
    }

    #[test]
    fn test_parse_secret_without_data() {
        let secret = Secret::default();
        assert!(matches!(
            SecretsDriver::parse_secret(&secret),
            Err(KubeError::Storage(_))
        ));
    }
}
