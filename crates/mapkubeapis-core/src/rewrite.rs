//! Version-gated rewriting of deprecated API identifiers
//!
//! Each rule's pattern is matched against the whole manifest text, not per
//! document, so a single rule can cover an `apiVersion`/`kind` pair however
//! the resource happens to be laid out.

use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::error::{CoreError, Result};
use crate::mapping::{MappingRule, MappingTable};
use crate::version::KubeVersion;

/// A rule that matched and was applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedMapping {
    pub deprecated_api: String,
    pub new_api: String,
    pub threshold: String,
}

/// A rule that matched but was not applied because the API is still served
/// by the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedMapping {
    pub deprecated_api: String,
    pub threshold: String,
}

/// Result of running a mapping table over a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewrite {
    /// Manifest text after all applicable rules
    pub manifest: String,

    /// Rules that changed the manifest, in application order
    pub applied: Vec<AppliedMapping>,

    /// Rules that matched but whose threshold is after the cluster version
    pub skipped: Vec<SkippedMapping>,
}

impl Rewrite {
    /// Whether any rule changed the manifest
    pub fn is_modified(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Rewrite deprecated APIs in `manifest` for a cluster running `cluster_version`
///
/// Fails if the cluster version is not a valid version, or if any rule has
/// no valid threshold version or an invalid pattern.
pub fn rewrite(manifest: &str, table: &MappingTable, cluster_version: &str) -> Result<Rewrite> {
    let cluster = KubeVersion::parse(cluster_version).ok_or_else(|| {
        CoreError::InvalidClusterVersion {
            version: cluster_version.to_string(),
        }
    })?;
    rewrite_for(manifest, table, &cluster)
}

/// Same as [`rewrite`] with an already parsed cluster version
pub fn rewrite_for(manifest: &str, table: &MappingTable, cluster: &KubeVersion) -> Result<Rewrite> {
    let mut result = Rewrite {
        manifest: manifest.to_string(),
        ..Default::default()
    };

    for rule in table.iter() {
        let threshold = rule.threshold()?;
        let Some(candidate) = apply_rule(rule, &result.manifest)? else {
            continue;
        };

        info!(
            api = %rule.deprecated_api,
            replacement = %rule.new_api,
            "found deprecated or removed Kubernetes API"
        );

        if threshold > *cluster {
            info!(
                api = %rule.deprecated_api,
                threshold = %threshold,
                cluster_version = %cluster,
                "API is not deprecated or removed in this Kubernetes version, skipping"
            );
            result.skipped.push(SkippedMapping {
                deprecated_api: rule.deprecated_api.clone(),
                threshold: threshold.to_string(),
            });
        } else {
            result.manifest = candidate;
            result.applied.push(AppliedMapping {
                deprecated_api: rule.deprecated_api.clone(),
                new_api: rule.new_api.clone(),
                threshold: threshold.to_string(),
            });
        }
    }

    Ok(result)
}

/// Replace every match of the rule's pattern
///
/// Returns `None` when the text would be left unchanged.
fn apply_rule(rule: &MappingRule, text: &str) -> Result<Option<String>> {
    let re = Regex::new(&rule.deprecated_api)
        .map_err(|e| CoreError::invalid_rule_pattern(&rule.deprecated_api, &e))?;

    let replaced = re.replace_all(text, rule.new_api.as_str());
    Ok((replaced != text).then(|| replaced.into_owned()))
}
