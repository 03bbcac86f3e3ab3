//! The full mapping pipeline
//!
//! Rewrite deprecated APIs across the whole manifest, then split it into
//! documents, normalize the kinds that need it, and put it back together.

use crate::error::{CoreError, Result};
use crate::mapping::MappingTable;
use crate::normalize::{self, DocumentOutcome, LabelStrategy};
use crate::rewrite::{self, AppliedMapping, SkippedMapping};
use crate::version::KubeVersion;

/// Mapper builder
pub struct MapperBuilder {
    table: MappingTable,
    label_strategy: LabelStrategy,
}

impl MapperBuilder {
    pub fn new(table: MappingTable) -> Self {
        Self {
            table,
            label_strategy: LabelStrategy::default(),
        }
    }

    /// Set how Deployment labels are repaired
    pub fn label_strategy(mut self, strategy: LabelStrategy) -> Self {
        self.label_strategy = strategy;
        self
    }

    /// Build the mapper
    pub fn build(self) -> Mapper {
        Mapper {
            table: self.table,
            label_strategy: self.label_strategy,
        }
    }
}

/// Maps deprecated Kubernetes APIs in release manifests
pub struct Mapper {
    table: MappingTable,
    label_strategy: LabelStrategy,
}

impl Mapper {
    /// Create a mapper with default settings
    pub fn new(table: MappingTable) -> Self {
        Self::builder(table).build()
    }

    /// Create a builder
    pub fn builder(table: MappingTable) -> MapperBuilder {
        MapperBuilder::new(table)
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    pub fn label_strategy(&self) -> LabelStrategy {
        self.label_strategy
    }

    /// Map a manifest for a cluster reporting `cluster_version`
    pub fn map(&self, manifest: &str, cluster_version: &str) -> Result<MapReport> {
        let cluster = KubeVersion::parse(cluster_version).ok_or_else(|| {
            CoreError::InvalidClusterVersion {
                version: cluster_version.to_string(),
            }
        })?;
        self.map_for(manifest, &cluster)
    }

    /// Same as [`Mapper::map`] with an already parsed cluster version
    pub fn map_for(&self, manifest: &str, cluster: &KubeVersion) -> Result<MapReport> {
        let rewritten = rewrite::rewrite_for(manifest, &self.table, cluster)?;
        let normalized = normalize::normalize_manifest(&rewritten.manifest, self.label_strategy);

        Ok(MapReport {
            manifest: normalized.manifest,
            applied: rewritten.applied,
            skipped: rewritten.skipped,
            documents: normalized.documents,
        })
    }
}

/// Everything a mapping run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapReport {
    /// Final manifest text
    pub manifest: String,

    /// Mapping rules applied, in order
    pub applied: Vec<AppliedMapping>,

    /// Mapping rules that matched but were skipped for this cluster version
    pub skipped: Vec<SkippedMapping>,

    /// One outcome per manifest segment
    pub documents: Vec<DocumentOutcome>,
}

impl MapReport {
    /// Whether any deprecated API was mapped
    pub fn has_mappings(&self) -> bool {
        !self.applied.is_empty()
    }

    /// Documents that could not be decoded or encoded
    pub fn failures(&self) -> impl Iterator<Item = &DocumentOutcome> {
        self.documents.iter().filter(|d| d.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document;
    use crate::mapping::MappingRule;
    use crate::normalize::DocumentStatus;
    use crate::resource::Resource;

    const MANIFEST: &str = "---
apiVersion: extensions/v1beta1
kind: Deployment
metadata:
  name: foo
  labels:
    app: foo
    chart: bar-1.0
    release: rel
spec:
  template:
    metadata:
      labels:
        app: foo
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: cfg
data:
  a: b
";

    fn table() -> MappingTable {
        MappingTable::new(vec![MappingRule::removed_in(
            "apiVersion: extensions/v1beta1\nkind: Deployment",
            "apiVersion: apps/v1\nkind: Deployment",
            "v1.16",
        )])
    }

    #[test]
    fn test_map_rewrites_and_normalizes() {
        let report = Mapper::new(table()).map(MANIFEST, "v1.18.0").unwrap();

        assert!(report.has_mappings());
        assert!(!report.has_failures());

        let segments = document::split(&report.manifest);
        let Resource::Deployment(deployment) = Resource::decode(segments[1]).unwrap() else {
            panic!("expected a Deployment");
        };
        assert_eq!(deployment.api_version, "apps/v1");

        let selector = deployment.spec.selector.unwrap().match_labels.unwrap();
        assert_eq!(selector.app.as_deref(), Some("foo"));
        assert_eq!(selector.chart.as_deref(), Some("bar-1.0"));
        assert_eq!(selector.release.as_deref(), Some("rel"));
        assert_eq!(selector.tier.as_deref(), Some("web"));
        assert_eq!(selector.track.as_deref(), Some("stable"));
        assert_eq!(selector.heritage.as_deref(), Some("Tiller"));

        assert_eq!(segments[2], document::split(MANIFEST)[2]);
    }

    #[test]
    fn test_map_skips_on_old_cluster() {
        let report = Mapper::new(table()).map(MANIFEST, "v1.14.0").unwrap();

        assert!(!report.has_mappings());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.manifest.contains("apiVersion: extensions/v1beta1"));
    }

    #[test]
    fn test_map_invalid_cluster_version() {
        let err = Mapper::new(table()).map(MANIFEST, "").unwrap_err();
        assert!(matches!(err, CoreError::InvalidClusterVersion { .. }));
    }

    #[test]
    fn test_builder_label_strategy() {
        let mapper = Mapper::builder(table())
            .label_strategy(LabelStrategy::Selector)
            .build();
        assert_eq!(mapper.label_strategy(), LabelStrategy::Selector);

        let report = mapper.map(MANIFEST, "v1.18.0").unwrap();
        let segments = document::split(&report.manifest);
        let Resource::Deployment(deployment) = Resource::decode(segments[1]).unwrap() else {
            panic!("expected a Deployment");
        };
        let selector = deployment.spec.selector.unwrap().match_labels.unwrap();
        assert_eq!(selector.app.as_deref(), Some("foo"));
        assert_eq!(selector.tier, None);
    }

    #[test]
    fn test_failures_are_reported_not_raised() {
        let manifest = "---\napiVersion: apps/v1\nkind: Deployment\nspec: 3\n";
        let report = Mapper::new(table()).map(manifest, "v1.18.0").unwrap();

        assert_eq!(report.manifest, manifest);
        assert_eq!(report.failures().count(), 1);
        assert!(matches!(report.documents[1].status, DocumentStatus::Failed(_)));
    }
}
