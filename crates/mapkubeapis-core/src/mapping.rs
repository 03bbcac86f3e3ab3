//! Deprecated API mapping tables
//!
//! A mapping file lists, in order, the deprecated `apiVersion`/`kind`
//! snippets to look for and the supported snippet that replaces each one:
//!
//! ```yaml
//! mappings:
//!   - deprecatedAPI: "apiVersion: extensions/v1beta1\nkind: Deployment\n"
//!     newAPI: "apiVersion: apps/v1\nkind: Deployment\n"
//!     deprecatedInVersion: "v1.9"
//!     removedInVersion: "v1.16"
//! ```
//!
//! Patterns and versions are not validated here. The rewrite engine checks
//! them rule by rule so errors can name the offending entry.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::version::KubeVersion;

/// Built-in table of well-known Kubernetes API deprecations
const BUILTIN_MAP: &str = include_str!("../data/Map.yaml");

/// A single deprecated to supported API rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Regular expression matched against the whole manifest text
    #[serde(rename = "deprecatedAPI")]
    pub deprecated_api: String,

    /// Replacement text (may reference capture groups as `$1` or `${name}`)
    #[serde(rename = "newAPI")]
    pub new_api: String,

    /// Kubernetes version in which the API was deprecated
    #[serde(
        rename = "deprecatedInVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deprecated_in_version: Option<String>,

    /// Kubernetes version in which the API was removed
    #[serde(
        rename = "removedInVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub removed_in_version: Option<String>,
}

impl MappingRule {
    /// Create a rule that applies from the given removal version
    pub fn removed_in(deprecated_api: &str, new_api: &str, version: &str) -> Self {
        Self {
            deprecated_api: deprecated_api.to_string(),
            new_api: new_api.to_string(),
            deprecated_in_version: None,
            removed_in_version: Some(version.to_string()),
        }
    }

    /// Create a rule that applies from the given deprecation version
    pub fn deprecated_in(deprecated_api: &str, new_api: &str, version: &str) -> Self {
        Self {
            deprecated_api: deprecated_api.to_string(),
            new_api: new_api.to_string(),
            deprecated_in_version: Some(version.to_string()),
            removed_in_version: None,
        }
    }

    /// The version from which this rule applies
    ///
    /// `deprecatedInVersion` wins when set, otherwise `removedInVersion` is
    /// used. Fails with [`CoreError::InvalidRuleVersion`] when the chosen
    /// field is missing or not a valid version.
    pub fn threshold(&self) -> Result<KubeVersion> {
        let raw = self
            .deprecated_in_version
            .as_deref()
            .filter(|v| !v.is_empty())
            .or(self.removed_in_version.as_deref());

        raw.and_then(KubeVersion::parse)
            .ok_or_else(|| CoreError::invalid_rule_version(&self.deprecated_api))
    }
}

/// An ordered list of mapping rules
///
/// Rules are applied in file order, each over the output of the previous
/// ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTable {
    #[serde(default)]
    pub mappings: Vec<MappingRule>,
}

impl MappingTable {
    /// Create a table from rules
    pub fn new(mappings: Vec<MappingRule>) -> Self {
        Self { mappings }
    }

    /// Load a mapping table from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::MapFileLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            CoreError::MapFileLoad { message, .. } => CoreError::MapFileLoad {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Parse a mapping table from YAML text
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| CoreError::MapFileLoad {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// The built-in table of well-known Kubernetes deprecations
    pub fn builtin() -> Result<Self> {
        serde_yaml::from_str(BUILTIN_MAP).map_err(|e| CoreError::MapFileLoad {
            path: "<builtin>".to_string(),
            message: e.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingRule> {
        self.mappings.iter()
    }
}

impl FromIterator<MappingRule> for MappingTable {
    fn from_iter<I: IntoIterator<Item = MappingRule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
