//! Typed view of the manifest documents the normalizer rewrites
//!
//! Only the fields that normalization touches are modelled. Everything else
//! is kept in flattened `extra` mappings so that re-encoding a decoded
//! document loses nothing. Field order on output is declaration order
//! followed by the remaining keys in their original order.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Mapping;

pub const KIND_DEPLOYMENT: &str = "Deployment";
pub const KIND_INGRESS: &str = "Ingress";

/// Annotation marking the tool that owns a resource
pub const MANAGED_BY_ANNOTATION: &str = "app.kubernetes.io/managed-by";

/// Annotation naming the Helm release that owns a resource
pub const RELEASE_NAME_ANNOTATION: &str = "meta.helm.sh/release-name";

/// Value written to [`MANAGED_BY_ANNOTATION`]
pub const MANAGED_BY_HELM: &str = "Helm";

/// Fixed set of chart labels
///
/// Unknown label keys are kept in `extra` so decoding never drops them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawLabels")]
pub struct Labels {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub heritage: Option<String>,

    #[serde(flatten)]
    pub extra: IndexMap<String, String>,
}

/// Labels as written, where a value may be null
#[derive(Deserialize)]
struct RawLabels {
    #[serde(default, deserialize_with = "empty_if_null")]
    app: Option<String>,
    #[serde(default, deserialize_with = "empty_if_null")]
    track: Option<String>,
    #[serde(default, deserialize_with = "empty_if_null")]
    tier: Option<String>,
    #[serde(default, deserialize_with = "empty_if_null")]
    chart: Option<String>,
    #[serde(default, deserialize_with = "empty_if_null")]
    release: Option<String>,
    #[serde(default, deserialize_with = "empty_if_null")]
    heritage: Option<String>,
    #[serde(flatten)]
    extra: IndexMap<String, Option<String>>,
}

impl From<RawLabels> for Labels {
    fn from(raw: RawLabels) -> Self {
        Self {
            app: raw.app,
            track: raw.track,
            tier: raw.tier,
            chart: raw.chart,
            release: raw.release,
            heritage: raw.heritage,
            extra: raw
                .extra
                .into_iter()
                .map(|(k, v)| (k, v.unwrap_or_default()))
                .collect(),
        }
    }
}

impl Labels {
    /// Get a known label by key, ignoring empty values
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "app" => self.app.as_deref(),
            "track" => self.track.as_deref(),
            "tier" => self.tier.as_deref(),
            "chart" => self.chart.as_deref(),
            "release" => self.release.as_deref(),
            "heritage" => self.heritage.as_deref(),
            other => self.extra.get(other).map(String::as_str),
        };
        value.filter(|v| !v.is_empty())
    }

    /// The same labels with only the fixed keys kept
    pub fn known_only(&self) -> Self {
        Self {
            extra: IndexMap::new(),
            ..self.clone()
        }
    }
}

// Kubernetes stores a null label or annotation value as "".

fn empty_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Some(Option::<String>::deserialize(deserializer)?.unwrap_or_default()))
}

fn optional_empty_values_if_null<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<IndexMap<String, String>>, D::Error> {
    let values = Option::<IndexMap<String, Option<String>>>::deserialize(deserializer)?;
    Ok(values.map(|values| {
        values
            .into_iter()
            .map(|(k, v)| (k, v.unwrap_or_default()))
            .collect()
    }))
}

/// Object metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,

    #[serde(
        default,
        deserialize_with = "optional_empty_values_if_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub annotations: Option<IndexMap<String, String>>,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl ObjectMeta {
    /// Get a label value, ignoring empty values
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.as_ref().and_then(|l| l.get(key))
    }
}

/// `spec.selector` of a Deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<Labels>,

    #[serde(flatten)]
    pub extra: Mapping,
}

/// `spec.template` of a Deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,

    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PodTemplate>,

    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub api_version: String,
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: DeploymentSpec,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl Deployment {
    /// Labels of the pod template, if any
    pub fn template_labels(&self) -> Option<&Labels> {
        self.spec
            .template
            .as_ref()
            .and_then(|t| t.metadata.as_ref())
            .and_then(|m| m.labels.as_ref())
    }

    /// Set `spec.selector.matchLabels`, creating the selector if needed
    pub fn set_match_labels(&mut self, labels: Labels) {
        self.spec
            .selector
            .get_or_insert_with(LabelSelector::default)
            .match_labels = Some(labels);
    }

    /// Set `spec.template.metadata.labels`, creating parents if needed
    pub fn set_template_labels(&mut self, labels: Labels) {
        self.spec
            .template
            .get_or_insert_with(PodTemplate::default)
            .metadata
            .get_or_insert_with(ObjectMeta::default)
            .labels = Some(labels);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingress {
    pub api_version: String,
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl Ingress {
    /// Set an annotation, creating the annotation map if needed
    pub fn annotate(&mut self, key: &str, value: &str) {
        self.metadata
            .annotations
            .get_or_insert_with(IndexMap::new)
            .insert(key.to_string(), value.to_string());
    }
}

/// Just enough of a document to dispatch on its kind
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default)]
    pub kind: Option<String>,
}

/// A decoded manifest document
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Deployment(Box<Deployment>),
    Ingress(Box<Ingress>),
    /// Any other kind; its text is passed through untouched
    Generic { kind: Option<String> },
}

impl Resource {
    /// Decode a document, dispatching on its `kind`
    pub fn decode(text: &str) -> std::result::Result<Self, (Option<String>, serde_yaml::Error)> {
        let meta: TypeMeta = serde_yaml::from_str(text).map_err(|e| (None, e))?;
        match meta.kind.as_deref() {
            Some(KIND_DEPLOYMENT) => serde_yaml::from_str(text)
                .map(|d| Self::Deployment(Box::new(d)))
                .map_err(|e| (meta.kind.clone(), e)),
            Some(KIND_INGRESS) => serde_yaml::from_str(text)
                .map(|i| Self::Ingress(Box::new(i)))
                .map_err(|e| (meta.kind.clone(), e)),
            _ => Ok(Self::Generic { kind: meta.kind }),
        }
    }

    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Deployment(d) => Some(&d.kind),
            Self::Ingress(i) => Some(&i.kind),
            Self::Generic { kind } => kind.as_deref(),
        }
    }

    /// Encode a Deployment or Ingress back to YAML
    ///
    /// Returns `None` for generic resources, which are never re-encoded.
    pub fn encode(&self) -> Option<std::result::Result<String, serde_yaml::Error>> {
        match self {
            Self::Deployment(d) => Some(serde_yaml::to_string(d)),
            Self::Ingress(i) => Some(serde_yaml::to_string(i)),
            Self::Generic { .. } => None,
        }
    }
}
