//! Kind-specific repairs applied after API rewriting
//!
//! Newer Deployment APIs require the selector to match the pod template
//! labels and treat it as immutable, and Helm 3 adopts an Ingress only when
//! it carries ownership annotations. Normalization runs in two passes: every
//! segment is decoded once, the Deployment label union is computed from the
//! decoded set, then each document is rewritten from that immutable value.
//!
//! Failures are per document. The original text is emitted and the error is
//! recorded in the outcome list.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, warn};

use crate::document::{self, SEPARATOR};
use crate::error::DocumentError;
use crate::resource::{
    Deployment, Ingress, Labels, MANAGED_BY_ANNOTATION, MANAGED_BY_HELM,
    RELEASE_NAME_ANNOTATION, Resource,
};

/// How Deployment labels are repaired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelStrategy {
    /// Compute one label set across all Deployments and apply it to
    /// `metadata.labels`, `spec.selector.matchLabels` and
    /// `spec.template.metadata.labels`
    #[default]
    Union,

    /// Copy `spec.template.metadata.labels` into `spec.selector.matchLabels`
    Selector,
}

impl fmt::Display for LabelStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Union => write!(f, "union"),
            Self::Selector => write!(f, "selector"),
        }
    }
}

impl FromStr for LabelStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "union" => Ok(Self::Union),
            "selector" => Ok(Self::Selector),
            _ => Err(format!(
                "unknown label strategy '{}', expected 'union' or 'selector'",
                s
            )),
        }
    }
}

/// What happened to one manifest segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    /// No `apiVersion`; comments or a stray separator
    Empty,
    /// Passed through as-is
    Unchanged,
    /// Decoded, repaired and re-encoded
    Normalized,
    /// Passed through as-is after a decode or encode failure
    Failed(DocumentError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOutcome {
    /// Position of the segment in the split manifest
    pub index: usize,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub status: DocumentStatus,
}

impl DocumentOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, DocumentStatus::Failed(_))
    }

    /// Short display name, `Kind/name`
    pub fn display_name(&self) -> String {
        format!(
            "{}/{}",
            self.kind.as_deref().unwrap_or("unknown"),
            self.name.as_deref().unwrap_or("unnamed")
        )
    }
}

/// A normalized manifest and the per-document outcomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub manifest: String,
    pub documents: Vec<DocumentOutcome>,
}

/// Result of the decode pass for one segment
enum Decoded {
    Empty,
    Resource(Resource),
    Failed(DocumentError),
}

/// Normalize every Deployment and Ingress in a manifest
pub fn normalize_manifest(text: &str, strategy: LabelStrategy) -> Normalized {
    let segments = document::split(text);
    let decoded: Vec<Decoded> = segments
        .iter()
        .enumerate()
        .map(|(index, segment)| decode_segment(index, segment))
        .collect();

    let union = match strategy {
        LabelStrategy::Union => Some(union_labels(decoded.iter().filter_map(|d| match d {
            Decoded::Resource(Resource::Deployment(deployment)) => Some(deployment.as_ref()),
            _ => None,
        }))),
        LabelStrategy::Selector => None,
    };

    let mut rendered = Vec::with_capacity(segments.len());
    let mut documents = Vec::with_capacity(segments.len());

    for (index, (segment, decoded)) in segments.iter().zip(decoded).enumerate() {
        let (text, outcome) = match decoded {
            Decoded::Empty => (
                segment.to_string(),
                outcome(index, None, None, DocumentStatus::Empty),
            ),
            Decoded::Failed(err) => {
                let kind = match &err {
                    DocumentError::Decode { kind, .. } | DocumentError::Encode { kind, .. } => {
                        Some(kind.clone())
                    }
                };
                (
                    segment.to_string(),
                    outcome(index, kind, None, DocumentStatus::Failed(err)),
                )
            }
            Decoded::Resource(mut resource) => {
                let kind = resource.kind().map(str::to_string);
                let name = resource_name(&resource);

                match &mut resource {
                    Resource::Deployment(deployment) => {
                        normalize_deployment(deployment, union.as_ref())
                    }
                    Resource::Ingress(ingress) => normalize_ingress(ingress),
                    Resource::Generic { .. } => {}
                }

                match resource.encode() {
                    None => (
                        segment.to_string(),
                        outcome(index, kind, name, DocumentStatus::Unchanged),
                    ),
                    Some(Ok(encoded)) => {
                        debug!(index, kind = ?kind, name = ?name, "normalized document");
                        let mut body = document::render_segment(segment, &encoded);
                        if index == 0 {
                            body.insert_str(0, SEPARATOR);
                        }
                        (body, outcome(index, kind, name, DocumentStatus::Normalized))
                    }
                    Some(Err(e)) => {
                        let err = DocumentError::encode(index, kind.as_deref(), e);
                        warn!(index, error = %err, "keeping original document text");
                        (
                            segment.to_string(),
                            outcome(index, kind, name, DocumentStatus::Failed(err)),
                        )
                    }
                }
            }
        };
        rendered.push(text);
        documents.push(outcome);
    }

    Normalized {
        manifest: document::recompose(&rendered),
        documents,
    }
}

fn decode_segment(index: usize, segment: &str) -> Decoded {
    if !document::is_resource(segment) {
        return Decoded::Empty;
    }
    match Resource::decode(segment) {
        Ok(resource) => Decoded::Resource(resource),
        Err((kind, e)) => {
            let err = DocumentError::decode(index, kind.as_deref(), e);
            warn!(index, error = %err, "keeping original document text");
            Decoded::Failed(err)
        }
    }
}

fn outcome(
    index: usize,
    kind: Option<String>,
    name: Option<String>,
    status: DocumentStatus,
) -> DocumentOutcome {
    DocumentOutcome {
        index,
        kind,
        name,
        status,
    }
}

fn resource_name(resource: &Resource) -> Option<String> {
    match resource {
        Resource::Deployment(d) => d.metadata.name.clone(),
        Resource::Ingress(i) => i.metadata.name.clone(),
        Resource::Generic { .. } => None,
    }
}

/// Compute the label set shared by every Deployment of a release
///
/// `tier`, `track` and `heritage` are fixed. `app`, `chart` and `release`
/// each come from the first Deployment that has a non-empty value, read from
/// `metadata.labels` and then from the pod template labels.
pub fn union_labels<'a>(deployments: impl IntoIterator<Item = &'a Deployment>) -> Labels {
    let mut labels = Labels {
        tier: Some("web".to_string()),
        track: Some("stable".to_string()),
        heritage: Some("Tiller".to_string()),
        ..Default::default()
    };

    for deployment in deployments {
        let candidate = |key: &str| {
            deployment
                .metadata
                .label(key)
                .or_else(|| deployment.template_labels().and_then(|l| l.get(key)))
                .map(str::to_string)
        };

        if labels.app.is_none() {
            labels.app = candidate("app");
        }
        if labels.chart.is_none() {
            labels.chart = candidate("chart");
        }
        if labels.release.is_none() {
            labels.release = candidate("release");
        }
        if labels.app.is_some() && labels.chart.is_some() && labels.release.is_some() {
            break;
        }
    }

    labels
}

/// Repair Deployment labels
///
/// With a union label set the set is applied uniformly; extra keys already
/// present in `metadata.labels` are kept. Without one, the selector is
/// copied from the pod template labels when those exist.
pub fn normalize_deployment(deployment: &mut Deployment, union: Option<&Labels>) {
    match union {
        Some(union) => {
            let mut metadata_labels = union.clone();
            if let Some(existing) = &deployment.metadata.labels {
                metadata_labels.extra = existing.extra.clone();
            }
            deployment.metadata.labels = Some(metadata_labels);
            deployment.set_match_labels(union.known_only());
            deployment.set_template_labels(union.known_only());
        }
        None => {
            if let Some(template_labels) = deployment.template_labels().cloned() {
                deployment.set_match_labels(template_labels);
            }
        }
    }
}

/// Add the Helm ownership annotations to an Ingress
pub fn normalize_ingress(ingress: &mut Ingress) {
    ingress.annotate(MANAGED_BY_ANNOTATION, MANAGED_BY_HELM);
    if let Some(release) = ingress.metadata.label("release").map(str::to_string) {
        ingress.annotate(RELEASE_NAME_ANNOTATION, &release);
    }
}
