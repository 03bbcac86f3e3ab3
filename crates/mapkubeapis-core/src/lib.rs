//! mapkubeapis Core - rewrite deprecated Kubernetes APIs in release manifests
//!
//! This crate provides the pure, synchronous mapping pipeline:
//! - `MappingTable`: ordered deprecated to supported API rules
//! - `KubeVersion`: Kubernetes version parsing and precedence
//! - `rewrite`: version-gated regex substitution over the manifest text
//! - `document`: lossless document splitting and recomposition
//! - `normalize`: Deployment label and Ingress annotation repairs
//! - `Mapper`: the whole pipeline, returning a `MapReport`

pub mod document;
pub mod error;
pub mod mapper;
pub mod mapping;
pub mod normalize;
pub mod resource;
pub mod rewrite;
pub mod version;

pub use error::{CoreError, DocumentError, Result};
pub use mapper::{MapReport, Mapper, MapperBuilder};
pub use mapping::{MappingRule, MappingTable};
pub use normalize::{DocumentOutcome, DocumentStatus, LabelStrategy};
pub use resource::{Deployment, Ingress, Labels, Resource};
pub use rewrite::{AppliedMapping, Rewrite, SkippedMapping, rewrite};
pub use version::{KubeVersion, compare, is_valid_version};

/// Release description marking a revision produced by API mapping
pub const UPGRADE_DESCRIPTION: &str =
    "Kubernetes deprecated API upgrade - DO NOT rollback from this version";
