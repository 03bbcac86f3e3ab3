//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to load mapping file: {path}: {message}")]
    MapFileLoad { path: String, message: String },

    #[error("Invalid Kubernetes server version: '{version}'")]
    InvalidClusterVersion { version: String },

    #[error("Failed to get the deprecated or removed Kubernetes version for API: {api}")]
    InvalidRuleVersion { api: String },

    #[error("Invalid deprecated API pattern '{api}': {message}")]
    InvalidRulePattern { api: String, message: String },
}

impl CoreError {
    /// Build an `InvalidRuleVersion` error, flattening a multi-line API pattern
    pub fn invalid_rule_version(api: &str) -> Self {
        Self::InvalidRuleVersion {
            api: single_line(api),
        }
    }

    /// Build an `InvalidRulePattern` error from a regex compilation failure
    pub fn invalid_rule_pattern(api: &str, err: &regex::Error) -> Self {
        Self::InvalidRulePattern {
            api: single_line(api),
            message: err.to_string(),
        }
    }
}

/// Flatten a mapping pattern for single-line display
pub fn single_line(api: &str) -> String {
    api.trim_end().replace('\n', " ")
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Error raised for a single manifest document
///
/// These never abort the pipeline; they are collected in the
/// [`MapReport`](crate::MapReport) and the document text is emitted unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("failed to decode document #{index} ({kind}): {message}")]
    Decode {
        index: usize,
        kind: String,
        message: String,
    },

    #[error("failed to encode document #{index} ({kind}): {message}")]
    Encode {
        index: usize,
        kind: String,
        message: String,
    },
}

impl DocumentError {
    pub fn decode(index: usize, kind: Option<&str>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            index,
            kind: kind.unwrap_or("unknown").to_string(),
            message: err.to_string(),
        }
    }

    pub fn encode(index: usize, kind: Option<&str>, err: impl std::fmt::Display) -> Self {
        Self::Encode {
            index,
            kind: kind.unwrap_or("unknown").to_string(),
            message: err.to_string(),
        }
    }

    /// Index of the failing document within the split manifest
    pub fn index(&self) -> usize {
        match self {
            Self::Decode { index, .. } | Self::Encode { index, .. } => *index,
        }
    }
}
