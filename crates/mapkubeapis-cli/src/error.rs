//! CLI error types with exit code handling
//!
//! Every library error is converted into a `CliError` so it can be rendered
//! by miette and mapped to a process exit code.

use mapkubeapis_core::CoreError;
use mapkubeapis_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Mapping file or rule error
    #[error("Mapping error: {message}")]
    #[diagnostic(code(mapkubeapis::cli::mapping))]
    Mapping {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Cluster version could not be parsed
    #[error("Version error: {message}")]
    #[diagnostic(code(mapkubeapis::cli::version))]
    Version {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Kubeconfig or API server error
    #[error("Cluster error: {message}")]
    #[diagnostic(code(mapkubeapis::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Release lookup or storage error
    #[error("Release error: {message}")]
    #[diagnostic(code(mapkubeapis::cli::release))]
    Release {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(mapkubeapis::cli::io))]
    Io { message: String },

    /// Anything else
    #[error("{message}")]
    #[diagnostic(code(mapkubeapis::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Mapping { .. } => exit_codes::MAPPING_ERROR,
            CliError::Version { .. } => exit_codes::VERSION_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Release { .. } => exit_codes::RELEASE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create an error with no specific category
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    fn mapping(message: impl Into<String>, help: &str) -> Self {
        Self::Mapping {
            message: message.into(),
            help: Some(help.to_string()),
        }
    }

    fn cluster(message: impl Into<String>, help: &str) -> Self {
        Self::Cluster {
            message: message.into(),
            help: Some(help.to_string()),
        }
    }

    fn release(message: impl Into<String>, help: Option<&str>) -> Self {
        Self::Release {
            message: message.into(),
            help: help.map(str::to_string),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::MapFileLoad { .. } => CliError::mapping(
                message,
                "check the --mapfile path, or omit it to use the built-in mappings",
            ),
            CoreError::InvalidRuleVersion { .. } => CliError::mapping(
                message,
                "every mapping needs a valid deprecatedInVersion or removedInVersion",
            ),
            CoreError::InvalidRulePattern { .. } => CliError::mapping(
                message,
                "deprecatedAPI is used as a regular expression; escape special characters",
            ),
            CoreError::InvalidClusterVersion { .. } => CliError::Version {
                message,
                help: Some("expected a version like v1.22 or v1.22.3".to_string()),
            },
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        let message = err.to_string();
        match err {
            KubeError::Core(core) => core.into(),
            KubeError::Kubeconfig(_) => CliError::cluster(
                message,
                "check --kubeconfig, --kube-context or the KUBECONFIG variable",
            ),
            KubeError::ClusterUnreachable(_) | KubeError::Api(_) => CliError::cluster(
                message,
                "pass --kube-version to run without contacting the cluster",
            ),
            KubeError::ReleaseNotFound { .. } => CliError::release(
                message,
                Some("check the release name, --namespace and --storage"),
            ),
            KubeError::ReleaseNotDeployed { .. } => CliError::release(
                message,
                Some("only the latest deployed revision can be mapped"),
            ),
            KubeError::ReleaseAlreadyExists { .. }
            | KubeError::Storage(_)
            | KubeError::Serialization(_)
            | KubeError::Compression(_) => CliError::release(message, None),
            _ => CliError::other(message),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_exit_codes() {
        let err: CliError = CoreError::MapFileLoad {
            path: "Map.yaml".to_string(),
            message: "not found".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::MAPPING_ERROR);

        let err: CliError = CoreError::InvalidClusterVersion {
            version: "x".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::VERSION_ERROR);
    }

    #[test]
    fn test_kube_errors_exit_codes() {
        let err: CliError = KubeError::ReleaseNotDeployed {
            name: "web".to_string(),
            namespace: "default".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::RELEASE_ERROR);

        let err: CliError = KubeError::ClusterUnreachable("timed out".to_string()).into();
        assert_eq!(err.exit_code(), exit_codes::CLUSTER_ERROR);

        let err: CliError = KubeError::Core(CoreError::InvalidClusterVersion {
            version: "x".to_string(),
        })
        .into();
        assert_eq!(err.exit_code(), exit_codes::VERSION_ERROR);

        let err: CliError = KubeError::InvalidConfig("sql".to_string()).into();
        assert_eq!(err.exit_code(), exit_codes::ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let err: CliError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);
    }
}
