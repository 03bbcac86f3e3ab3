//! Standard exit codes for CLI operations

/// Success - operation completed without errors
#[allow(dead_code)]
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Mapping error - mapping file missing, unparsable or holding a bad rule
pub const MAPPING_ERROR: i32 = 2;

/// Version error - cluster version not a valid Kubernetes version
pub const VERSION_ERROR: i32 = 3;

/// Cluster error - kubeconfig invalid or API server unreachable
pub const CLUSTER_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Release error - release missing, not deployed or storage failure
pub const RELEASE_ERROR: i32 = 6;
