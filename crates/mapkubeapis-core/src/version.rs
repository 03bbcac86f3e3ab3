//! Kubernetes version parsing and comparison
//!
//! Kubernetes reports versions such as `v1.18.3`, `v1.18.3-gke.100` or
//! `v1.18.3+k3s1`, while mapping files commonly use the short `v1.16` form.
//! [`KubeVersion`] accepts all of these and compares them with
//! semantic-version precedence.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::error::CoreError;

/// A parsed Kubernetes version
///
/// Keeps the original text for display alongside the normalized
/// [`semver::Version`] used for comparison.
#[derive(Debug, Clone)]
pub struct KubeVersion {
    raw: String,
    version: Version,
}

impl KubeVersion {
    /// Parse a version string, returning `None` if it is not valid
    ///
    /// Accepts an optional leading `v`. The short forms `MAJOR` and
    /// `MAJOR.MINOR` are padded with zeros, but only when no prerelease or
    /// build suffix is present.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if body.is_empty() {
            return None;
        }

        let core_end = body.find(['-', '+']).unwrap_or(body.len());
        let core = &body[..core_end];
        let padded = match core.split('.').count() {
            1 if core_end == body.len() => format!("{core}.0.0"),
            2 if core_end == body.len() => format!("{core}.0"),
            _ => body.to_string(),
        };

        Version::parse(&padded).ok().map(|version| Self {
            raw: trimmed.to_string(),
            version,
        })
    }

    /// The version text as originally supplied
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The normalized semantic version
    pub fn semver(&self) -> &Version {
        &self.version
    }

    /// Compare by semantic-version precedence (build metadata ignored)
    pub fn precedence(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.version, &other.version);
        (a.major, a.minor, a.patch)
            .cmp(&(b.major, b.minor, b.patch))
            .then_with(|| a.pre.cmp(&b.pre))
    }
}

impl FromStr for KubeVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::InvalidClusterVersion {
            version: s.to_string(),
        })
    }
}

impl fmt::Display for KubeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for KubeVersion {
    fn eq(&self, other: &Self) -> bool {
        self.precedence(other) == Ordering::Equal
    }
}

impl Eq for KubeVersion {}

impl PartialOrd for KubeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KubeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence(other)
    }
}

/// Check whether a string is a valid Kubernetes version
pub fn is_valid_version(s: &str) -> bool {
    KubeVersion::parse(s).is_some()
}

/// Compare two version strings
///
/// Returns `None` if either side fails to parse.
pub fn compare(a: &str, b: &str) -> Option<Ordering> {
    Some(KubeVersion::parse(a)?.cmp(&KubeVersion::parse(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_versions() {
        for v in [
            "v1.16",
            "v1.18.0",
            "1.22.3",
            "v1",
            "v1.18.3-gke.100",
            "v1.18.9-eks-d1db3c",
            "v1.21.4+k3s1",
        ] {
            assert!(is_valid_version(v), "{v} should be valid");
        }
    }

    #[test]
    fn test_invalid_versions() {
        for v in ["", "v", "latest", "v1.16-rc1", "v1.2.3.4", "v01.2.3", "1.x"] {
            assert!(!is_valid_version(v), "{v} should be invalid");
        }
    }

    #[test]
    fn test_short_form_pads_with_zero() {
        assert_eq!(compare("v1.16", "v1.16.0"), Some(Ordering::Equal));
        assert_eq!(compare("v2", "v2.0.0"), Some(Ordering::Equal));
    }

    #[test]
    fn test_compare_ordering() {
        assert_eq!(compare("v1.16", "v1.18.0"), Some(Ordering::Less));
        assert_eq!(compare("v1.22", "v1.14.0"), Some(Ordering::Greater));
        assert_eq!(compare("v1.9", "v1.10"), Some(Ordering::Less));
    }

    #[test]
    fn test_prerelease_sorts_before_release() {
        assert_eq!(compare("v1.16.0-rc.1", "v1.16.0"), Some(Ordering::Less));
    }

    #[test]
    fn test_build_metadata_ignored() {
        assert_eq!(compare("v1.21.4+k3s1", "v1.21.4"), Some(Ordering::Equal));
    }

    #[test]
    fn test_compare_invalid() {
        assert_eq!(compare("v1.16", "nope"), None);
    }

    #[test]
    fn test_from_str_error() {
        let err = "not-a-version".parse::<KubeVersion>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidClusterVersion { version } if version == "not-a-version"));
    }

    #[test]
    fn test_display_keeps_original() {
        let v: KubeVersion = "v1.16".parse().unwrap();
        assert_eq!(v.to_string(), "v1.16");
        assert_eq!(v.semver(), &Version::new(1, 16, 0));
    }
}
