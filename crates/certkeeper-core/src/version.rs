//! Semantic versions with build-metadata aware comparison
//!
//! Installed objects record the add-on version they were created with. Two
//! versions that differ only in build metadata (`v1.9.0` vs `v1.9.0+build.2`)
//! are not interchangeable: a numeric difference orders them, any other
//! difference marks them as equal-but-different so the caller can reinstall.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{CoreError, Result};

/// Outcome of comparing two versions including build metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrdering {
    Less,
    EqualExact,
    /// Same release, build metadata differs non-numerically
    EqualDifferentMetadata,
    Greater,
}

/// A parsed version along with the text it was parsed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag {
    raw: String,
    version: semver::Version,
}

impl VersionTag {
    /// Parse leniently: surrounding whitespace and a leading `v` are ignored,
    /// missing minor/patch components default to 0 and leading zeros are dropped.
    pub fn parse_tolerant(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let stripped = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let core_end = stripped.find(['-', '+']).unwrap_or(stripped.len());
        let (core, suffix) = stripped.split_at(core_end);

        let mut parts: Vec<String> = core
            .split('.')
            .map(|p| {
                let without_zeros = p.trim_start_matches('0');
                if without_zeros.is_empty() && !p.is_empty() {
                    "0".to_string()
                } else {
                    without_zeros.to_string()
                }
            })
            .collect();
        while parts.len() < 3 {
            parts.push("0".to_string());
        }

        let normalized = format!("{}{}", parts.join("."), suffix);
        let version = semver::Version::parse(&normalized).map_err(|source| CoreError::InvalidVersion {
            value: value.to_string(),
            source,
        })?;

        Ok(Self {
            raw: value.to_string(),
            version,
        })
    }

    /// The text this version was parsed from
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn version(&self) -> &semver::Version {
        &self.version
    }

    /// Four-way comparison, build metadata included
    pub fn compare(&self, other: &VersionTag) -> VersionOrdering {
        match self.version.cmp_precedence(&other.version) {
            Ordering::Less => VersionOrdering::Less,
            Ordering::Greater => VersionOrdering::Greater,
            Ordering::Equal => compare_build(
                &build_identifiers(&self.version),
                &build_identifiers(&other.version),
            ),
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn build_identifiers(version: &semver::Version) -> Vec<&str> {
    if version.build.is_empty() {
        Vec::new()
    } else {
        version.build.as_str().split('.').collect()
    }
}

fn compare_build(a: &[&str], b: &[&str]) -> VersionOrdering {
    for (x, y) in a.iter().zip(b) {
        match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(i), Ok(j)) => match i.cmp(&j) {
                Ordering::Less => return VersionOrdering::Less,
                Ordering::Greater => return VersionOrdering::Greater,
                Ordering::Equal => {}
            },
            _ if x != y => return VersionOrdering::EqualDifferentMetadata,
            _ => {}
        }
    }

    let is_numeric = |id: &str| id.parse::<u64>().is_ok();
    match a.len().cmp(&b.len()) {
        Ordering::Equal => VersionOrdering::EqualExact,
        Ordering::Greater if is_numeric(a[b.len()]) => VersionOrdering::Greater,
        Ordering::Less if is_numeric(b[a.len()]) => VersionOrdering::Less,
        _ => VersionOrdering::EqualDifferentMetadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(s: &str) -> VersionTag {
        VersionTag::parse_tolerant(s).unwrap()
    }

    #[test]
    fn test_parse_tolerant() {
        assert_eq!(tag("v1.9.0").version(), &semver::Version::new(1, 9, 0));
        assert_eq!(tag(" 1.9 ").version(), &semver::Version::new(1, 9, 0));
        assert_eq!(tag("v2").version(), &semver::Version::new(2, 0, 0));
        assert_eq!(tag("v1.09.00").version(), &semver::Version::new(1, 9, 0));
        assert_eq!(tag("v1.9.0-alpha.1").version().pre.as_str(), "alpha.1");
        assert_eq!(tag("v1.9.0+buildX").version().build.as_str(), "buildX");
        assert_eq!(tag("v1.9.0").as_str(), "v1.9.0");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = VersionTag::parse_tolerant("latest").unwrap_err();
        assert!(matches!(err, CoreError::InvalidVersion { ref value, .. } if value == "latest"));
        assert!(VersionTag::parse_tolerant("").is_err());
        assert!(VersionTag::parse_tolerant("v1.x.0").is_err());
    }

    #[test]
    fn test_compare_without_metadata() {
        assert_eq!(tag("v1.8.0").compare(&tag("v1.9.0")), VersionOrdering::Less);
        assert_eq!(tag("v1.10.0").compare(&tag("v1.9.0")), VersionOrdering::Greater);
        assert_eq!(tag("v1.9.0").compare(&tag("1.9.0")), VersionOrdering::EqualExact);
        assert_eq!(tag("v1.9.0-rc.1").compare(&tag("v1.9.0")), VersionOrdering::Less);
    }

    #[test]
    fn test_compare_metadata_only_on_one_side() {
        assert_eq!(
            tag("v1.9.0+buildX").compare(&tag("v1.9.0")),
            VersionOrdering::EqualDifferentMetadata
        );
        assert_eq!(
            tag("v1.9.0").compare(&tag("v1.9.0+buildX")),
            VersionOrdering::EqualDifferentMetadata
        );
        assert_eq!(tag("v1.9.0+1").compare(&tag("v1.9.0")), VersionOrdering::Greater);
        assert_eq!(tag("v1.9.0").compare(&tag("v1.9.0+1")), VersionOrdering::Less);
    }

    #[test]
    fn test_compare_metadata_on_both_sides() {
        assert_eq!(
            tag("v1.9.0+xyz.1").compare(&tag("v1.9.0+xyz.2")),
            VersionOrdering::Less
        );
        assert_eq!(
            tag("v1.9.0+xyz.10").compare(&tag("v1.9.0+xyz.9")),
            VersionOrdering::Greater
        );
        assert_eq!(
            tag("v1.9.0+abc").compare(&tag("v1.9.0+xyz")),
            VersionOrdering::EqualDifferentMetadata
        );
        assert_eq!(
            tag("v1.9.0+xyz.1").compare(&tag("v1.9.0+xyz.1")),
            VersionOrdering::EqualExact
        );
        assert_eq!(
            tag("v1.9.0+xyz").compare(&tag("v1.9.0+xyz.abc")),
            VersionOrdering::EqualDifferentMetadata
        );
    }

    #[test]
    fn test_metadata_ignored_when_release_differs() {
        assert_eq!(tag("v1.8.0+zzz").compare(&tag("v1.9.0+aaa")), VersionOrdering::Less);
    }
}
