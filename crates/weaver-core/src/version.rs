//! Version values used to pick a serializer for a type
//!
//! A [`Version`] is either a three-part release number or one of two
//! sentinels: [`Version::AllVersions`] marks a registry entry that matches
//! any version, [`Version::UnknownVersion`] marks a type whose origin does not
//! expose a version.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Version stamped on envelopes written by Weaver itself
pub const WEAVER_VERSION: Version = Version::new(0, 1, 0);

const ALL_VERSIONS: &str = "AllVersions";
const UNKNOWN_VERSION: &str = "UnknownVersion";

/// Version of a type, as reported by the type or recorded in a woven node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Version {
    /// A concrete `major.minor.patch` release
    Release { major: u64, minor: u64, patch: u64 },
    /// Wildcard entry, lowest lookup priority
    AllVersions,
    /// The type does not expose a version
    #[default]
    UnknownVersion,
}

impl Version {
    /// Create a release version
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version::Release {
            major,
            minor,
            patch,
        }
    }

    /// Whether this is a concrete release (not a sentinel)
    pub fn is_release(&self) -> bool {
        matches!(self, Version::Release { .. })
    }

    /// Parse a single numeric component
    fn component(text: &str, whole: &str) -> Result<u64, CoreError> {
        text.parse::<u64>()
            .map_err(|_| CoreError::InvalidVersion(whole.to_string()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Release {
                major,
                minor,
                patch,
            } => write!(f, "{major}.{minor}.{patch}"),
            Version::AllVersions => f.write_str(ALL_VERSIONS),
            Version::UnknownVersion => f.write_str(UNKNOWN_VERSION),
        }
    }
}

impl FromStr for Version {
    type Err = CoreError;

    /// Accepts `N`, `N.N`, `N.N.N` (missing components are 0), an optional
    /// `+build` suffix, and the two sentinel literals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed {
            ALL_VERSIONS => return Ok(Version::AllVersions),
            UNKNOWN_VERSION => return Ok(Version::UnknownVersion),
            _ => {}
        }

        let release = trimmed
            .split_once('+')
            .map(|(release, _build)| release)
            .unwrap_or(trimmed);
        if release.is_empty() {
            return Err(CoreError::InvalidVersion(s.to_string()));
        }

        let parts: Vec<&str> = release.split('.').collect();
        if parts.len() > 3 {
            return Err(CoreError::InvalidVersion(s.to_string()));
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = Self::component(part, s)?;
        }
        Ok(Version::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
