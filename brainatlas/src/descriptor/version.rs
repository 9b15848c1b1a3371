//! Two-component atlas version type.
//!
//! Packaged atlases are versioned with a `major.minor` pair. The major
//! component tracks the packaging format: two versions with the same major
//! are interchangeable for reading, while a different major means the local
//! copy must be re-fetched before use. The minor component tracks data
//! revisions within a format.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserialize, Deserializer};
use serde::{Serialize, Serializer};

/// Version of a packaged atlas.
///
/// Ordered by `(major, minor)` tuple comparison.
///
/// # Example
///
/// ```
/// use brainatlas::descriptor::AtlasVersion;
///
/// let local: AtlasVersion = "1.2".parse().unwrap();
/// let remote: AtlasVersion = "1.3".parse().unwrap();
///
/// assert!(remote > local);
/// assert!(local.is_compatible_with(&remote));
/// assert_eq!(local.to_string(), "1.2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtlasVersion {
    /// Packaging format generation.
    pub major: u32,

    /// Data revision within a format generation.
    pub minor: u32,
}

impl AtlasVersion {
    /// Create a new version.
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Whether an atlas at this version can be read by a consumer that
    /// expects `other`.
    ///
    /// Versions are compatible when the major components match; the minor
    /// component only marks data revisions.
    pub fn is_compatible_with(&self, other: &AtlasVersion) -> bool {
        self.major == other.major
    }

    /// Whether this version is an older revision of the same format as
    /// `latest`.
    ///
    /// A stale version is still readable; callers decide whether to update.
    pub fn is_stale_against(&self, latest: &AtlasVersion) -> bool {
        self.major == latest.major && self.minor < latest.minor
    }
}

impl fmt::Display for AtlasVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Error returned when a version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionParseError {
    given: String,
}

impl fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid atlas version {:?}: expected \"major.minor\"",
            self.given
        )
    }
}

impl std::error::Error for VersionParseError {}

impl FromStr for AtlasVersion {
    type Err = VersionParseError;

    /// Parse `"1.2"` or `"v1.2"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionParseError {
            given: s.to_string(),
        };

        let trimmed = s.strip_prefix('v').unwrap_or(s);
        let (major, minor) = trimmed.split_once('.').ok_or_else(err)?;

        Ok(Self {
            major: major.parse().map_err(|_| err())?,
            minor: minor.parse().map_err(|_| err())?,
        })
    }
}

impl Serialize for AtlasVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AtlasVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
