//! Symbolic atlas identity.
//!
//! Consumers address an atlas by a symbolic name that combines the dataset
//! name with its voxel resolution, e.g. `allen_mouse_25um`. The version is
//! never part of the identity: it is resolved against the remote manifest or
//! the installed cache directory.

use std::fmt;
use std::str::FromStr;

/// Symbolic atlas identity: dataset name plus voxel resolution.
///
/// # Example
///
/// ```
/// use brainatlas::descriptor::AtlasName;
///
/// let name: AtlasName = "allen_mouse_25um".parse().unwrap();
///
/// assert_eq!(name.dataset(), "allen_mouse");
/// assert_eq!(name.resolution_um(), 25);
/// assert_eq!(name.to_string(), "allen_mouse_25um");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtlasName {
    dataset: String,
    resolution_um: u32,
}

impl AtlasName {
    /// Create an atlas name from its parts.
    ///
    /// The dataset name is normalized to lowercase.
    pub fn new(dataset: impl Into<String>, resolution_um: u32) -> Self {
        Self {
            dataset: dataset.into().to_lowercase(),
            resolution_um,
        }
    }

    /// The dataset part of the name (e.g. `allen_mouse`).
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Voxel resolution in micrometres.
    pub fn resolution_um(&self) -> u32 {
        self.resolution_um
    }
}

impl fmt::Display for AtlasName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}um", self.dataset, self.resolution_um)
    }
}

/// Error returned when a symbolic atlas name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParseError {
    given: String,
}

impl NameParseError {
    /// The rejected input.
    pub fn given(&self) -> &str {
        &self.given
    }
}

impl fmt::Display for NameParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid atlas name {:?}: expected \"{{dataset}}_{{resolution}}um\"",
            self.given
        )
    }
}

impl std::error::Error for NameParseError {}

impl FromStr for AtlasName {
    type Err = NameParseError;

    /// Parse a symbolic name of the form `{dataset}_{resolution}um`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || NameParseError {
            given: s.to_string(),
        };

        let (dataset, tail) = s.rsplit_once('_').ok_or_else(err)?;
        let digits = tail.strip_suffix("um").ok_or_else(err)?;

        if dataset.is_empty() || digits.is_empty() {
            return Err(err());
        }

        Ok(Self {
            dataset: dataset.to_lowercase(),
            resolution_um: digits.parse().map_err(|_| err())?,
        })
    }
}
