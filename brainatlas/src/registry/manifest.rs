//! Parsed form of the remote version manifest.
//!
//! The manifest is a small configparser-format document listing the latest
//! published version of every atlas, plus optional archive checksums:
//!
//! ```text
//! [atlases]
//! allen_mouse_25um = 1.2
//! allen_mouse_10um = 1.3
//!
//! [checksums]
//! allen_mouse_25um = 9f86d081884c7d659a2feaa0c55ad015...
//! ```

use std::collections::HashMap;
use std::path::Path;

use ini::Ini;

use crate::descriptor::{AtlasName, AtlasVersion};

use super::RegistryError;

/// Section listing atlas versions.
const ATLASES_SECTION: &str = "atlases";

/// Section listing optional archive checksums.
const CHECKSUMS_SECTION: &str = "checksums";

/// Latest known versions of all published atlases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionManifest {
    versions: HashMap<String, AtlasVersion>,
    checksums: HashMap<String, String>,
}

impl VersionManifest {
    /// Parse a manifest from its text form.
    ///
    /// Entries whose version does not parse are rejected: a manifest that
    /// lies about one atlas cannot be trusted for the rest.
    pub fn parse(text: &str) -> Result<Self, RegistryError> {
        let file = Ini::load_from_str(text).map_err(|e| RegistryError::Parse {
            reason: e.to_string(),
        })?;

        let mut versions = HashMap::new();
        if let Some(section) = file.section(Some(ATLASES_SECTION)) {
            for (name, value) in section.iter() {
                let version = value.parse().map_err(|_| RegistryError::Parse {
                    reason: format!("bad version {:?} for atlas {:?}", value, name),
                })?;
                versions.insert(name.to_string(), version);
            }
        }

        let mut checksums = HashMap::new();
        if let Some(section) = file.section(Some(CHECKSUMS_SECTION)) {
            for (name, value) in section.iter() {
                checksums.insert(name.to_string(), value.to_lowercase());
            }
        }

        Ok(Self {
            versions,
            checksums,
        })
    }

    /// Parse a manifest from a file on disk.
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Latest published version of one atlas, if listed.
    pub fn latest_version(&self, name: &AtlasName) -> Option<AtlasVersion> {
        self.versions.get(&name.to_string()).copied()
    }

    /// Expected SHA-256 of the atlas archive, if the publisher listed one.
    pub fn checksum(&self, name: &AtlasName) -> Option<&str> {
        self.checksums.get(&name.to_string()).map(String::as_str)
    }

    /// All listed atlases with their latest versions, unordered.
    pub fn entries(&self) -> impl Iterator<Item = (&str, AtlasVersion)> {
        self.versions.iter().map(|(name, v)| (name.as_str(), *v))
    }

    /// Number of listed atlases.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether the manifest lists no atlases.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
