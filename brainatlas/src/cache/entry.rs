//! Installed cache entries.
//!
//! A cache entry is one versioned directory under the cache root. An entry
//! only counts as installed when every artifact its metadata declares is
//! actually present; a directory that fails that check is treated as
//! damaged and reinstalled on the next ensure call.

use std::path::{Path, PathBuf};

use crate::descriptor::naming::{
    ANNOTATION_FILENAME, HEMISPHERES_FILENAME, MESHES_DIRNAME, METADATA_FILENAME,
    REFERENCE_FILENAME, STRUCTURES_FILENAME,
};
use crate::descriptor::{parse_versioned_dir_name, AtlasMetadata, AtlasName, AtlasVersion};

use super::error::{CacheError, CacheResult};

/// One installed (or partially installed) atlas directory.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    dir: PathBuf,
    name: AtlasName,
    version: AtlasVersion,
    metadata: AtlasMetadata,
}

impl CacheEntry {
    /// Load an entry from a versioned cache directory.
    ///
    /// The directory name must follow the versioned naming convention and
    /// the metadata document must parse and agree with it; completeness of
    /// the remaining artifacts is a separate check.
    pub fn load(dir: &Path) -> CacheResult<Self> {
        let dir_name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CacheError::InvalidEntry {
                path: dir.to_path_buf(),
                reason: "directory has no UTF-8 name".to_string(),
            })?;

        let (name, version) =
            parse_versioned_dir_name(dir_name).ok_or_else(|| CacheError::InvalidEntry {
                path: dir.to_path_buf(),
                reason: "directory name is not a versioned atlas name".to_string(),
            })?;

        let metadata = AtlasMetadata::from_file(&dir.join(METADATA_FILENAME))?;

        if metadata.version != version {
            return Err(CacheError::InvalidEntry {
                path: dir.to_path_buf(),
                reason: format!(
                    "metadata declares version {} but the directory is named for {}",
                    metadata.version, version
                ),
            });
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            name,
            version,
            metadata,
        })
    }

    /// Directory holding this entry.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Symbolic atlas name.
    pub fn name(&self) -> &AtlasName {
        &self.name
    }

    /// Installed version.
    pub fn version(&self) -> AtlasVersion {
        self.version
    }

    /// Atlas metadata read from the entry.
    pub fn metadata(&self) -> &AtlasMetadata {
        &self.metadata
    }

    /// Artifacts declared by the metadata that are absent on disk.
    pub fn missing_artifacts(&self) -> Vec<String> {
        let mut missing = Vec::new();

        let mut require = |relative: &str| {
            if !self.dir.join(relative).exists() {
                missing.push(relative.to_string());
            }
        };

        require(STRUCTURES_FILENAME);
        require(REFERENCE_FILENAME);
        require(ANNOTATION_FILENAME);
        require(MESHES_DIRNAME);

        if !self.metadata.symmetric {
            require(HEMISPHERES_FILENAME);
        }
        for reference in &self.metadata.additional_references {
            require(&format!("{}.raw.gz", reference));
        }

        missing
    }

    /// Whether every declared artifact is present.
    pub fn is_complete(&self) -> bool {
        self.missing_artifacts().is_empty()
    }

    /// Fail with a diagnostic when any declared artifact is absent.
    pub fn validate(&self) -> CacheResult<()> {
        let missing = self.missing_artifacts();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CacheError::Incomplete {
                atlas: self.name.to_string(),
                missing,
            })
        }
    }
}
