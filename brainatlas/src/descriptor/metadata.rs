//! Atlas metadata document.
//!
//! Every cache entry carries a `metadata.json` describing the packaged
//! dataset: citation, spatial layout, declared volume shape, and the
//! hemisphere labeling convention. The document is immutable once written
//! by the packaging pipeline; this module only reads it.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::version::AtlasVersion;

/// Integer codes and bisection axis used for hemisphere labeling.
///
/// Part of the atlas metadata rather than hardcoded, so packages for
/// species with unusual axis conventions can declare their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HemisphereConvention {
    /// Index of the axis the brain is bisected along.
    pub axis: usize,

    /// Label written to voxels in the first half along the axis.
    pub left: u8,

    /// Label written to voxels in the second half along the axis.
    pub right: u8,
}

impl Default for HemisphereConvention {
    fn default() -> Self {
        // Third axis is left-right in the standard packaging orientation.
        Self {
            axis: 2,
            left: 1,
            right: 2,
        }
    }
}

/// Metadata describing one packaged atlas.
///
/// Deserialized from the `metadata.json` inside a cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasMetadata {
    /// Dataset name without resolution or version (e.g. `allen_mouse`).
    pub name: String,

    /// Citation for the source dataset, or `"unpublished"`.
    pub citation: String,

    /// URL of the source dataset.
    pub atlas_link: String,

    /// Species formatted as `"CommonName (Genus species)"`.
    pub species: String,

    /// Whether the dataset is left-right symmetric.
    ///
    /// Symmetric atlases ship no hemisphere volume; it is derived on first
    /// access by bisecting the annotation.
    pub symmetric: bool,

    /// Voxel size along each axis, in micrometres.
    pub resolution: [f64; 3],

    /// Axis orientation convention (e.g. `"asr"`).
    pub orientation: String,

    /// Packaged atlas version.
    pub version: AtlasVersion,

    /// Declared shape of every volume in the package, in voxels.
    pub shape: [usize; 3],

    /// Names of secondary reference volumes shipped alongside the primary
    /// one, each stored as `{name}.raw.gz`.
    #[serde(default)]
    pub additional_references: Vec<String>,

    /// Hemisphere labeling convention.
    #[serde(default)]
    pub hemispheres: HemisphereConvention,
}

impl AtlasMetadata {
    /// Read and parse a `metadata.json` file.
    pub fn from_file(path: &Path) -> Result<Self, MetadataError> {
        let text = fs::read_to_string(path).map_err(|source| MetadataError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| MetadataError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Total number of voxels declared for each volume.
    pub fn voxel_count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Errors reading or parsing an atlas metadata document.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The metadata file could not be read.
    #[error("failed to read metadata {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: io::Error,
    },

    /// The metadata file is not valid JSON or misses required fields.
    #[error("failed to parse metadata {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },
}
