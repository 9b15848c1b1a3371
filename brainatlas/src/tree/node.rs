//! Region nodes and their flat-table form.
//!
//! Atlases ship their taxonomy as a flat JSON table (`structures.json`);
//! each row carries the full root-to-node identifier path, so the tree
//! shape is implicit in the rows. [`RegionRecord`] is the serialized row,
//! [`RegionNode`] the validated in-tree form.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::StructuralError;

/// One row of the flat region table.
///
/// # Example
///
/// ```
/// use brainatlas::tree::RegionRecord;
///
/// let json = r#"{
///     "id": 567,
///     "acronym": "CH",
///     "name": "Cerebrum",
///     "structure_id_path": [997, 8, 567],
///     "rgb_triplet": [176, 240, 255]
/// }"#;
///
/// let record: RegionRecord = serde_json::from_str(json).unwrap();
/// assert_eq!(record.id, 567);
/// assert_eq!(record.structure_id_path.last(), Some(&567));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRecord {
    /// Region identifier, unique within an atlas.
    pub id: u32,

    /// Short unique label (e.g. `CTX`).
    pub acronym: String,

    /// Full display name.
    pub name: String,

    /// Identifier path from the root to this region, inclusive.
    pub structure_id_path: Vec<u32>,

    /// Display color.
    pub rgb_triplet: [u8; 3],
}

/// Read a flat region table from a `structures.json` file.
pub fn read_region_records(path: &Path) -> Result<Vec<RegionRecord>, StructuralError> {
    let text = fs::read_to_string(path).map_err(|source| StructuralError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&text).map_err(|source| StructuralError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// One anatomical region inside a validated [`RegionTree`].
///
/// Immutable after the tree is built.
///
/// [`RegionTree`]: super::RegionTree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionNode {
    id: u32,
    acronym: String,
    name: String,
    rgb: [u8; 3],
    path: Vec<u32>,
}

impl RegionNode {
    pub(super) fn from_record(record: RegionRecord) -> Self {
        Self {
            id: record.id,
            acronym: record.acronym,
            name: record.name,
            rgb: record.rgb_triplet,
            path: record.structure_id_path,
        }
    }

    pub(super) fn to_record(&self) -> RegionRecord {
        RegionRecord {
            id: self.id,
            acronym: self.acronym.clone(),
            name: self.name.clone(),
            structure_id_path: self.path.clone(),
            rgb_triplet: self.rgb,
        }
    }

    /// Region identifier.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Short unique label.
    pub fn acronym(&self) -> &str {
        &self.acronym
    }

    /// Full display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display color.
    pub fn rgb(&self) -> [u8; 3] {
        self.rgb
    }

    /// Identifier path from the root to this region, inclusive.
    pub fn path(&self) -> &[u32] {
        &self.path
    }

    /// Identifier of the immediate parent; `None` for the root.
    pub fn parent_id(&self) -> Option<u32> {
        match self.path.len() {
            0 | 1 => None,
            n => Some(self.path[n - 2]),
        }
    }

    /// Distance from the root; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}
