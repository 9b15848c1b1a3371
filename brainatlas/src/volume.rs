//! Lazy, validated access to atlas volumes.
//!
//! Volumes are stored as gzip-compressed little-endian C-order payloads
//! (`reference.raw.gz`, `annotation.raw.gz`, ...). Each is decompressed on
//! first access, validated against the shape declared in the atlas
//! metadata, and kept for the lifetime of the store. The hemisphere volume
//! of a symmetric atlas is not stored at all: it is derived by bisecting
//! the annotation along the declared axis.

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use flate2::read::GzDecoder;
use ndarray::Array3;
use thiserror::Error;
use tracing::debug;

use crate::descriptor::naming::{ANNOTATION_FILENAME, HEMISPHERES_FILENAME, REFERENCE_FILENAME};
use crate::descriptor::AtlasMetadata;

/// Errors reading volume payloads from an installed atlas.
#[derive(Debug, Error)]
pub enum VolumeError {
    /// A backing file declared by the metadata is missing.
    ///
    /// The cache entry is damaged; re-running the install repairs it.
    #[error("volume file {path} is missing; reinstall the atlas")]
    MissingFile { path: PathBuf },

    /// Reading a backing file failed.
    #[error("failed to read volume {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    /// The payload is not a valid gzip stream or has a torn length.
    #[error("volume {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The payload does not match the shape declared in the metadata.
    #[error(
        "volume {volume}: declared shape {expected:?} needs {expected_voxels} voxels, \
         payload holds {actual_voxels}"
    )]
    ShapeMismatch {
        volume: String,
        expected: [usize; 3],
        expected_voxels: usize,
        actual_voxels: usize,
    },

    /// The requested secondary reference is not declared by the metadata.
    #[error("atlas declares no additional reference {name:?}")]
    UnknownReference { name: String },

    /// The declared hemisphere bisection axis is out of range.
    #[error("hemisphere axis {axis} is out of range for a 3-axis volume")]
    InvalidAxis { axis: usize },
}

/// Lazy volume accessor bound to one installed atlas directory.
///
/// Loaded arrays are cached per store instance; separate stores (and thus
/// separate atlas handles) never share state.
pub struct VolumeStore {
    dir: PathBuf,
    metadata: AtlasMetadata,
    reference: OnceCell<Array3<u16>>,
    annotation: OnceCell<Array3<u32>>,
    hemispheres: OnceCell<Array3<u8>>,
    additional: RefCell<HashMap<String, Rc<Array3<u16>>>>,
}

impl VolumeStore {
    /// Bind a store to an installed atlas directory.
    pub fn new(dir: impl Into<PathBuf>, metadata: AtlasMetadata) -> Self {
        Self {
            dir: dir.into(),
            metadata,
            reference: OnceCell::new(),
            annotation: OnceCell::new(),
            hemispheres: OnceCell::new(),
            additional: RefCell::new(HashMap::new()),
        }
    }

    /// The reference (imaging) volume.
    pub fn reference(&self) -> Result<&Array3<u16>, VolumeError> {
        if let Some(array) = self.reference.get() {
            return Ok(array);
        }
        let array = self.load_u16(&self.dir.join(REFERENCE_FILENAME), "reference")?;
        Ok(self.reference.get_or_init(|| array))
    }

    /// The annotation volume; each voxel holds a region identifier.
    pub fn annotation(&self) -> Result<&Array3<u32>, VolumeError> {
        if let Some(array) = self.annotation.get() {
            return Ok(array);
        }
        let path = self.dir.join(ANNOTATION_FILENAME);
        let bytes = read_gz_payload(&path)?;
        let voxels = decode_u32(&bytes).ok_or_else(|| VolumeError::Corrupt {
            path,
            reason: "payload length is not a multiple of the element size".to_string(),
        })?;
        let array = self.into_array("annotation", voxels)?;
        Ok(self.annotation.get_or_init(|| array))
    }

    /// The hemisphere volume.
    ///
    /// A stored `hemispheres.raw.gz` wins when present. Symmetric atlases
    /// ship none; the volume is derived once by bisecting the annotation
    /// along the declared axis, labeling the halves with the declared left
    /// and right codes and leaving unannotated voxels at zero.
    pub fn hemispheres(&self) -> Result<&Array3<u8>, VolumeError> {
        if let Some(array) = self.hemispheres.get() {
            return Ok(array);
        }

        let path = self.dir.join(HEMISPHERES_FILENAME);
        let array = if path.exists() {
            let bytes = read_gz_payload(&path)?;
            self.into_array("hemispheres", bytes)?
        } else if self.metadata.symmetric {
            debug!("deriving hemisphere volume for symmetric atlas");
            self.derive_hemispheres()?
        } else {
            return Err(VolumeError::MissingFile { path });
        };

        Ok(self.hemispheres.get_or_init(|| array))
    }

    /// A secondary reference volume declared in the metadata.
    pub fn additional_reference(&self, name: &str) -> Result<Rc<Array3<u16>>, VolumeError> {
        if !self
            .metadata
            .additional_references
            .iter()
            .any(|r| r == name)
        {
            return Err(VolumeError::UnknownReference {
                name: name.to_string(),
            });
        }

        if let Some(array) = self.additional.borrow().get(name) {
            return Ok(Rc::clone(array));
        }

        let path = self.dir.join(format!("{}.raw.gz", name));
        let array = Rc::new(self.load_u16(&path, name)?);
        self.additional
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&array));
        Ok(array)
    }

    fn load_u16(&self, path: &Path, volume: &str) -> Result<Array3<u16>, VolumeError> {
        let bytes = read_gz_payload(path)?;
        let voxels = decode_u16(&bytes).ok_or_else(|| VolumeError::Corrupt {
            path: path.to_path_buf(),
            reason: "payload length is not a multiple of the element size".to_string(),
        })?;
        self.into_array(volume, voxels)
    }

    /// Shape-check a decoded voxel vector against the declared metadata
    /// shape and reshape it.
    fn into_array<T>(&self, volume: &str, voxels: Vec<T>) -> Result<Array3<T>, VolumeError> {
        let shape = self.metadata.shape;
        let expected_voxels = self.metadata.voxel_count();

        if voxels.len() != expected_voxels {
            return Err(VolumeError::ShapeMismatch {
                volume: volume.to_string(),
                expected: shape,
                expected_voxels,
                actual_voxels: voxels.len(),
            });
        }

        Array3::from_shape_vec((shape[0], shape[1], shape[2]), voxels).map_err(|e| {
            VolumeError::Corrupt {
                path: self.dir.join(volume),
                reason: e.to_string(),
            }
        })
    }

    fn derive_hemispheres(&self) -> Result<Array3<u8>, VolumeError> {
        let convention = self.metadata.hemispheres;
        if convention.axis >= 3 {
            return Err(VolumeError::InvalidAxis {
                axis: convention.axis,
            });
        }

        let annotation = self.annotation()?;
        let extent = annotation.shape()[convention.axis];
        let mid = extent / 2;

        let mut hemispheres = Array3::zeros(annotation.raw_dim());
        for ((i, j, k), &value) in annotation.indexed_iter() {
            if value == 0 {
                continue;
            }
            let along_axis = [i, j, k][convention.axis];
            hemispheres[[i, j, k]] = if along_axis < mid {
                convention.left
            } else {
                convention.right
            };
        }

        Ok(hemispheres)
    }
}

/// Read and decompress one `.raw.gz` payload.
fn read_gz_payload(path: &Path) -> Result<Vec<u8>, VolumeError> {
    let file = std::fs::File::open(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            VolumeError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            VolumeError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let mut bytes = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut bytes)
        .map_err(|e| VolumeError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(bytes)
}

fn decode_u16(bytes: &[u8]) -> Option<Vec<u16>> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect(),
    )
}

fn decode_u32(bytes: &[u8]) -> Option<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
