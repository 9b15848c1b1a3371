//! Lazy per-region mesh loading.
//!
//! Each region may ship a surface mesh at `meshes/{id}.obj`. File absence
//! is normal (most fine-grained regions have no mesh) and is reported as
//! `Ok(None)`, distinct from asking for a region that does not exist at
//! all, which is a caller error. Loaded meshes are cached per store for
//! its lifetime; the mesh count is bounded by the region count, so there
//! is no eviction.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use thiserror::Error;

use crate::descriptor::mesh_relative_path;

/// Errors loading region meshes.
#[derive(Debug, Error)]
pub enum MeshError {
    /// The identifier names no region in this atlas.
    #[error("no region {id} in this atlas")]
    UnknownRegion { id: u32 },

    /// The mesh file exists but could not be read.
    #[error("failed to read mesh {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    /// The mesh file is not valid Wavefront OBJ.
    #[error("failed to parse mesh {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// A triangulated surface mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub vertices: Vec<[f32; 3]>,

    /// Triangle faces as zero-based vertex indices.
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    /// Parse the `v`/`f` statements of a Wavefront OBJ document.
    ///
    /// Faces with more than three vertices are fan-triangulated; normals,
    /// texture coordinates, and grouping statements are ignored.
    fn parse_obj(text: &str) -> Result<Self, String> {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            let mut fields = line.split_whitespace();

            match fields.next() {
                Some("v") => {
                    let mut coord = [0.0f32; 3];
                    for slot in &mut coord {
                        *slot = fields
                            .next()
                            .and_then(|f| f.parse().ok())
                            .ok_or_else(|| format!("line {}: bad vertex", line_no + 1))?;
                    }
                    vertices.push(coord);
                }
                Some("f") => {
                    let corners: Vec<u32> = fields
                        .map(|f| parse_face_index(f, vertices.len()))
                        .collect::<Result<_, _>>()
                        .map_err(|e| format!("line {}: {}", line_no + 1, e))?;

                    if corners.len() < 3 {
                        return Err(format!("line {}: face with fewer than 3 vertices", line_no + 1));
                    }
                    for i in 1..corners.len() - 1 {
                        faces.push([corners[0], corners[i], corners[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        Ok(Self { vertices, faces })
    }
}

/// Parse one face corner (`7`, `7/1`, or `7//3`) into a zero-based index.
fn parse_face_index(field: &str, vertex_count: usize) -> Result<u32, String> {
    let index_part = field.split('/').next().unwrap_or(field);
    let index: u32 = index_part
        .parse()
        .map_err(|_| format!("bad face index {:?}", field))?;

    if index == 0 || index as usize > vertex_count {
        return Err(format!("face index {} out of range", index));
    }
    Ok(index - 1)
}

/// Lazy mesh accessor bound to one installed atlas directory.
pub struct MeshStore {
    dir: PathBuf,
    valid_ids: HashSet<u32>,
    cache: RefCell<HashMap<u32, Option<Rc<Mesh>>>>,
}

impl MeshStore {
    /// Bind a store to an atlas directory and the set of region ids the
    /// atlas taxonomy defines.
    pub fn new(dir: impl Into<PathBuf>, valid_ids: HashSet<u32>) -> Self {
        Self {
            dir: dir.into(),
            valid_ids,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The mesh for one region.
    ///
    /// `Ok(None)` means the region is valid but ships no mesh file;
    /// an unknown identifier is an error.
    pub fn mesh_for(&self, id: u32) -> Result<Option<Rc<Mesh>>, MeshError> {
        if !self.valid_ids.contains(&id) {
            return Err(MeshError::UnknownRegion { id });
        }

        if let Some(cached) = self.cache.borrow().get(&id) {
            return Ok(cached.clone());
        }

        let path = self.dir.join(mesh_relative_path(id));
        let loaded = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|source| MeshError::Io {
                path: path.clone(),
                source,
            })?;
            let mesh = Mesh::parse_obj(&text).map_err(|reason| MeshError::Parse {
                path: path.clone(),
                reason,
            })?;
            Some(Rc::new(mesh))
        } else {
            None
        };

        self.cache.borrow_mut().insert(id, loaded.clone());
        Ok(loaded)
    }

    /// Whether a mesh file is present for a region, without loading it.
    pub fn has_mesh(&self, id: u32) -> Result<bool, MeshError> {
        if !self.valid_ids.contains(&id) {
            return Err(MeshError::UnknownRegion { id });
        }
        Ok(self.dir.join(mesh_relative_path(id)).exists())
    }
}
