//! Centralized cache and archive naming conventions.
//!
//! This module is the single source of truth for every on-disk and remote
//! name derived from an atlas identity:
//! - Versioned cache directory names (e.g. `allen_mouse_25um_v1.2`)
//! - Archive filenames (e.g. `allen_mouse_25um_v1.2.tar.gz`)
//! - Per-region mesh paths (e.g. `meshes/567.obj`)
//!
//! All other modules should use these functions rather than constructing
//! names directly.

use std::path::{Path, PathBuf};

use super::name::AtlasName;
use super::version::AtlasVersion;

/// Filename of the atlas metadata document inside a cache entry.
pub const METADATA_FILENAME: &str = "metadata.json";

/// Filename of the flat region table inside a cache entry.
pub const STRUCTURES_FILENAME: &str = "structures.json";

/// Filename of the reference volume payload.
pub const REFERENCE_FILENAME: &str = "reference.raw.gz";

/// Filename of the annotation volume payload.
pub const ANNOTATION_FILENAME: &str = "annotation.raw.gz";

/// Filename of the hemisphere volume payload (absent for symmetric atlases).
pub const HEMISPHERES_FILENAME: &str = "hemispheres.raw.gz";

/// Directory holding per-region mesh files.
pub const MESHES_DIRNAME: &str = "meshes";

/// Filename of the remote version manifest.
pub const MANIFEST_FILENAME: &str = "last_versions.conf";

/// Generate the versioned cache directory name for an atlas.
///
/// # Example
///
/// ```
/// use brainatlas::descriptor::{versioned_dir_name, AtlasName, AtlasVersion};
///
/// let name = AtlasName::new("allen_mouse", 25);
/// assert_eq!(
///     versioned_dir_name(&name, &AtlasVersion::new(1, 2)),
///     "allen_mouse_25um_v1.2"
/// );
/// ```
pub fn versioned_dir_name(name: &AtlasName, version: &AtlasVersion) -> String {
    format!("{}_v{}", name, version)
}

/// Generate the archive filename for a versioned atlas.
///
/// # Example
///
/// ```
/// use brainatlas::descriptor::{archive_filename, AtlasName, AtlasVersion};
///
/// let name = AtlasName::new("allen_mouse", 25);
/// assert_eq!(
///     archive_filename(&name, &AtlasVersion::new(1, 2)),
///     "allen_mouse_25um_v1.2.tar.gz"
/// );
/// ```
pub fn archive_filename(name: &AtlasName, version: &AtlasVersion) -> String {
    format!("{}.tar.gz", versioned_dir_name(name, version))
}

/// Split a versioned cache directory name back into identity and version.
///
/// Returns `None` when the directory name does not follow the
/// `{name}_{resolution}um_v{major}.{minor}` convention. Cache enumeration
/// uses this to skip unrelated directories.
///
/// # Example
///
/// ```
/// use brainatlas::descriptor::{parse_versioned_dir_name, AtlasName, AtlasVersion};
///
/// let (name, version) = parse_versioned_dir_name("allen_mouse_25um_v1.2").unwrap();
/// assert_eq!(name, AtlasName::new("allen_mouse", 25));
/// assert_eq!(version, AtlasVersion::new(1, 2));
///
/// assert!(parse_versioned_dir_name("staging").is_none());
/// ```
pub fn parse_versioned_dir_name(dir_name: &str) -> Option<(AtlasName, AtlasVersion)> {
    let (name_part, version_part) = dir_name.rsplit_once("_v")?;

    let name = name_part.parse().ok()?;
    let version = version_part.parse().ok()?;

    Some((name, version))
}

/// Path of the mesh file for one region, relative to a cache entry.
///
/// A pure function of the region identifier; whether the file exists is a
/// separate question (many regions legitimately lack meshes).
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use brainatlas::descriptor::mesh_relative_path;
///
/// assert_eq!(mesh_relative_path(567), PathBuf::from("meshes/567.obj"));
/// ```
pub fn mesh_relative_path(region_id: u32) -> PathBuf {
    Path::new(MESHES_DIRNAME).join(format!("{}.obj", region_id))
}
