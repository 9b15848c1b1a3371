//! Atlas identity, versioning, and metadata.
//!
//! An atlas is addressed by a symbolic name combining dataset and voxel
//! resolution ([`AtlasName`]), versioned with a two-component
//! [`AtlasVersion`], and described on disk by an [`AtlasMetadata`] document.
//! Every derived name (cache directory, archive filename, mesh path) is
//! produced by the functions in [`naming`], the single source of truth for
//! the package layout:
//!
//! ```text
//! {name}_{resolution}um_v{major}.{minor}/
//! ├── metadata.json
//! ├── structures.json
//! ├── reference.raw.gz
//! ├── annotation.raw.gz
//! ├── hemispheres.raw.gz      (asymmetric atlases only)
//! └── meshes/{id}.obj         (file absence is normal)
//! ```

mod metadata;
mod name;
pub mod naming;
mod version;

pub use metadata::{AtlasMetadata, HemisphereConvention, MetadataError};
pub use name::{AtlasName, NameParseError};
pub use naming::{
    archive_filename, mesh_relative_path, parse_versioned_dir_name, versioned_dir_name,
};
pub use version::{AtlasVersion, VersionParseError};
