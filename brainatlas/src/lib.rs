//! BrainAtlas - programmatic access to packaged neuroanatomical atlases.
//!
//! An atlas is a versioned, named bundle of a reference volume, an
//! annotation volume, a hierarchical region taxonomy, and per-region
//! surface meshes. This crate resolves a symbolic atlas name (e.g.
//! `allen_mouse_25um`) against a remote version manifest, downloads and
//! unpacks the archive into a local cache on first use, and exposes typed
//! accessors over the cached data.
//!
//! # Example
//!
//! ```no_run
//! use brainatlas::{AtlasLibrary, VersionPolicy};
//!
//! let library = AtlasLibrary::with_user_config();
//! let atlas = library.open("allen_mouse_25um", &VersionPolicy::AnyInstalled)?;
//!
//! let cortex = atlas.structures().get("CTX")?;
//! for region in atlas.structures().ancestors(cortex.id())? {
//!     println!("{} <- {}", region.acronym(), cortex.acronym());
//! }
//! # Ok::<(), brainatlas::AtlasError>(())
//! ```

pub mod atlas;
pub mod cache;
pub mod config;
pub mod descriptor;
pub mod mesh;
pub mod registry;
pub mod tree;
pub mod volume;

pub use atlas::{Atlas, AtlasError, AtlasLibrary, AtlasListing};
pub use cache::{CacheEntry, CacheManager, ProgressCallback, VersionPolicy};
pub use config::LibraryConfig;
pub use descriptor::{AtlasMetadata, AtlasName, AtlasVersion};
pub use mesh::Mesh;
pub use tree::{RegionNode, RegionTree};
