//! The atlas facade.
//!
//! [`AtlasLibrary`] is the entry point consumers use: it resolves a
//! symbolic name against the version registry, guarantees a complete local
//! cache, and hands back an [`Atlas`] with the region tree built and the
//! volume and mesh accessors bound. Construction either fully succeeds or
//! fails before any accessor is usable; there is no partially valid
//! atlas. All queries afterwards read from the validated cache; the
//! network is touched again only on an explicit re-resolve.

mod error;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheManager, ProgressCallback, VersionPolicy};
use crate::config::LibraryConfig;
use crate::descriptor::naming::STRUCTURES_FILENAME;
use crate::descriptor::{AtlasMetadata, AtlasName, AtlasVersion};
use crate::mesh::{Mesh, MeshStore};
use crate::tree::{read_region_records, RegionKey, RegionNode, RegionTable, RegionTree};
use crate::volume::VolumeStore;

pub use error::AtlasError;

use ndarray::Array3;

/// One row of [`AtlasLibrary::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasListing {
    /// Symbolic atlas name.
    pub name: String,

    /// Whether a complete local copy exists.
    pub installed: bool,

    /// Version of the local copy, when installed.
    pub local_version: Option<AtlasVersion>,

    /// Latest published version, when the manifest was reachable.
    pub latest_version: Option<AtlasVersion>,
}

/// Entry point for resolving, listing, and deleting atlases.
pub struct AtlasLibrary {
    cache: CacheManager,
}

impl AtlasLibrary {
    /// Create a library over an explicit configuration.
    pub fn new(config: LibraryConfig) -> Self {
        Self {
            cache: CacheManager::new(config),
        }
    }

    /// Create a library using the current user's configuration.
    pub fn with_user_config() -> Self {
        Self::new(LibraryConfig::load())
    }

    /// The configuration in effect.
    pub fn config(&self) -> &LibraryConfig {
        self.cache.config()
    }

    /// The underlying cache manager.
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Open an atlas, installing it first when necessary.
    pub fn open(&self, name: &str, policy: &VersionPolicy) -> Result<Atlas, AtlasError> {
        self.open_with_progress(name, policy, None)
    }

    /// [`Self::open`] with a download progress callback.
    pub fn open_with_progress(
        &self,
        name: &str,
        policy: &VersionPolicy,
        progress: Option<&ProgressCallback>,
    ) -> Result<Atlas, AtlasError> {
        let name: AtlasName = name.parse()?;
        let entry = self
            .cache
            .ensure_available_with_progress(&name, policy, progress)?;
        Atlas::from_entry(entry)
    }

    /// List known atlases: everything installed locally merged with
    /// everything the manifest publishes.
    ///
    /// Mutates nothing. The manifest fetch is best-effort; offline with no
    /// cached manifest copy, the listing covers installed atlases only and
    /// `latest_version` stays `None`.
    pub fn list(&self) -> Result<Vec<AtlasListing>, AtlasError> {
        let installed = self.cache.installed()?;
        let mut local: HashMap<String, (AtlasVersion, bool)> = HashMap::new();
        for entry in &installed {
            local.insert(
                entry.name().to_string(),
                (entry.version(), entry.is_complete()),
            );
        }

        let manifest = match self.cache.registry().fetch_manifest() {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!("listing without remote versions: {}", e);
                None
            }
        };

        let mut names: HashSet<String> = local.keys().cloned().collect();
        if let Some(manifest) = &manifest {
            names.extend(manifest.entries().map(|(name, _)| name.to_string()));
        }

        let mut listings: Vec<AtlasListing> = names
            .into_iter()
            .map(|name| {
                let latest_version = manifest.as_ref().and_then(|m| {
                    name.parse::<AtlasName>()
                        .ok()
                        .and_then(|n| m.latest_version(&n))
                });
                let (local_version, complete) = match local.get(&name) {
                    Some(&(version, complete)) => (Some(version), complete),
                    None => (None, false),
                };
                AtlasListing {
                    name,
                    installed: complete,
                    local_version,
                    latest_version,
                }
            })
            .collect();

        listings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listings)
    }

    /// Remove every installed version of an atlas.
    pub fn delete(&self, name: &str) -> Result<(), AtlasError> {
        let name: AtlasName = name.parse()?;
        self.cache.delete(&name)?;
        Ok(())
    }
}

/// One opened atlas: validated cache, built region tree, bound accessors.
pub struct Atlas {
    entry: CacheEntry,
    tree: RegionTree,
    volumes: VolumeStore,
    meshes: MeshStore,
}

impl Atlas {
    /// Build an atlas view over a complete cache entry.
    ///
    /// Validates completeness and the region table up front; a malformed
    /// table is a structural error and no atlas is returned.
    pub fn from_entry(entry: CacheEntry) -> Result<Self, AtlasError> {
        entry.validate()?;

        let records = read_region_records(&entry.dir().join(STRUCTURES_FILENAME))?;
        let tree = RegionTree::build(records)?;
        debug!(
            "opened atlas {} v{} with {} regions",
            entry.name(),
            entry.version(),
            tree.len()
        );

        let volumes = VolumeStore::new(entry.dir(), entry.metadata().clone());
        let valid_ids: HashSet<u32> = tree.iter().map(|node| node.id()).collect();
        let meshes = MeshStore::new(entry.dir(), valid_ids);

        Ok(Self {
            entry,
            tree,
            volumes,
            meshes,
        })
    }

    /// Symbolic atlas name.
    pub fn name(&self) -> &AtlasName {
        self.entry.name()
    }

    /// Installed version.
    pub fn version(&self) -> AtlasVersion {
        self.entry.version()
    }

    /// Directory of the backing cache entry.
    pub fn dir(&self) -> &Path {
        self.entry.dir()
    }

    /// Full atlas metadata.
    pub fn metadata(&self) -> &AtlasMetadata {
        self.entry.metadata()
    }

    /// Voxel size along each axis, in micrometres.
    pub fn resolution(&self) -> [f64; 3] {
        self.entry.metadata().resolution
    }

    /// Axis orientation convention (e.g. `"asr"`).
    pub fn orientation(&self) -> &str {
        &self.entry.metadata().orientation
    }

    /// Declared volume shape in voxels.
    pub fn shape(&self) -> [usize; 3] {
        self.entry.metadata().shape
    }

    /// The region taxonomy.
    pub fn structures(&self) -> &RegionTree {
        &self.tree
    }

    /// The root region.
    pub fn root(&self) -> &RegionNode {
        self.tree.root()
    }

    /// Tabular projection of the taxonomy for inspection.
    pub fn lookup_table(&self) -> RegionTable {
        self.tree.to_table()
    }

    /// The reference (imaging) volume.
    pub fn reference(&self) -> Result<&Array3<u16>, AtlasError> {
        Ok(self.volumes.reference()?)
    }

    /// The annotation volume; voxel values are region identifiers.
    pub fn annotation(&self) -> Result<&Array3<u32>, AtlasError> {
        Ok(self.volumes.annotation()?)
    }

    /// The hemisphere volume (derived on first access for symmetric
    /// atlases).
    pub fn hemispheres(&self) -> Result<&Array3<u8>, AtlasError> {
        Ok(self.volumes.hemispheres()?)
    }

    /// A secondary reference volume declared in the metadata.
    pub fn additional_reference(&self, name: &str) -> Result<Rc<Array3<u16>>, AtlasError> {
        Ok(self.volumes.additional_reference(name)?)
    }

    /// The surface mesh of one region.
    ///
    /// `Ok(None)` when the region is valid but ships no mesh; an unknown
    /// identifier or acronym is an error.
    pub fn mesh(&self, key: impl Into<RegionKey>) -> Result<Option<Rc<Mesh>>, AtlasError> {
        let node = self.tree.get(key)?;
        Ok(self.meshes.mesh_for(node.id())?)
    }

    /// The region containing one voxel of the annotation volume.
    ///
    /// `Ok(None)` for background voxels, annotation values the taxonomy
    /// does not list, and out-of-range coordinates.
    pub fn region_at(&self, voxel: [usize; 3]) -> Result<Option<&RegionNode>, AtlasError> {
        let annotation = self.volumes.annotation()?;
        let Some(&value) = annotation.get(voxel) else {
            return Ok(None);
        };
        if value == 0 {
            return Ok(None);
        }
        Ok(self.tree.get(value).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::naming::{
        ANNOTATION_FILENAME, MESHES_DIRNAME, METADATA_FILENAME, REFERENCE_FILENAME,
        STRUCTURES_FILENAME,
    };
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    const METADATA: &str = r#"{
        "name": "test",
        "citation": "unpublished",
        "atlas_link": "https://example.org",
        "species": "Mus musculus",
        "symmetric": true,
        "resolution": [25.0, 25.0, 25.0],
        "orientation": "asr",
        "version": "1.2",
        "shape": [1, 1, 4]
    }"#;

    const STRUCTURES: &str = r#"[
        {"id": 1, "acronym": "grey", "name": "Grey matter",
         "structure_id_path": [1], "rgb_triplet": [128, 128, 128]},
        {"id": 2, "acronym": "CH", "name": "Cerebrum",
         "structure_id_path": [1, 2], "rgb_triplet": [176, 240, 255]},
        {"id": 3, "acronym": "CTX", "name": "Cerebral cortex",
         "structure_id_path": [1, 2, 3], "rgb_triplet": [112, 255, 112]}
    ]"#;

    fn write_raw_gz(path: &Path, bytes: &[u8]) {
        let file = std::fs::File::create(path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::fast());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap();
    }

    /// A complete installed entry: 1x1x4 volumes, annotation [0, 3, 2, 0].
    fn installed_atlas(root: &Path) -> CacheEntry {
        let dir = root.join("test_25um_v1.2");
        std::fs::create_dir_all(dir.join(MESHES_DIRNAME)).unwrap();
        std::fs::write(dir.join(METADATA_FILENAME), METADATA).unwrap();
        std::fs::write(dir.join(STRUCTURES_FILENAME), STRUCTURES).unwrap();

        let reference: Vec<u8> = [100u16, 200, 300, 400]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        write_raw_gz(&dir.join(REFERENCE_FILENAME), &reference);

        let annotation: Vec<u8> = [0u32, 3, 2, 0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        write_raw_gz(&dir.join(ANNOTATION_FILENAME), &annotation);

        std::fs::write(
            dir.join(MESHES_DIRNAME).join("2.obj"),
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
        )
        .unwrap();

        CacheEntry::load(&dir).unwrap()
    }

    #[test]
    fn test_from_entry_builds_everything() {
        let temp = TempDir::new().unwrap();
        let atlas = Atlas::from_entry(installed_atlas(temp.path())).unwrap();

        assert_eq!(atlas.name().to_string(), "test_25um");
        assert_eq!(atlas.version(), AtlasVersion::new(1, 2));
        assert_eq!(atlas.root().id(), 1);
        assert_eq!(atlas.shape(), [1, 1, 4]);
        assert_eq!(atlas.orientation(), "asr");
        assert_eq!(atlas.resolution(), [25.0, 25.0, 25.0]);
    }

    #[test]
    fn test_taxonomy_queries() {
        let temp = TempDir::new().unwrap();
        let atlas = Atlas::from_entry(installed_atlas(temp.path())).unwrap();

        assert_eq!(atlas.structures().get("CTX").unwrap().id(), 3);

        let ancestors: Vec<u32> = atlas
            .structures()
            .ancestors(3u32)
            .unwrap()
            .iter()
            .map(|n| n.id())
            .collect();
        assert_eq!(ancestors, vec![1, 2]);

        assert_eq!(atlas.lookup_table().len(), 3);
    }

    #[test]
    fn test_volumes_and_hemispheres() {
        let temp = TempDir::new().unwrap();
        let atlas = Atlas::from_entry(installed_atlas(temp.path())).unwrap();

        assert_eq!(atlas.reference().unwrap()[[0, 0, 1]], 200);
        assert_eq!(atlas.annotation().unwrap()[[0, 0, 1]], 3);

        let hemispheres = atlas.hemispheres().unwrap();
        assert_eq!(hemispheres[[0, 0, 0]], 0); // background
        assert_eq!(hemispheres[[0, 0, 1]], 1); // left half
        assert_eq!(hemispheres[[0, 0, 2]], 2); // right half
    }

    #[test]
    fn test_mesh_triad() {
        let temp = TempDir::new().unwrap();
        let atlas = Atlas::from_entry(installed_atlas(temp.path())).unwrap();

        // Present, by acronym and id.
        assert!(atlas.mesh("CH").unwrap().is_some());
        assert!(atlas.mesh(2u32).unwrap().is_some());

        // Valid region without a mesh file.
        assert!(atlas.mesh("CTX").unwrap().is_none());

        // No such region.
        assert!(matches!(
            atlas.mesh(999_999u32),
            Err(AtlasError::Lookup(_))
        ));
    }

    #[test]
    fn test_region_at() {
        let temp = TempDir::new().unwrap();
        let atlas = Atlas::from_entry(installed_atlas(temp.path())).unwrap();

        assert_eq!(atlas.region_at([0, 0, 1]).unwrap().unwrap().acronym(), "CTX");
        assert!(atlas.region_at([0, 0, 0]).unwrap().is_none()); // background
        assert!(atlas.region_at([9, 9, 9]).unwrap().is_none()); // out of range
    }

    #[test]
    fn test_from_entry_rejects_incomplete_cache() {
        let temp = TempDir::new().unwrap();
        let entry = installed_atlas(temp.path());
        std::fs::remove_file(entry.dir().join(REFERENCE_FILENAME)).unwrap();

        assert!(matches!(
            Atlas::from_entry(entry),
            Err(AtlasError::Cache(_))
        ));
    }

    #[test]
    fn test_from_entry_rejects_malformed_taxonomy() {
        let temp = TempDir::new().unwrap();
        let entry = installed_atlas(temp.path());
        // Drop the intermediate region: CTX's path breaks.
        std::fs::write(
            entry.dir().join(STRUCTURES_FILENAME),
            r#"[
                {"id": 1, "acronym": "grey", "name": "Grey matter",
                 "structure_id_path": [1], "rgb_triplet": [128, 128, 128]},
                {"id": 3, "acronym": "CTX", "name": "Cerebral cortex",
                 "structure_id_path": [1, 2, 3], "rgb_triplet": [112, 255, 112]}
            ]"#,
        )
        .unwrap();

        assert!(matches!(
            Atlas::from_entry(entry),
            Err(AtlasError::Structure(_))
        ));
    }

    #[test]
    fn test_list_merges_installed_and_manifest() {
        let temp = TempDir::new().unwrap();
        installed_atlas(temp.path());

        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/last_versions.conf")
            .with_body("[atlases]\ntest_25um = 1.3\nother_10um = 2.0\n")
            .create();

        let config = LibraryConfig::new(temp.path()).with_remote_url(server.url());
        let library = AtlasLibrary::new(config);

        let listings = library.list().unwrap();
        assert_eq!(listings.len(), 2);

        let other = &listings[0];
        assert_eq!(other.name, "other_10um");
        assert!(!other.installed);
        assert_eq!(other.local_version, None);
        assert_eq!(other.latest_version, Some(AtlasVersion::new(2, 0)));

        let test = &listings[1];
        assert_eq!(test.name, "test_25um");
        assert!(test.installed);
        assert_eq!(test.local_version, Some(AtlasVersion::new(1, 2)));
        assert_eq!(test.latest_version, Some(AtlasVersion::new(1, 3)));
    }

    #[test]
    fn test_list_offline_shows_installed_only() {
        let temp = TempDir::new().unwrap();
        installed_atlas(temp.path());

        // Point at a server that rejects everything, with no cached manifest.
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/last_versions.conf")
            .with_status(500)
            .create();

        let config = LibraryConfig::new(temp.path()).with_remote_url(server.url());
        let library = AtlasLibrary::new(config);

        let listings = library.list().unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].latest_version, None);
        assert!(listings[0].installed);
    }

    #[test]
    fn test_delete_unknown_atlas() {
        let temp = TempDir::new().unwrap();
        let library = AtlasLibrary::new(LibraryConfig::new(temp.path()));

        assert!(matches!(
            library.delete("test_25um"),
            Err(AtlasError::Cache(crate::cache::CacheError::NotInstalled { .. }))
        ));
        assert!(matches!(
            library.delete("not a name"),
            Err(AtlasError::InvalidName(_))
        ));
    }
}
