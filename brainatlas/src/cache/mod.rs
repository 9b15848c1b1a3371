//! On-disk atlas cache.
//!
//! The cache root holds one versioned directory per installed atlas.
//! [`CacheManager::ensure_available`] is the single write path: it decides
//! whether the requested atlas is already usable, and otherwise downloads
//! and installs it. Installation is staged: the archive is downloaded and
//! extracted under the staging directory and only renamed into the cache
//! root once complete, so a crash mid-install never leaves a visible
//! half-written entry. A lock file excludes concurrent installers of the
//! same atlas across processes.

mod checksum;
mod download;
mod entry;
mod error;
mod extract;
mod lock;

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::LibraryConfig;
use crate::descriptor::{archive_filename, versioned_dir_name, AtlasName, AtlasVersion};
use crate::registry::RemoteRegistry;

pub use checksum::{file_checksum, verify_checksum};
pub use download::{HttpDownloader, ProgressCallback};
pub use entry::CacheEntry;
pub use error::{CacheError, CacheResult};
pub use extract::ArchiveExtractor;
pub use lock::InstallLock;

/// How `ensure_available` chooses the atlas version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionPolicy {
    /// Any complete installed version is acceptable.
    ///
    /// The fast path: an installed atlas is returned without any network
    /// traffic. Downloads happen only when nothing is installed at all.
    AnyInstalled,

    /// Resolve the latest version against the remote registry.
    ///
    /// Choosing this policy is the explicit consent to download. An
    /// installed version with the same major as the latest is kept (a
    /// newer minor is reported, not forced); a major change reinstalls.
    Latest,

    /// Exactly this version.
    Exact(AtlasVersion),
}

/// Owner of the on-disk cache layout.
pub struct CacheManager {
    config: LibraryConfig,
    registry: RemoteRegistry,
    downloader: HttpDownloader,
    extractor: ArchiveExtractor,
}

impl CacheManager {
    /// Create a manager over the configured cache root.
    pub fn new(config: LibraryConfig) -> Self {
        let registry = RemoteRegistry::new(&config);
        let downloader = HttpDownloader::new(config.timeout);

        Self {
            config,
            registry,
            downloader,
            extractor: ArchiveExtractor::new(),
        }
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// The registry client used for version resolution.
    pub fn registry(&self) -> &RemoteRegistry {
        &self.registry
    }

    /// Guarantee a complete local copy of an atlas, per the version policy.
    pub fn ensure_available(
        &self,
        name: &AtlasName,
        policy: &VersionPolicy,
    ) -> CacheResult<CacheEntry> {
        self.ensure_available_with_progress(name, policy, None)
    }

    /// [`Self::ensure_available`] with a download progress callback.
    pub fn ensure_available_with_progress(
        &self,
        name: &AtlasName,
        policy: &VersionPolicy,
        progress: Option<&ProgressCallback>,
    ) -> CacheResult<CacheEntry> {
        match policy {
            VersionPolicy::AnyInstalled => {
                if let Some(entry) = self.complete_installed(name) {
                    self.report_staleness_offline(&entry);
                    return Ok(entry);
                }
                let manifest = self.registry.fetch_manifest()?;
                let version = manifest.latest_version(name).ok_or_else(|| {
                    crate::registry::RegistryError::UnknownAtlas {
                        name: name.to_string(),
                    }
                })?;
                let checksum = manifest.checksum(name).map(str::to_string);
                self.install(name, &version, checksum.as_deref(), progress)
            }

            VersionPolicy::Latest => {
                let manifest = self.registry.fetch_manifest()?;
                let latest = manifest.latest_version(name).ok_or_else(|| {
                    crate::registry::RegistryError::UnknownAtlas {
                        name: name.to_string(),
                    }
                })?;

                if let Some(entry) = self.complete_installed(name) {
                    if entry.version().is_compatible_with(&latest) {
                        if entry.version().is_stale_against(&latest) {
                            info!(
                                "atlas {}: version {} is installed, {} is available",
                                name,
                                entry.version(),
                                latest
                            );
                        }
                        return Ok(entry);
                    }
                    info!(
                        "atlas {}: installed version {} is incompatible with {}, reinstalling",
                        name,
                        entry.version(),
                        latest
                    );
                }

                let checksum = manifest.checksum(name).map(str::to_string);
                self.install(name, &latest, checksum.as_deref(), progress)
            }

            VersionPolicy::Exact(version) => {
                if let Some(entry) = self.complete_installed(name) {
                    if entry.version() == *version {
                        return Ok(entry);
                    }
                }
                // The manifest only checksums the latest archive; use it
                // when it happens to describe the requested version.
                let checksum = self.registry.cached_manifest().ok().and_then(|m| {
                    (m.latest_version(name) == Some(*version))
                        .then(|| m.checksum(name).map(str::to_string))
                        .flatten()
                });
                self.install(name, version, checksum.as_deref(), progress)
            }
        }
    }

    /// Enumerate installed entries without loading volumes or meshes.
    ///
    /// Unreadable or foreign directories are skipped with a warning.
    pub fn installed(&self) -> CacheResult<Vec<CacheEntry>> {
        let base = &self.config.base_dir;
        if !base.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let dir = fs::read_dir(base).map_err(|source| CacheError::Read {
            path: base.clone(),
            source,
        })?;

        for item in dir.flatten() {
            let path = item.path();
            if !path.is_dir() {
                continue;
            }
            let Some(dir_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if crate::descriptor::parse_versioned_dir_name(dir_name).is_none() {
                continue;
            }

            match CacheEntry::load(&path) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("skipping unreadable cache entry {}: {}", path.display(), e),
            }
        }

        entries.sort_by(|a, b| {
            a.name()
                .to_string()
                .cmp(&b.name().to_string())
                .then(a.version().cmp(&b.version()))
        });
        Ok(entries)
    }

    /// The complete installed entry for one atlas, if any.
    ///
    /// When several versions are installed, the highest complete one wins.
    pub fn complete_installed(&self, name: &AtlasName) -> Option<CacheEntry> {
        let entries = self.installed().ok()?;
        entries
            .into_iter()
            .filter(|e| e.name() == name && e.is_complete())
            .max_by_key(|e| e.version())
    }

    /// Remove every installed version of an atlas.
    pub fn delete(&self, name: &AtlasName) -> CacheResult<()> {
        let doomed: Vec<CacheEntry> = self
            .installed()?
            .into_iter()
            .filter(|e| e.name() == name)
            .collect();

        if doomed.is_empty() {
            return Err(CacheError::NotInstalled {
                atlas: name.to_string(),
            });
        }

        for entry in doomed {
            info!("removing atlas {} v{}", name, entry.version());
            fs::remove_dir_all(entry.dir()).map_err(|source| CacheError::Write {
                path: entry.dir().to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    /// Download, verify, and atomically install one atlas version.
    fn install(
        &self,
        name: &AtlasName,
        version: &AtlasVersion,
        checksum: Option<&str>,
        progress: Option<&ProgressCallback>,
    ) -> CacheResult<CacheEntry> {
        let dir_name = versioned_dir_name(name, version);
        let target = self.config.base_dir.join(&dir_name);

        fs::create_dir_all(&self.config.base_dir)
            .map_err(|e| error::write_error(&self.config.base_dir, e))?;
        fs::create_dir_all(&self.config.staging_dir)
            .map_err(|e| error::write_error(&self.config.staging_dir, e))?;

        let _lock = InstallLock::acquire(
            &self.config.base_dir.join(format!(".{}.lock", dir_name)),
        )?;

        // Download.
        let archive_name = archive_filename(name, version);
        let archive_path = self.config.staging_dir.join(&archive_name);
        let url = self.registry.archive_url(name, version);
        info!("downloading atlas {} v{} from {}", name, version, url);
        self.downloader
            .download(&url, &archive_path, checksum, progress)?;

        // Validate and extract in staging.
        self.extractor.validate_gzip(&archive_path)?;

        let extract_root = self.config.staging_dir.join(format!("extract-{}", dir_name));
        if extract_root.exists() {
            fs::remove_dir_all(&extract_root).map_err(|source| CacheError::Write {
                path: extract_root.clone(),
                source,
            })?;
        }
        let files = self.extractor.extract(&archive_path, &extract_root)?;
        debug!("extracted {} files from {}", files, archive_name);

        let extracted_dir = extract_root.join(&dir_name);
        if !extracted_dir.is_dir() {
            return Err(CacheError::Extraction {
                path: archive_path.clone(),
                reason: format!("archive does not contain a {} directory", dir_name),
            });
        }

        // Move into place. A same-version leftover can only be a damaged
        // entry (a complete one would have been returned earlier).
        if target.exists() {
            fs::remove_dir_all(&target).map_err(|source| CacheError::Write {
                path: target.clone(),
                source,
            })?;
        }
        if fs::rename(&extracted_dir, &target).is_err() {
            extract::copy_dir_recursive(&extracted_dir, &target)?;
        }

        let entry = CacheEntry::load(&target)?;
        entry.validate()?;

        // Cleanup: staging leftovers and superseded versions.
        fs::remove_file(&archive_path).ok();
        fs::remove_dir_all(&extract_root).ok();
        self.remove_other_versions(name, version);

        info!("installed atlas {} v{}", name, version);
        Ok(entry)
    }

    fn remove_other_versions(&self, name: &AtlasName, keep: &AtlasVersion) {
        let Ok(entries) = self.installed() else {
            return;
        };
        for entry in entries {
            if entry.name() == name && entry.version() != *keep {
                info!(
                    "removing superseded atlas {} v{}",
                    name,
                    entry.version()
                );
                if let Err(e) = fs::remove_dir_all(entry.dir()) {
                    warn!(
                        "could not remove superseded entry {}: {}",
                        entry.dir().display(),
                        e
                    );
                }
            }
        }
    }

    /// Report staleness from the cached manifest copy only.
    ///
    /// The fast path must stay offline, so this never fetches; without a
    /// cached manifest it stays silent.
    fn report_staleness_offline(&self, entry: &CacheEntry) {
        let Ok(manifest) = self.registry.cached_manifest() else {
            return;
        };
        if let Some(latest) = manifest.latest_version(entry.name()) {
            if entry.version().is_stale_against(&latest) {
                warn!(
                    "atlas {}: version {} is installed, {} is available (reopen with the \
                     latest-version policy to update)",
                    entry.name(),
                    entry.version(),
                    latest
                );
            }
        }
    }

    /// Path an atlas version would be installed at.
    pub fn entry_path(&self, name: &AtlasName, version: &AtlasVersion) -> PathBuf {
        self.config.base_dir.join(versioned_dir_name(name, version))
    }
}
