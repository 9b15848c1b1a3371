//! Library configuration.
//!
//! Resolves where atlases are cached and where the remote manifest lives.
//! Precedence, lowest to highest: compiled-in defaults, the `config.conf`
//! file in the cache root, the `BRAINATLAS_DIR` environment variable, and
//! explicit builder calls.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use tracing::warn;

/// Environment variable overriding the cache root directory.
pub const BASE_DIR_ENV: &str = "BRAINATLAS_DIR";

/// Default remote base URL the version manifest and archives are fetched from.
pub const DEFAULT_REMOTE_URL: &str = "https://data.brainatlas.dev/atlases";

/// Name of the cache root subdirectory used when no override is given.
const DEFAULT_DIR_NAME: &str = ".brainatlas";

/// Name of the optional configuration file inside the cache root.
const CONFIG_FILENAME: &str = "config.conf";

/// Default HTTP timeout for manifest and archive requests.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Configuration for an atlas library.
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Root directory holding one versioned subdirectory per installed atlas.
    pub base_dir: PathBuf,

    /// Directory for in-progress downloads and extraction.
    ///
    /// Kept on the same filesystem as `base_dir` by default so installs can
    /// finish with an atomic rename.
    pub staging_dir: PathBuf,

    /// Remote base URL for the version manifest and atlas archives.
    pub remote_url: String,

    /// HTTP request timeout.
    pub timeout: Duration,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        let base_dir = default_base_dir();
        Self {
            staging_dir: base_dir.join("staging"),
            base_dir,
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl LibraryConfig {
    /// Create a configuration rooted at an explicit directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            staging_dir: base_dir.join("staging"),
            base_dir,
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the staging directory.
    pub fn with_staging_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_dir = path.into();
        self
    }

    /// Set the remote base URL.
    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = url.into();
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the effective configuration for the current user.
    ///
    /// Reads `config.conf` from the cache root when present; the file is
    /// created with defaults on first use so users have something to edit.
    /// A malformed file is reported and ignored rather than treated as
    /// fatal.
    pub fn load() -> Self {
        let mut config = Self::default();
        let path = config.base_dir.join(CONFIG_FILENAME);

        if path.exists() {
            match Ini::load_from_file(&path) {
                Ok(file) => config.apply_conf_file(&file),
                Err(e) => warn!("ignoring malformed config file {}: {}", path.display(), e),
            }
        } else {
            config.write_default_conf_file(&path);
        }

        config
    }

    /// Path of the manifest copy cached next to the installed atlases.
    pub fn cached_manifest_path(&self) -> PathBuf {
        self.base_dir
            .join(crate::descriptor::naming::MANIFEST_FILENAME)
    }

    fn apply_conf_file(&mut self, file: &Ini) {
        if let Some(paths) = file.section(Some("paths")) {
            if let Some(dir) = paths.get("base_dir") {
                self.base_dir = PathBuf::from(dir);
            }
            if let Some(dir) = paths.get("staging_dir") {
                self.staging_dir = PathBuf::from(dir);
            } else {
                self.staging_dir = self.base_dir.join("staging");
            }
        }

        if let Some(network) = file.section(Some("network")) {
            if let Some(url) = network.get("remote_url") {
                self.remote_url = url.to_string();
            }
            if let Some(secs) = network.get("timeout_secs") {
                match secs.parse::<u64>() {
                    Ok(secs) => self.timeout = Duration::from_secs(secs),
                    Err(_) => warn!("ignoring non-numeric timeout_secs {:?}", secs),
                }
            }
        }
    }

    fn write_default_conf_file(&self, path: &Path) {
        let mut file = Ini::new();
        file.with_section(Some("paths"))
            .set("base_dir", self.base_dir.display().to_string())
            .set("staging_dir", self.staging_dir.display().to_string());
        file.with_section(Some("network"))
            .set("remote_url", self.remote_url.clone())
            .set("timeout_secs", self.timeout.as_secs().to_string());

        // First use may race with nothing; failure to seed the file only
        // costs the user an editable template.
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        if let Err(e) = file.write_to_file(path) {
            warn!("could not write default config {}: {}", path.display(), e);
        }
    }
}

/// Cache root directory: `$BRAINATLAS_DIR` when set, else `~/.brainatlas`.
fn default_base_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(BASE_DIR_ENV) {
        return PathBuf::from(dir);
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}
