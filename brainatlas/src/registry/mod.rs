//! Remote version registry.
//!
//! Resolves an atlas name to the latest published version by fetching the
//! publisher's `last_versions.conf` manifest. Every successful fetch caches
//! a verbatim copy next to the installed atlases; when the remote is
//! unreachable the cached copy is used instead, so an offline machine keeps
//! working with whatever it last saw. Fetches happen only when a caller
//! explicitly resolves or lists atlases; there is no background refresh.

mod manifest;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LibraryConfig;
use crate::descriptor::naming::MANIFEST_FILENAME;
use crate::descriptor::{archive_filename, AtlasName, AtlasVersion};

pub use manifest::VersionManifest;

/// Errors resolving atlas versions against the remote registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The remote manifest was unreachable and no cached copy exists.
    #[error("could not fetch version manifest from {url}: {reason}")]
    Network { url: String, reason: String },

    /// The manifest text is malformed.
    #[error("malformed version manifest: {reason}")]
    Parse { reason: String },

    /// The manifest does not list the requested atlas.
    #[error("atlas {name} is not listed in the version manifest")]
    UnknownAtlas { name: String },

    /// Reading or writing the cached manifest copy failed.
    #[error("manifest cache I/O at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Client for the publisher's version manifest.
pub struct RemoteRegistry {
    client: Client,
    remote_url: String,
    cached_path: PathBuf,
}

impl RemoteRegistry {
    /// Create a registry client from library configuration.
    pub fn new(config: &LibraryConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            remote_url: config.remote_url.clone(),
            cached_path: config.cached_manifest_path(),
        }
    }

    /// Create a registry client with explicit settings.
    pub fn with_settings(
        remote_url: impl Into<String>,
        cached_path: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            remote_url: remote_url.into(),
            cached_path: cached_path.into(),
        }
    }

    /// URL of the remote manifest document.
    pub fn manifest_url(&self) -> String {
        format!("{}/{}", self.remote_url, MANIFEST_FILENAME)
    }

    /// URL of the archive for one versioned atlas.
    pub fn archive_url(&self, name: &AtlasName, version: &AtlasVersion) -> String {
        format!("{}/{}", self.remote_url, archive_filename(name, version))
    }

    /// Fetch the manifest, falling back to the cached copy when offline.
    ///
    /// A successful fetch refreshes the cached copy; a failed refresh is
    /// reported but does not fail the call.
    pub fn fetch_manifest(&self) -> Result<VersionManifest, RegistryError> {
        let url = self.manifest_url();

        let text = match self.fetch_text(&url) {
            Ok(text) => text,
            Err(reason) => {
                warn!("manifest fetch failed ({reason}), trying cached copy");
                return self.cached_manifest().map_err(|_| RegistryError::Network {
                    url,
                    reason,
                });
            }
        };

        let manifest = VersionManifest::parse(&text)?;

        if let Err(e) = std::fs::create_dir_all(
            self.cached_path.parent().unwrap_or(std::path::Path::new(".")),
        )
        .and_then(|_| std::fs::write(&self.cached_path, &text))
        {
            warn!(
                "could not refresh manifest cache {}: {}",
                self.cached_path.display(),
                e
            );
        }

        debug!("fetched manifest with {} atlases", manifest.len());
        Ok(manifest)
    }

    /// Parse the locally cached manifest copy without touching the network.
    pub fn cached_manifest(&self) -> Result<VersionManifest, RegistryError> {
        VersionManifest::from_file(&self.cached_path)
    }

    /// Latest published version of one atlas.
    pub fn latest_version(&self, name: &AtlasName) -> Result<AtlasVersion, RegistryError> {
        self.fetch_manifest()?
            .latest_version(name)
            .ok_or_else(|| RegistryError::UnknownAtlas {
                name: name.to_string(),
            })
    }

    fn fetch_text(&self, url: &str) -> Result<String, String> {
        let response = self.client.get(url).send().map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {}", status));
        }

        response.text().map_err(|e| e.to_string())
    }
}
