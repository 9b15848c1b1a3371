//! Error types for the atlas cache manager.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::descriptor::MetadataError;
use crate::registry::RegistryError;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur while installing or inspecting cached atlases.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Downloading the atlas archive failed.
    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    /// The download timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The downloaded archive does not match the published checksum.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// The downloaded file is not a well-formed compressed archive.
    #[error("{path} is not a valid atlas archive: {reason}")]
    InvalidArchive { path: PathBuf, reason: String },

    /// Unpacking the archive failed.
    #[error("failed to extract {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    /// The disk filled up mid-operation.
    #[error("no space left on device while writing {path}")]
    DiskFull { path: PathBuf },

    /// Reading a file or directory failed.
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    /// Writing a file or directory failed.
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    /// Another process holds the install lock for this atlas.
    #[error("atlas install already in progress (lock file {path}); remove the lock if stale")]
    Locked { path: PathBuf },

    /// An installed entry misses declared artifacts.
    #[error("atlas {atlas} cache is incomplete: missing {missing:?}")]
    Incomplete { atlas: String, missing: Vec<String> },

    /// A cache directory does not look like an installed atlas.
    #[error("invalid cache entry {path}: {reason}")]
    InvalidEntry { path: PathBuf, reason: String },

    /// The requested atlas is not installed.
    #[error("atlas {atlas} is not installed")]
    NotInstalled { atlas: String },

    /// The entry's metadata document could not be read.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Resolving the version against the remote registry failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// ENOSPC, the errno `write` reports on a full disk.
const ENOSPC: i32 = 28;

/// Map a write-side I/O failure, surfacing full-disk conditions distinctly.
pub(crate) fn write_error(path: &Path, source: io::Error) -> CacheError {
    if source.raw_os_error() == Some(ENOSPC) {
        CacheError::DiskFull {
            path: path.to_path_buf(),
        }
    } else {
        CacheError::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}
