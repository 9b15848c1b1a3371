//! Archive validation and extraction.
//!
//! Atlas archives are gzip-compressed tarballs produced by the packaging
//! pipeline with the system `tar`; extraction uses the same tool. Before
//! extraction the gzip container is validated, so a truncated or
//! mislabeled download fails with a clear diagnostic instead of a partial
//! unpack.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::Command;

use flate2::read::GzDecoder;

use super::error::{write_error, CacheError, CacheResult};

/// Extractor for atlas archives, backed by the system `tar`.
#[derive(Debug, Default)]
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }

    /// Check that a file is a readable gzip stream.
    ///
    /// Decodes a single byte, which forces the gzip header (magic bytes,
    /// flags, header CRC when present) through validation without
    /// decompressing the whole payload.
    pub fn validate_gzip(&self, archive: &Path) -> CacheResult<()> {
        let file = fs::File::open(archive).map_err(|source| CacheError::Read {
            path: archive.to_path_buf(),
            source,
        })?;

        let mut probe = [0u8; 1];
        match GzDecoder::new(file).read(&mut probe) {
            Ok(_) => Ok(()),
            Err(e) => Err(CacheError::InvalidArchive {
                path: archive.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }

    /// Extract a tar.gz archive into a destination directory.
    ///
    /// Returns the number of files extracted.
    pub fn extract(&self, archive: &Path, dest_dir: &Path) -> CacheResult<usize> {
        fs::create_dir_all(dest_dir).map_err(|e| write_error(dest_dir, e))?;

        let output = Command::new("tar")
            .args([
                "-xzf",
                archive.to_str().unwrap_or(""),
                "-C",
                dest_dir.to_str().unwrap_or(""),
            ])
            .output()
            .map_err(|e| CacheError::Extraction {
                path: archive.to_path_buf(),
                reason: format!("failed to run tar: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CacheError::Extraction {
                path: archive.to_path_buf(),
                reason: format!("tar extraction failed: {}", stderr.trim()),
            });
        }

        count_files_recursive(dest_dir)
    }

    /// List archive contents without extracting.
    pub fn list_contents(&self, archive: &Path) -> CacheResult<Vec<String>> {
        let output = Command::new("tar")
            .args(["-tzf", archive.to_str().unwrap_or("")])
            .output()
            .map_err(|e| CacheError::Extraction {
                path: archive.to_path_buf(),
                reason: format!("failed to run tar: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CacheError::InvalidArchive {
                path: archive.to_path_buf(),
                reason: format!("tar list failed: {}", stderr.trim()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().map(|s| s.to_string()).collect())
    }
}

/// Count files recursively in a directory.
fn count_files_recursive(dir: &Path) -> CacheResult<usize> {
    let mut count = 0;

    if !dir.exists() {
        return Ok(0);
    }

    let entries = fs::read_dir(dir).map_err(|source| CacheError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            count += 1;
        } else if path.is_dir() {
            count += count_files_recursive(&path)?;
        }
    }

    Ok(count)
}

/// Recursively copy a directory; fallback for cross-filesystem installs.
pub fn copy_dir_recursive(source: &Path, dest: &Path) -> CacheResult<()> {
    fs::create_dir_all(dest).map_err(|e| write_error(dest, e))?;

    let entries = fs::read_dir(source).map_err(|e| CacheError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| CacheError::Read {
            path: source.to_path_buf(),
            source: e,
        })?;

        let source_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if source_path.is_dir() {
            copy_dir_recursive(&source_path, &dest_path)?;
        } else {
            fs::copy(&source_path, &dest_path).map_err(|e| write_error(&dest_path, e))?;
        }
    }

    Ok(())
}
