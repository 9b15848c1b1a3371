//! SHA-256 checksum calculation for downloaded archives.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::error::{CacheError, CacheResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the SHA-256 checksum of a file, lowercase hex.
pub fn file_checksum(path: &Path) -> CacheResult<String> {
    let mut file = File::open(path).map_err(|source| CacheError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(|source| CacheError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify that a file matches an expected checksum.
pub fn verify_checksum(path: &Path, expected: &str) -> CacheResult<()> {
    let actual = file_checksum(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(CacheError::ChecksumMismatch {
            filename: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            expected: expected.to_lowercase(),
            actual,
        });
    }
    Ok(())
}
