//! HTTP archive downloader with resume support.
//!
//! Atlas archives run from tens of megabytes to several gigabytes, so an
//! interrupted transfer is resumed with an HTTP Range request when the
//! server allows it. A finished download is verified against the
//! publisher's SHA-256 when the manifest lists one; a leftover file that
//! fails verification is discarded and fetched again.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use super::checksum::{file_checksum, verify_checksum};
use super::error::{write_error, CacheError, CacheResult};

/// Progress callback: (bytes downloaded so far, total bytes or 0 if unknown).
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Buffer size for streaming downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Blocking HTTP downloader for atlas archives.
#[derive(Debug)]
pub struct HttpDownloader {
    client: Client,
    timeout: Duration,
}

impl HttpDownloader {
    /// Create a downloader with the given request timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, timeout }
    }

    /// Download `url` to `dest`, resuming a partial file when possible.
    ///
    /// Returns the total size of the file on disk afterwards.
    pub fn download(
        &self,
        url: &str,
        dest: &Path,
        expected_checksum: Option<&str>,
        progress: Option<&ProgressCallback>,
    ) -> CacheResult<u64> {
        let existing_size = if dest.exists() {
            dest.metadata().map(|m| m.len()).unwrap_or(0)
        } else {
            0
        };

        let (total_size, supports_range) = self.query_file_info(url)?;

        // A leftover file of the full size may already be the archive.
        if existing_size == total_size && total_size > 0 {
            if let Some(expected) = expected_checksum {
                if file_checksum(dest)? == expected.to_lowercase() {
                    debug!("reusing verified download at {}", dest.display());
                    if let Some(cb) = progress {
                        cb(total_size, total_size);
                    }
                    return Ok(total_size);
                }
                fs::remove_file(dest).ok();
            } else {
                debug!("reusing existing download at {}", dest.display());
                return Ok(total_size);
            }
        }

        let (start_byte, file) =
            self.open_destination(dest, existing_size, total_size, supports_range)?;
        let downloaded = self.stream(url, file, dest, start_byte, total_size, progress)?;

        if let Some(expected) = expected_checksum {
            verify_checksum(dest, expected)?;
        }

        Ok(downloaded)
    }

    /// Query total size and Range support via a HEAD request.
    fn query_file_info(&self, url: &str) -> CacheResult<(u64, bool)> {
        let response = self
            .client
            .head(url)
            .send()
            .map_err(|e| self.request_error(url, e))?;

        if !response.status().is_success() {
            return Err(CacheError::Download {
                url: url.to_string(),
                reason: format!("HEAD request failed with status {}", response.status()),
            });
        }

        let total_size = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let supports_range = response
            .headers()
            .get("accept-ranges")
            .map(|v| v.to_str().unwrap_or("") == "bytes")
            .unwrap_or(false);

        Ok((total_size, supports_range))
    }

    /// Open the destination for appending (resume) or truncation (fresh).
    fn open_destination(
        &self,
        dest: &Path,
        existing_size: u64,
        total_size: u64,
        supports_range: bool,
    ) -> CacheResult<(u64, File)> {
        if existing_size > 0 && supports_range && existing_size < total_size {
            debug!(
                "resuming download of {} at byte {}",
                dest.display(),
                existing_size
            );
            let file = OpenOptions::new()
                .append(true)
                .open(dest)
                .map_err(|e| write_error(dest, e))?;
            Ok((existing_size, file))
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
            }
            let file = File::create(dest).map_err(|e| write_error(dest, e))?;
            Ok((0, file))
        }
    }

    /// Stream the response body to the destination file.
    fn stream(
        &self,
        url: &str,
        file: File,
        dest: &Path,
        start_byte: u64,
        total_size: u64,
        progress: Option<&ProgressCallback>,
    ) -> CacheResult<u64> {
        let mut request = self.client.get(url);
        if start_byte > 0 {
            request = request.header("Range", format!("bytes={}-", start_byte));
        }

        let mut response = request.send().map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        if !status.is_success() && status.as_u16() != 206 {
            return Err(CacheError::Download {
                url: url.to_string(),
                reason: format!("GET request failed with status {}", status),
            });
        }

        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut downloaded = start_byte;

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| CacheError::Download {
                    url: url.to_string(),
                    reason: format!("read error: {}", e),
                })?;

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| write_error(dest, e))?;

            downloaded += bytes_read as u64;
            if let Some(cb) = progress {
                cb(downloaded, total_size);
            }
        }

        writer.flush().map_err(|e| write_error(dest, e))?;

        Ok(downloaded)
    }

    fn request_error(&self, url: &str, e: reqwest::Error) -> CacheError {
        if e.is_timeout() {
            CacheError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            CacheError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn downloader() -> HttpDownloader {
        HttpDownloader::new(Duration::from_secs(5))
    }

    #[test]
    fn test_download_writes_body() {
        let mut server = mockito::Server::new();
        let _head = server
            .mock("HEAD", "/atlas.tar.gz")
            .with_header("content-length", "5")
            .create();
        let _get = server
            .mock("GET", "/atlas.tar.gz")
            .with_body("hello")
            .create();

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("atlas.tar.gz");

        let url = format!("{}/atlas.tar.gz", server.url());
        let size = downloader().download(&url, &dest, None, None).unwrap();

        assert_eq!(size, 5);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
    }

    #[test]
    fn test_download_reports_progress() {
        let mut server = mockito::Server::new();
        let _head = server
            .mock("HEAD", "/atlas.tar.gz")
            .with_header("content-length", "5")
            .create();
        let _get = server
            .mock("GET", "/atlas.tar.gz")
            .with_body("hello")
            .create();

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("atlas.tar.gz");
        let url = format!("{}/atlas.tar.gz", server.url());

        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressCallback = Box::new(move |done, total| {
            sink.lock().unwrap().push((done, total));
        });

        downloader()
            .download(&url, &dest, None, Some(&progress))
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&(5, 5)));
    }

    #[test]
    fn test_download_verifies_checksum() {
        let mut server = mockito::Server::new();
        let _head = server
            .mock("HEAD", "/atlas.tar.gz")
            .with_header("content-length", "5")
            .create();
        let _get = server
            .mock("GET", "/atlas.tar.gz")
            .with_body("hello")
            .create();

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("atlas.tar.gz");
        let url = format!("{}/atlas.tar.gz", server.url());

        let result = downloader().download(&url, &dest, Some("deadbeef"), None);
        assert!(matches!(result, Err(CacheError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_download_failure_status() {
        let mut server = mockito::Server::new();
        let _head = server.mock("HEAD", "/atlas.tar.gz").with_status(404).create();

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("atlas.tar.gz");
        let url = format!("{}/atlas.tar.gz", server.url());

        let result = downloader().download(&url, &dest, None, None);
        assert!(matches!(result, Err(CacheError::Download { .. })));
    }

    #[test]
    fn test_existing_complete_download_is_reused() {
        let mut server = mockito::Server::new();
        let _head = server
            .mock("HEAD", "/atlas.tar.gz")
            .with_header("content-length", "5")
            .create();
        // No GET mock: a network fetch would fail the test.

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("atlas.tar.gz");
        std::fs::write(&dest, b"hello").unwrap();

        let url = format!("{}/atlas.tar.gz", server.url());
        let size = downloader().download(&url, &dest, None, None).unwrap();
        assert_eq!(size, 5);
    }
}
