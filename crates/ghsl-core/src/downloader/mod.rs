//! Resumable single-stream HTTP GET.
//!
//! GHSL archives are served as plain files, so one connection per archive is
//! enough; parallelism comes from fetching several archives at once. An
//! interrupted transfer leaves its `.part` file behind and the next attempt
//! continues it with `Range: bytes=N-` when the server accepts ranges.

use std::path::Path;
use std::str;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::HttpConfig;
use crate::retry::{run_with_retry, FetchError, RetryPolicy};
use crate::storage::StorageWriter;

/// libcurl transfer options derived from [`HttpConfig`].
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub timeout: Duration,
    pub max_recv_speed: Option<u64>,
}

impl From<&HttpConfig> for CurlOptions {
    fn from(http: &HttpConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(http.connect_timeout_secs),
            low_speed_limit: http.low_speed_limit,
            low_speed_time: Duration::from_secs(http.low_speed_time_secs),
            timeout: Duration::from_secs(http.timeout_secs),
            max_recv_speed: http.max_recv_speed,
        }
    }
}

/// One GET attempt writing the body into `storage`.
///
/// With `resume_from > 0` a range request is sent. A `206` reply is appended at
/// `resume_from`; a `200` reply means the server ignored the range, so the file
/// is rewritten from offset 0. Bodies of non-2xx replies are discarded.
/// Returns the number of bytes on disk afterwards.
pub fn get_to_storage(
    url: &str,
    storage: &StorageWriter,
    resume_from: u64,
    expected_len: Option<u64>,
    curl: CurlOptions,
) -> Result<u64, FetchError> {
    let status = Arc::new(AtomicU32::new(0));
    let status_cb = Arc::clone(&status);
    let received = Arc::new(AtomicU64::new(0));
    let received_cb = Arc::clone(&received);
    let storage_error: Arc<Mutex<Option<std::io::Error>>> = Arc::new(Mutex::new(None));
    let storage_error_cb = Arc::clone(&storage_error);
    let writer = storage.clone();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(curl.connect_timeout)?;
    easy.low_speed_limit(curl.low_speed_limit)?;
    easy.low_speed_time(curl.low_speed_time)?;
    easy.timeout(curl.timeout)?;
    if let Some(speed) = curl.max_recv_speed {
        easy.max_recv_speed(speed)?;
    }
    if resume_from > 0 {
        easy.range(&format!("{}-", resume_from))?;
    }

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(move |data| {
                if let Ok(line) = str::from_utf8(data) {
                    if let Some(code) = status_code(line) {
                        status_cb.store(code, Ordering::Relaxed);
                    }
                }
                true
            })?;
        let status_w = Arc::clone(&status);
        transfer
            .write_function(move |data| {
                let code = status_w.load(Ordering::Relaxed);
                if !(200..300).contains(&code) {
                    return Ok(data.len());
                }
                let base = if code == 206 { resume_from } else { 0 };
                let off = received_cb.fetch_add(data.len() as u64, Ordering::Relaxed);
                match writer.write_at(base + off, data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        let io_err = e.downcast::<std::io::Error>().unwrap_or_else(|e| {
                            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
                        });
                        if let Ok(mut slot) = storage_error_cb.lock() {
                            *slot = Some(io_err);
                        }
                        Ok(0)
                    }
                }
            })?;
        if let Err(e) = transfer.perform() {
            if e.is_write_error() {
                if let Some(io_err) = storage_error.lock().ok().and_then(|mut s| s.take()) {
                    return Err(FetchError::Storage(io_err));
                }
            }
            return Err(FetchError::Curl(e));
        }
    }

    let code = easy.response_code()?;
    let received = received.load(Ordering::Relaxed);

    if code == 416 && resume_from > 0 {
        if expected_len == Some(resume_from) {
            return Ok(resume_from);
        }
        // Stale partial file larger than the remote one: start over next attempt.
        storage.truncate(0).map_err(storage_error_from)?;
        return Err(FetchError::PartialTransfer {
            expected: expected_len.unwrap_or(0),
            received: resume_from,
        });
    }
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }

    let on_disk = if code == 206 {
        resume_from + received
    } else {
        if resume_from > 0 {
            tracing::debug!(url, "server ignored range request; restarted from 0");
            storage.truncate(received).map_err(storage_error_from)?;
        }
        received
    };

    if let Some(expected) = expected_len {
        if on_disk != expected {
            return Err(FetchError::PartialTransfer {
                expected,
                received: on_disk,
            });
        }
    }
    Ok(on_disk)
}

/// Download `url` into `temp_path`, retrying per `policy`.
///
/// Each attempt continues the partial file when `accept_ranges` is set and
/// starts from scratch otherwise. Returns the final size in bytes; the caller
/// verifies and renames the file.
pub fn download_to_path(
    url: &str,
    temp_path: &Path,
    expected_len: Option<u64>,
    accept_ranges: bool,
    curl: CurlOptions,
    policy: &RetryPolicy,
) -> Result<u64, FetchError> {
    run_with_retry(policy, |attempt| {
        let storage = open_for_attempt(temp_path, accept_ranges, expected_len)
            .map_err(storage_error_from)?;
        let offset = storage.len().map_err(storage_error_from)?;
        if offset > 0 && expected_len == Some(offset) {
            return Ok(offset);
        }
        if offset > 0 {
            tracing::info!(url, attempt, offset, "resuming partial download");
        }
        let n = get_to_storage(url, &storage, offset, expected_len, curl)?;
        storage.sync().map_err(storage_error_from)?;
        Ok(n)
    })
}

fn open_for_attempt(
    temp_path: &Path,
    accept_ranges: bool,
    expected_len: Option<u64>,
) -> anyhow::Result<StorageWriter> {
    if accept_ranges && temp_path.is_file() {
        let storage = StorageWriter::open_existing(temp_path)?;
        let len = storage.len()?;
        if expected_len.map_or(true, |exp| len <= exp) {
            return Ok(storage);
        }
    }
    StorageWriter::create(temp_path)
}

fn storage_error_from(e: anyhow::Error) -> FetchError {
    match e.downcast::<std::io::Error>() {
        Ok(io) => FetchError::Storage(io),
        Err(e) => FetchError::Storage(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("{:#}", e),
        )),
    }
}

/// Status code from an `HTTP/1.1 206 Partial Content` style line.
fn status_code(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("HTTP/")?;
    rest.split_whitespace().nth(1)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_parsing() {
        assert_eq!(status_code("HTTP/1.1 206 Partial Content\r\n"), Some(206));
        assert_eq!(status_code("HTTP/2 200\r\n"), Some(200));
        assert_eq!(status_code("Content-Length: 10\r\n"), None);
        assert_eq!(status_code("HTTP/1.1 abc"), None);
    }

    #[test]
    fn curl_options_from_config() {
        let http = HttpConfig {
            connect_timeout_secs: 5,
            low_speed_limit: 10,
            low_speed_time_secs: 7,
            timeout_secs: 100,
            max_recv_speed: Some(42),
        };
        let c = CurlOptions::from(&http);
        assert_eq!(c.connect_timeout, Duration::from_secs(5));
        assert_eq!(c.low_speed_limit, 10);
        assert_eq!(c.low_speed_time, Duration::from_secs(7));
        assert_eq!(c.timeout, Duration::from_secs(100));
        assert_eq!(c.max_recv_speed, Some(42));
    }

    #[test]
    fn oversized_partial_is_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("x.zip.part");
        std::fs::write(&tp, vec![0u8; 20]).unwrap();
        let s = open_for_attempt(&tp, true, Some(10)).unwrap();
        assert_eq!(s.len().unwrap(), 0);

        std::fs::write(&tp, vec![0u8; 4]).unwrap();
        let s = open_for_attempt(&tp, true, Some(10)).unwrap();
        assert_eq!(s.len().unwrap(), 4);

        let s = open_for_attempt(&tp, false, Some(10)).unwrap();
        assert_eq!(s.len().unwrap(), 0);
    }
}
