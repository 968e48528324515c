//! HTTP HEAD probe.
//!
//! Uses libcurl to learn an archive's size, whether the server accepts
//! `Range` requests, and its ETag/Last-Modified validators. The validators
//! are stored with cache entries and compared before resuming or reusing.

mod parse;

use std::str;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::retry::FetchError;

pub(crate) use parse::parse_headers;

/// Key headers of a HEAD response (after following redirects).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// `ETag` value without quotes or weak prefix.
    pub etag: Option<String>,
    /// `Last-Modified` value as sent.
    pub last_modified: Option<String>,
    /// `Content-Disposition` value, if any (logged only).
    pub content_disposition: Option<String>,
}

/// Performs a HEAD request and returns parsed metadata.
///
/// Follows redirects; only the headers of the final response are kept.
/// Blocking: call from `spawn_blocking` if used from async code.
pub fn probe(url: &str, http: &HttpConfig) -> Result<HeadResult, FetchError> {
    let mut lines: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.nobody(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(http.connect_timeout_secs))?;
    easy.timeout(Duration::from_secs(http.connect_timeout_secs.saturating_mul(2)))?;

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    lines.push(s.trim_end().to_string());
                }
                true
            })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }

    Ok(parse_headers(&lines))
}
