use thiserror::Error;

/// Failure of one HEAD or GET attempt. Kept out of `anyhow` so the retry
/// loop can classify it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Curl(#[from] curl::Error),
    #[error("HTTP {0}")]
    Http(u32),
    /// The connection ended before the announced length was on disk.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
}

impl FetchError {
    /// 404/410: the archive is not published (ocean tiles, unreleased epochs).
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Http(404) | FetchError::Http(410))
    }
}
