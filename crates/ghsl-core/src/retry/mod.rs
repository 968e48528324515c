//! Retry and backoff policy for archive transfers.
//!
//! Classifies failures (timeouts, throttling, connection drops, 5xx) and
//! decides exponential backoff so the fetcher and the HEAD probe share one
//! consistent policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::FetchError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
