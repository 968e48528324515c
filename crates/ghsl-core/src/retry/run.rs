//! Retry loop: run a closure until success or policy says stop.

use super::classify;
use super::error::FetchError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs `f` until it succeeds or the retry policy says to stop.
/// `f` receives the 1-based attempt number. On retryable failure, sleeps for the
/// backoff duration then tries again. Blocking: call from a blocking thread.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt, ?kind, delay_ms = d.as_millis() as u64, "retrying: {}", e);
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn retries_transient_errors_until_success() {
        let mut calls = 0;
        let out = run_with_retry(&fast_policy(5), |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(FetchError::Http(503))
            } else {
                Ok(attempt)
            }
        })
        .unwrap();
        assert_eq!(out, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_on_not_found_immediately() {
        let mut calls = 0;
        let err = run_with_retry(&fast_policy(5), |_| -> Result<(), FetchError> {
            calls += 1;
            Err(FetchError::Http(404))
        })
        .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(calls, 1);
    }

    #[test]
    fn stops_after_max_attempts() {
        let mut calls = 0;
        let err = run_with_retry(&fast_policy(2), |_| -> Result<(), FetchError> {
            calls += 1;
            Err(FetchError::PartialTransfer {
                expected: 10,
                received: 4,
            })
        })
        .unwrap_err();
        assert!(matches!(err, FetchError::PartialTransfer { .. }));
        assert_eq!(calls, 2);
    }
}
