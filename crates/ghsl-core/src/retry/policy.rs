use std::time::Duration;

/// Why an attempt failed, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connect or transfer timeout (including libcurl's low-speed abort).
    Timeout,
    /// 429 or 503.
    Throttled,
    /// Reset, refused, DNS failure or a body cut short.
    Connection,
    /// Other 5xx.
    ServerError(u16),
    /// 404/410: the archive does not exist on the server.
    NotPublished,
    /// Anything else: other 4xx, local disk errors, bad options.
    Fatal,
}

impl ErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::Throttled | ErrorKind::Connection | ErrorKind::ServerError(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

/// Capped exponential backoff. Built from `[retry]` in config.toml.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts per archive, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`: `base * 2^(attempt-1)`, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// `attempt` is 1-based and counts the attempt that just failed.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts || !kind.is_transient() {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let p = RetryPolicy {
            max_attempts: 30,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        };
        assert_eq!(p.backoff(1), Duration::from_millis(250));
        assert_eq!(p.backoff(2), Duration::from_millis(500));
        assert_eq!(p.backoff(3), Duration::from_secs(1));
        assert_eq!(p.backoff(4), Duration::from_secs(2));
        assert_eq!(p.backoff(25), Duration::from_secs(2));
    }

    #[test]
    fn only_transient_kinds_are_retried() {
        let p = RetryPolicy::default();
        for kind in [
            ErrorKind::Timeout,
            ErrorKind::Throttled,
            ErrorKind::Connection,
            ErrorKind::ServerError(502),
        ] {
            assert_eq!(p.decide(1, kind), RetryDecision::RetryAfter(p.base_delay));
        }
        assert_eq!(p.decide(1, ErrorKind::NotPublished), RetryDecision::NoRetry);
        assert_eq!(p.decide(1, ErrorKind::Fatal), RetryDecision::NoRetry);
    }

    #[test]
    fn stops_at_max_attempts() {
        let p = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        assert!(matches!(p.decide(2, ErrorKind::Timeout), RetryDecision::RetryAfter(_)));
        assert_eq!(p.decide(3, ErrorKind::Timeout), RetryDecision::NoRetry);
    }
}
