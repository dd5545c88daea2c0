use std::time::Duration;

/// High-level classification of a failed attempt for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/transfer).
    Timeout,
    /// Server asked us to slow down (429, 503).
    Throttled,
    /// Network-level failure (connection refused/reset, DNS, TLS handshake).
    Connection,
    /// Other status listed as retryable (typically 5xx).
    RetryableStatus(u32),
    /// Anything else; never retried.
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Retry budget plus exponential backoff with a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt (0 disables retrying).
    pub max_retries: u32,
    /// Delay before the first retry; doubles per retry.
    pub base_delay: Duration,
    /// Upper bound on any delay, including server-requested ones.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Decide whether to retry after `retries_done` retries have already happened.
    pub fn decide(&self, retries_done: u32, kind: ErrorKind) -> RetryDecision {
        if retries_done >= self.max_retries {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::RetryableStatus(_) => RetryDecision::RetryAfter(self.backoff(retries_done + 1)),
        }
    }

    /// Backoff before retry number `retry` (1-based): base * 2^(retry-1), capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = 1u32 << retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(exp).min(self.max_delay)
    }

    /// Clamp a server-requested delay to `max_delay`.
    pub fn clamp(&self, requested: Duration) -> Duration {
        requested.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn no_retry_for_other() {
        assert_eq!(policy(3).decide(0, ErrorKind::Other), RetryDecision::NoRetry);
    }

    #[test]
    fn zero_budget_never_retries() {
        assert_eq!(policy(0).decide(0, ErrorKind::Timeout), RetryDecision::NoRetry);
    }

    #[test]
    fn exponential_backoff_grows_and_is_capped() {
        let p = policy(40);
        assert_eq!(p.backoff(1), Duration::from_millis(250));
        assert_eq!(p.backoff(2), Duration::from_millis(500));
        assert_eq!(p.backoff(3), Duration::from_secs(1));
        assert_eq!(p.backoff(30), p.max_delay);
        assert_eq!(
            p.decide(1, ErrorKind::Connection),
            RetryDecision::RetryAfter(Duration::from_millis(500))
        );
    }

    #[test]
    fn respects_max_retries() {
        let p = policy(2);
        assert!(matches!(p.decide(0, ErrorKind::Throttled), RetryDecision::RetryAfter(_)));
        assert!(matches!(
            p.decide(1, ErrorKind::RetryableStatus(502)),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(p.decide(2, ErrorKind::Throttled), RetryDecision::NoRetry);
    }

    #[test]
    fn clamp_caps_requested_delay() {
        let p = policy(1);
        assert_eq!(p.clamp(Duration::from_secs(3600)), p.max_delay);
        assert_eq!(p.clamp(Duration::from_secs(1)), Duration::from_secs(1));
    }
}
