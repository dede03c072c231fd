use crate::error::DownloadErrorKind;
use std::time::Duration;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Download retry policy (spec §4.3, §7): two knobs, `max_attempts` (default
/// 1 — no automatic retry unless configured) and `base_delay` for exponential
/// back-off. Only `Retryable` errors are retried; every other kind is a
/// one-shot classification handled by the stage executor directly.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(max_attempts: u32, base_delay_seconds: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_secs(base_delay_seconds),
            ..Self::default()
        }
    }

    /// Compute the next backoff delay for a given attempt and error kind.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when we should stop retrying or when the error kind is not the
    /// `Retryable` one the download stage bounds with back-off.
    pub fn decide(&self, attempt: u32, kind: DownloadErrorKind) -> RetryDecision {
        if kind != DownloadErrorKind::Retryable {
            return RetryDecision::NoRetry;
        }
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        let exp = 1u32 << attempt.saturating_sub(1).min(8);
        let raw = self.base_delay.saturating_mul(exp);
        RetryDecision::RetryAfter(raw.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_max_attempts_is_one_means_no_auto_retry() {
        let p = RetryPolicy::default();
        assert_eq!(
            p.decide(1, DownloadErrorKind::Retryable),
            RetryDecision::NoRetry
        );
    }

    #[test]
    fn non_retryable_kinds_never_retry_regardless_of_attempts() {
        let p = RetryPolicy::from_config(5, 1);
        assert_eq!(
            p.decide(1, DownloadErrorKind::Blocked),
            RetryDecision::NoRetry
        );
        assert_eq!(
            p.decide(1, DownloadErrorKind::MembershipOnly),
            RetryDecision::NoRetry
        );
    }

    #[test]
    fn exponential_backoff_grows_and_is_capped() {
        let p = RetryPolicy::from_config(20, 1);
        let d1 = match p.decide(1, DownloadErrorKind::Retryable) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        let d2 = match p.decide(2, DownloadErrorKind::Retryable) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        assert!(d2 >= d1);
        let d_last = match p.decide(10, DownloadErrorKind::Retryable) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        assert!(d_last <= p.max_delay);
    }

    #[test]
    fn respects_max_attempts() {
        let p = RetryPolicy::from_config(3, 1);
        assert!(matches!(
            p.decide(1, DownloadErrorKind::Retryable),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            p.decide(2, DownloadErrorKind::Retryable),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(
            p.decide(3, DownloadErrorKind::Retryable),
            RetryDecision::NoRetry
        );
    }
}
