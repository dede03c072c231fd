//! Retry loop: run an async closure until success or policy says stop.

use super::policy::{RetryDecision, RetryPolicy};
use crate::error::DownloadError;
use std::future::Future;

/// Runs `f` until it succeeds or the retry policy says to stop, sleeping for
/// the computed backoff between attempts. Used by the download stage
/// executor to bound `retryable_network` failures (spec §4.3) — generic
/// over the success type so a single attempt can still hand back the
/// downloader's metadata on an eventual success.
pub async fn run_with_retry<T, F, Fut>(policy: &RetryPolicy, mut f: F) -> Result<T, DownloadError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DownloadError>>,
{
    let mut attempt = 1u32;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let decision = policy.decide(attempt, e.kind);
                match decision {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(attempt, ?d, "retrying transient download failure");
                        tokio::time::sleep(d).await;
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
    use crate::error::DownloadErrorKind;
    use std::cell::Cell;
    use std::time::Duration;

    #[tokio::test]
    async fn stops_immediately_for_non_retryable_kind() {
        let policy = RetryPolicy::from_config(5, 1);
        let calls = Cell::new(0);
        let result: Result<(), DownloadError> = run_with_retry(&policy, || {
            calls.set(calls.get() + 1);
            async { Err(DownloadError::new(DownloadErrorKind::Blocked, "blocked")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn retries_retryable_kind_up_to_max_attempts() {
        let policy = RetryPolicy::from_config(3, 0);
        let calls = Cell::new(0);
        let result: Result<(), DownloadError> = run_with_retry(&policy, || {
            calls.set(calls.get() + 1);
            async { Err(DownloadError::new(DownloadErrorKind::Retryable, "timeout")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn succeeds_after_a_retry() {
        let policy = RetryPolicy::from_config(3, 0);
        let calls = Cell::new(0);
        let result: Result<(), DownloadError> = run_with_retry(&policy, || {
            let n = calls.get() + 1;
            calls.set(n);
            async move {
                if n < 2 {
                    Err(DownloadError::new(DownloadErrorKind::Retryable, "timeout"))
                } else {
                    Ok(())
                }
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.get(), 2);
        let _ = Duration::from_secs(0);
    }
}
