//! Download Gate (C2, spec §4.7): process-wide pacing and a pause-on-blocked
//! circuit breaker over all outbound download calls.
//!
//! Intentionally process-global rather than per-user or per-host: the
//! external source that imposes the block is not user-aware, so neither is
//! the gate (spec §4.7, design note).

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A config of `0` for the pause duration means "until process restart",
/// modeled as a century in the future (spec §4.7).
const CENTURY: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// How often the "downloads are paused" warning may be logged while a pause
/// is in effect, to avoid log spam across many idle ticks (SPEC_FULL
/// supplement 5, mirroring the original's `_last_pause_log_at`).
const PAUSE_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Max single sleep increment while waiting out a pause, so a shutdown
/// signal or config change is never more than this long from being noticed.
const PAUSE_POLL_INCREMENT: Duration = Duration::from_secs(5);

struct GateState {
    paused_until: Option<Instant>,
    blocked_failures: u32,
    last_download_started_at: Option<Instant>,
    last_pause_log_at: Option<Instant>,
}

/// Shared download gate. Cloning shares the same underlying state.
#[derive(Clone)]
pub struct DownloadGate {
    state: Arc<Mutex<GateState>>,
    threshold: u32,
    pause_duration: Duration,
    min_interval: Duration,
}

impl DownloadGate {
    pub fn new(threshold: u32, pause_seconds: u64, min_interval_seconds: u64) -> Self {
        let pause_duration = if pause_seconds == 0 {
            CENTURY
        } else {
            Duration::from_secs(pause_seconds)
        };
        Self {
            state: Arc::new(Mutex::new(GateState {
                paused_until: None,
                blocked_failures: 0,
                last_download_started_at: None,
                last_pause_log_at: None,
            })),
            threshold: threshold.max(1),
            pause_duration,
            min_interval: Duration::from_secs(min_interval_seconds),
        }
    }

    /// Blocks in small increments until any active pause expires, then
    /// zeros the blocked-failure counter (spec §4.7).
    pub async fn wait_if_paused(&self) {
        loop {
            let remaining = {
                let mut st = self.state.lock().await;
                match st.paused_until {
                    Some(until) if until > Instant::now() => {
                        let remaining = until - Instant::now();
                        let should_log = st
                            .last_pause_log_at
                            .map(|t| t.elapsed() >= PAUSE_LOG_INTERVAL)
                            .unwrap_or(true);
                        if should_log {
                            st.last_pause_log_at = Some(Instant::now());
                        }
                        Some((remaining, should_log))
                    }
                    Some(_) => {
                        // Pause window has elapsed; clear it and reset the counter.
                        st.paused_until = None;
                        st.blocked_failures = 0;
                        None
                    }
                    None => None,
                }
            };

            let Some((remaining, should_log)) = remaining else {
                return;
            };
            if should_log {
                tracing::warn!(remaining_secs = remaining.as_secs(), "downloads are paused");
            }
            tokio::time::sleep(remaining.min(PAUSE_POLL_INCREMENT)).await;
        }
    }

    /// Sleeps so the next download start is at least `min_interval` after
    /// the last one (a `min_interval` of zero disables spacing entirely).
    pub async fn wait_for_spacing(&self) {
        if self.min_interval.is_zero() {
            let mut st = self.state.lock().await;
            st.last_download_started_at = Some(Instant::now());
            return;
        }
        let sleep_for = {
            let st = self.state.lock().await;
            st.last_download_started_at
                .map(|last| {
                    let elapsed = last.elapsed();
                    self.min_interval.saturating_sub(elapsed)
                })
                .unwrap_or_default()
        };
        if !sleep_for.is_zero() {
            tokio::time::sleep(sleep_for).await;
        }
        let mut st = self.state.lock().await;
        st.last_download_started_at = Some(Instant::now());
    }

    /// Registers a `blocked` download error. Once the counter reaches
    /// `threshold`, pauses all downloads for `pause_seconds` (spec §4.7).
    pub async fn register_blocked_failure(&self, msg: &str) {
        let mut st = self.state.lock().await;
        st.blocked_failures = st.blocked_failures.saturating_add(1);
        tracing::warn!(count = st.blocked_failures, threshold = self.threshold, %msg, "blocked download error");
        if st.blocked_failures >= self.threshold {
            st.paused_until = Some(Instant::now() + self.pause_duration);
            st.last_pause_log_at = None;
            tracing::error!(
                pause_secs = self.pause_duration.as_secs(),
                "blocked-failure threshold reached; pausing all downloads"
            );
        }
    }

    pub async fn reset_blocked_counter_on_success(&self) {
        let mut st = self.state.lock().await;
        st.blocked_failures = 0;
    }

    /// Current blocked-failure count. Readable without mutation for logging
    /// (spec §5: "readers may read the counter without the lock only for
    /// logging" — this still takes the lock since `tokio::sync::Mutex` has
    /// no lock-free read path, but callers must not treat this as
    /// authoritative for decisions).
    pub async fn blocked_failure_count(&self) -> u32 {
        self.state.lock().await.blocked_failures
    }

    pub async fn is_paused(&self) -> bool {
        self.state
            .lock()
            .await
            .paused_until
            .map(|u| u > Instant::now())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn threshold_pauses_downloads() {
        let gate = DownloadGate::new(3, 3600, 0);
        assert!(!gate.is_paused().await);
        gate.register_blocked_failure("blocked 1").await;
        gate.register_blocked_failure("blocked 2").await;
        assert!(!gate.is_paused().await);
        gate.register_blocked_failure("blocked 3").await;
        assert!(gate.is_paused().await);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_if_paused_blocks_until_window_elapses() {
        let gate = DownloadGate::new(1, 10, 0);
        gate.register_blocked_failure("blocked").await;
        assert!(gate.is_paused().await);

        let waiter = gate.clone();
        let handle = tokio::spawn(async move {
            waiter.wait_if_paused().await;
        });
        tokio::time::advance(Duration::from_secs(11)).await;
        handle.await.unwrap();
        assert!(!gate.is_paused().await);
        assert_eq!(gate.blocked_failure_count().await, 0);
    }

    #[tokio::test]
    async fn reset_on_success_zeros_counter() {
        let gate = DownloadGate::new(3, 3600, 0);
        gate.register_blocked_failure("x").await;
        gate.register_blocked_failure("x").await;
        assert_eq!(gate.blocked_failure_count().await, 2);
        gate.reset_blocked_counter_on_success().await;
        assert_eq!(gate.blocked_failure_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spacing_enforces_minimum_interval() {
        let gate = DownloadGate::new(3, 3600, 2);
        gate.wait_for_spacing().await;
        let start = Instant::now();
        gate.wait_for_spacing().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn zero_pause_seconds_means_century() {
        let gate = DownloadGate::new(1, 0, 0);
        gate.register_blocked_failure("x").await;
        assert!(gate.is_paused().await);
    }
}
