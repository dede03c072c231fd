//! Structured error taxonomy shared by stage executors, the retry policy,
//! and the Download Gate (see spec §7).

use std::fmt;

/// Discriminants a `Downloader` capability can raise (spec §6, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadErrorKind {
    /// Source demands bot-check / sign-in / captcha. Counted by the Gate.
    Blocked,
    /// Membership-only or otherwise permanently unavailable source.
    MembershipOnly,
    /// The requested format selector had no match; retried once, looser.
    FormatUnavailable,
    /// A live stream was detected by the pre-check.
    LiveStream,
    /// Timeouts, 429/5xx, transient network failures.
    Retryable,
    /// Anything else; not retried automatically.
    Other,
}

/// Error raised by the `Downloader` capability.
#[derive(Debug)]
pub struct DownloadError {
    pub kind: DownloadErrorKind,
    pub message: String,
}

impl DownloadError {
    pub fn new(kind: DownloadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Second-chance classification against known membership-only phrasing,
    /// layered underneath the structured `kind` the downloader already gave us.
    /// Mirrors `looks_like_membership_only_error` in the original service: even
    /// a `Retryable`/`Other` error gets checked against known phrasing before
    /// falling through to `failed`.
    pub fn reclassify_membership_only(mut self) -> Self {
        if self.kind == DownloadErrorKind::MembershipOnly {
            return self;
        }
        let haystack = self.message.to_lowercase();
        const NEEDLES: &[&str] = &[
            "members-only",
            "members only",
            "join this channel",
            "this video is available to this channel's members",
        ];
        if NEEDLES.iter().any(|n| haystack.contains(n)) {
            self.kind = DownloadErrorKind::MembershipOnly;
        }
        self
    }
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DownloadError {}

/// Error raised by the LLM capability (`format_transcript`, `generate_summary`,
/// `generate_keywords`). Transient failures keep the item in `summarizing` for
/// retry on the next scheduler tick (spec §4.3, §7).
#[derive(Debug)]
pub struct LlmError {
    pub message: String,
    pub transient: bool,
}

impl LlmError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LlmError {}

/// Error raised by the Transcription Dispatcher / Runner Protocol Client.
#[derive(Debug)]
pub enum RunnerError {
    /// The runner itself reported a failed job.
    JobFailed(String),
    /// We never reached a terminal status before the overall job timeout.
    Timeout,
    /// Transport-level failure talking to the runner (connection, decode, etc).
    Transport(String),
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::JobFailed(msg) => write!(f, "runner job failed: {msg}"),
            RunnerError::Timeout => write!(f, "runner job timed out"),
            RunnerError::Transport(msg) => write!(f, "runner transport error: {msg}"),
        }
    }
}

impl std::error::Error for RunnerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reclassifies_membership_only_from_message() {
        let err = DownloadError::new(
            DownloadErrorKind::Other,
            "This video is available to this channel's members".to_string(),
        )
        .reclassify_membership_only();
        assert_eq!(err.kind, DownloadErrorKind::MembershipOnly);
    }

    #[test]
    fn leaves_unrelated_errors_alone() {
        let err = DownloadError::new(DownloadErrorKind::Retryable, "connection reset".to_string())
            .reclassify_membership_only();
        assert_eq!(err.kind, DownloadErrorKind::Retryable);
    }
}
