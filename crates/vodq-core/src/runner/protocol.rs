//! Wire contract for the remote transcription runner (C9, spec §4.9).
//!
//! The runner itself is a separate collaborator; this module only carries
//! the shapes the Runner Protocol Client (C8) sends and parses.

use crate::capabilities::AsrSegment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Response to `POST /transcribe`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
}

/// Response to `GET /transcribe/{job_id}` while the job has not reached a
/// terminal state.
#[derive(Debug, Clone, Deserialize)]
pub struct PollResponse {
    pub status: JobStatus,
    /// Approximation in `[0, 1]`, monotone, present on non-terminal polls.
    #[serde(default)]
    pub progress: Option<f64>,
    /// Present only once `status == Completed`.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Globally timestamped, in seconds (the runner's responsibility).
    #[serde(default)]
    pub segments: Option<Vec<AsrSegment>>,
    /// Present only once `status == Failed`.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// `language: "unknown"` or empty must never be forwarded to the runner —
/// it autodetects when no hint is given (spec §4.9 "Language normalization").
pub fn normalize_language(language: Option<&str>) -> Option<String> {
    language
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("unknown"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_normalizes_to_none() {
        assert_eq!(normalize_language(Some("unknown")), None);
        assert_eq!(normalize_language(Some("Unknown")), None);
        assert_eq!(normalize_language(Some("")), None);
        assert_eq!(normalize_language(Some("  ")), None);
        assert_eq!(normalize_language(None), None);
    }

    #[test]
    fn real_language_hint_passes_through() {
        assert_eq!(normalize_language(Some("en")), Some("en".to_string()));
    }

    #[test]
    fn poll_response_parses_terminal_success() {
        let body = r#"{"status":"completed","text":"hi","language":"en","segments":[{"start":0.0,"end":1.0,"text":"hi"}]}"#;
        let resp: PollResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.status, JobStatus::Completed);
        assert_eq!(resp.text.as_deref(), Some("hi"));
        assert_eq!(resp.segments.unwrap().len(), 1);
    }

    #[test]
    fn poll_response_parses_non_terminal() {
        let body = r#"{"status":"processing","progress":0.4}"#;
        let resp: PollResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.status, JobStatus::Processing);
        assert_eq!(resp.progress, Some(0.4));
        assert!(resp.text.is_none());
    }
}
