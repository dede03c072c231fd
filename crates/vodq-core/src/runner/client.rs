//! Runner Protocol Client (C8, spec §4.9): submit a WAV, poll until
//! terminal, collect the transcript.

use super::protocol::{HealthResponse, JobStatus, PollResponse, SubmitResponse};
use crate::capabilities::AsrResult;
use crate::error::RunnerError;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RunnerClientConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    pub overall_timeout: Duration,
}

pub struct RunnerClient {
    http: reqwest::Client,
    cfg: RunnerClientConfig,
}

impl RunnerClient {
    pub fn new(cfg: RunnerClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            cfg,
        }
    }

    pub async fn health(&self) -> Result<bool, RunnerError> {
        let url = format!("{}/health", self.cfg.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RunnerError::Transport(e.to_string()))?
            .json::<HealthResponse>()
            .await
            .map_err(|e| RunnerError::Transport(e.to_string()))?;
        Ok(resp.status == "ok")
    }

    async fn submit(&self, wav_path: &str, language: Option<&str>) -> Result<String, RunnerError> {
        let bytes = tokio::fs::read(wav_path)
            .await
            .map_err(|e| RunnerError::Transport(format!("read wav: {e}")))?;
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| RunnerError::Transport(e.to_string()))?;
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(lang) = super::protocol::normalize_language(language) {
            form = form.text("language", lang);
        }

        let url = format!("{}/transcribe", self.cfg.base_url);
        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RunnerError::Transport(e.to_string()))?;
        let body: SubmitResponse = resp
            .json()
            .await
            .map_err(|e| RunnerError::Transport(e.to_string()))?;
        Ok(body.job_id)
    }

    async fn poll_once(&self, job_id: &str) -> Result<PollResponse, RunnerError> {
        let url = format!("{}/transcribe/{job_id}", self.cfg.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RunnerError::Transport(e.to_string()))?;
        resp.json::<PollResponse>()
            .await
            .map_err(|e| RunnerError::Transport(e.to_string()))
    }

    /// Submit, poll until terminal, and return the transcript. Bounded by
    /// the client's configured overall timeout (spec §5 "Runner polling").
    pub async fn transcribe(
        &self,
        wav_path: &str,
        language: Option<&str>,
    ) -> Result<AsrResult, RunnerError> {
        let job_id = self.submit(wav_path, language).await?;
        let deadline = tokio::time::Instant::now() + self.cfg.overall_timeout;

        loop {
            if tokio::time::Instant::now() >= deadline {
                return Err(RunnerError::Timeout);
            }
            let poll = self.poll_once(&job_id).await?;
            match poll.status {
                JobStatus::Completed => {
                    return Ok(AsrResult {
                        text: poll.text.unwrap_or_default(),
                        language: poll.language.unwrap_or_default(),
                        language_probability: None,
                        segments: poll.segments.unwrap_or_default(),
                    });
                }
                JobStatus::Failed => {
                    return Err(RunnerError::JobFailed(
                        poll.error.unwrap_or_else(|| "unknown runner failure".to_string()),
                    ));
                }
                JobStatus::Pending | JobStatus::Processing => {
                    let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                    tokio::time::sleep(self.cfg.poll_interval.min(remaining)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_carries_expected_defaults_shape() {
        let cfg = RunnerClientConfig {
            base_url: "http://localhost:8090".to_string(),
            poll_interval: Duration::from_secs(30),
            overall_timeout: Duration::from_secs(7_200),
        };
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        let _client = RunnerClient::new(cfg);
    }
}
