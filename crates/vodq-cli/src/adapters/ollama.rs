//! Ollama HTTP adapter: `Llm` (spec §6 `ollama_url` / `llm_model`).

use async_trait::async_trait;
use serde_json::json;
use vodq_core::capabilities::Llm;
use vodq_core::error::LlmError;

pub struct OllamaLlm {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaLlm {
    pub fn new(base_url: String, model: String) -> Self {
        Self { http: reqwest::Client::new(), base_url, model }
    }

    async fn generate(&self, prompt: String) -> Result<String, LlmError> {
        let resp = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
            }))
            .send()
            .await
            .map_err(|e| LlmError::transient(format!("ollama request failed: {e}")))?;

        if resp.status().is_server_error() {
            return Err(LlmError::transient(format!("ollama returned {}", resp.status())));
        }
        if !resp.status().is_success() {
            return Err(LlmError::permanent(format!("ollama returned {}", resp.status())));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| LlmError::transient(format!("invalid ollama response body: {e}")))?;
        body.get("response")
            .and_then(|r| r.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| LlmError::permanent("ollama response missing `response` field"))
    }
}

#[async_trait]
impl Llm for OllamaLlm {
    async fn format_transcript(&self, text: &str, language: &str) -> Result<String, LlmError> {
        let prompt = format!(
            "Add punctuation and paragraph breaks to this {language} transcript. \
             Do not change, summarize, or translate any words, only add punctuation:\n\n{text}"
        );
        self.generate(prompt).await
    }

    async fn generate_summary(&self, text: &str, language: &str) -> Result<String, LlmError> {
        let prompt = format!("Summarize the following transcript in {language}, in a few sentences:\n\n{text}");
        self.generate(prompt).await
    }

    async fn generate_keywords(&self, transcript: &str, title: &str, language: &str) -> Result<String, LlmError> {
        let prompt = format!(
            "Given the title \"{title}\" and transcript below, produce a comma-separated list of 5-10 \
             lowercase keywords in {language}. Output only the comma-separated list.\n\n{transcript}"
        );
        let raw = self.generate(prompt).await?;
        Ok(raw
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect::<Vec<_>>()
            .join(", "))
    }
}
