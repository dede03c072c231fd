//! Capability interfaces consumed by the core (spec §6).
//!
//! The core depends only on these traits, never on a concrete downloader,
//! ASR library, or LLM client — the same separation the resolver trait draws
//! between the downloader and any particular resolver plugin.

use crate::error::{DownloadError, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata captured by a successful download (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadMetadata {
    pub id: String,
    pub title: String,
    pub duration: Option<f64>,
    pub file_path: String,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub upload_date: Option<String>,
    pub channel_id: Option<String>,
    pub channel: Option<String>,
    pub uploader_id: Option<String>,
    pub uploader: Option<String>,
    pub view_count: Option<i64>,
    pub like_count: Option<i64>,
    pub subtitle_text: Option<String>,
}

/// Callback invoked with fractional progress in `[0.0, 1.0]` as a capability
/// makes headway; stage executors remap this into their progress band.
pub type ProgressCb<'a> = dyn Fn(f64) + Send + Sync + 'a;

#[async_trait]
pub trait Downloader: Send + Sync {
    /// `format_hint` is `None` on the first attempt (implementation picks
    /// its normal default selector) and `Some("bestvideo+bestaudio/best")`
    /// on the one local retry the download stage makes after a
    /// `format_unavailable` error (spec §4.3).
    async fn download(
        &self,
        url: &str,
        format_hint: Option<&str>,
        progress_cb: &ProgressCb<'_>,
    ) -> Result<DownloadMetadata, DownloadError>;
}

/// The looser format selector the download stage retries with after a
/// `format_unavailable` error (spec §4.3).
pub const LOOSE_FORMAT_SELECTOR: &str = "bestvideo+bestaudio/best";

#[async_trait]
pub trait AudioConverter: Send + Sync {
    /// Extract mono 16 kHz PCM WAV from a media file. Returns the WAV path.
    async fn convert_to_audio(&self, video_path: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe the duration of a WAV file in seconds; `None` if it cannot be determined.
    async fn probe_duration(&self, wav_path: &str) -> Option<f64>;
}

/// One timestamped ASR segment in chunk-local or global time, depending on caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrResult {
    pub text: String,
    pub language: String,
    pub language_probability: Option<f64>,
    pub segments: Vec<AsrSegment>,
}

#[async_trait]
pub trait Asr: Send + Sync {
    /// Transcribe pre-sliced audio chunks. `chunk_meta[i]` gives the
    /// `(offset, duration)` of `chunks[i]` in the original audio; segments
    /// returned are chunk-local and must be globalized by the caller.
    async fn transcribe_segments(
        &self,
        chunks: &[Vec<f32>],
        chunk_meta: &[(f64, f64)],
        language: Option<&str>,
        progress_cb: &ProgressCb<'_>,
        sample_rate: u32,
    ) -> anyhow::Result<AsrResult>;
}

#[async_trait]
pub trait Llm: Send + Sync {
    /// Insert punctuation and paragraph breaks into a raw transcript.
    async fn format_transcript(&self, text: &str, language: &str) -> Result<String, LlmError>;
    /// Produce a summary in the given language.
    async fn generate_summary(&self, text: &str, language: &str) -> Result<String, LlmError>;
    /// Produce a comma-separated, lowercase-normalized keyword list.
    async fn generate_keywords(
        &self,
        transcript: &str,
        title: &str,
        language: &str,
    ) -> Result<String, LlmError>;
}

/// Result of resolving a channel URL to a stable id.
#[derive(Debug, Clone)]
pub struct ResolvedChannel {
    pub channel_id: Option<String>,
    pub channel_title: Option<String>,
}

#[async_trait]
pub trait ChannelService: Send + Sync {
    async fn resolve_channel(&self, url: &str) -> anyhow::Result<ResolvedChannel>;
    async fn fetch_latest_video_urls(&self, url: &str, max: usize) -> anyhow::Result<Vec<String>>;
}

/// Thumbnail extraction, called by the download stage right after metadata
/// persistence (SPEC_FULL supplement 1). Best-effort: a failure is logged by
/// the caller and does not fail the download stage.
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    /// Extract one frame near the start of `video_path` and write it under
    /// the configured thumbnails directory, keyed by `video_id`. Returns the
    /// local path written.
    async fn generate_thumbnail(&self, video_path: &str, video_id: &str) -> anyhow::Result<String>;
}
