use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// GPU/CPU acceleration backend selected for in-process ASR and the audio
/// pipeline's denoise step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Acceleration {
    Cpu,
    Cuda,
    Mlx,
}

impl Default for Acceleration {
    fn default() -> Self {
        Acceleration::Cpu
    }
}

/// Global configuration loaded from `~/.config/vodq/config.toml` (spec §6's
/// enumerated configuration surface).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VodqConfig {
    // -- storage & model endpoints --
    pub video_storage_dir: PathBuf,
    pub ollama_url: String,
    pub vllm_url: Option<String>,
    pub llm_model: String,
    pub acceleration: Acceleration,

    // -- audio pipeline / VAD --
    pub audio_target_sample_rate: u32,
    pub audio_enable_denoise: bool,
    pub audio_denoise_backend: String,
    pub vad_threshold: f32,
    pub vad_min_silence_duration_ms: u32,
    pub vad_speech_pad_ms: u32,
    pub vad_max_speech_duration_s: f32,

    // -- download stage & gate --
    pub ytdlp_download_max_attempts: u32,
    pub ytdlp_download_retry_backoff_seconds: u64,
    pub queue_download_concurrency: usize,
    pub queue_download_min_interval_seconds: u64,
    pub queue_blocked_threshold: u32,
    pub queue_blocked_pause_seconds: u64,

    // -- heavy-processing pool --
    pub queue_process_concurrency: usize,

    // -- transcription runner --
    pub transcribe_runner_url: Option<String>,
    pub transcribe_runner_timeout_seconds: u64,
    pub transcribe_runner_poll_interval_seconds: u64,
    pub transcribe_runner_concurrency: usize,

    // -- subscriptions --
    pub subscription_check_interval_hours: u64,
    pub subscription_max_videos_per_channel: usize,
    pub pending_subscriptions_interval_seconds: u64,
    pub resolve_channel_timeout_seconds: u64,

    // -- stuck-task supervisor --
    pub supervisor_scan_interval_seconds: u64,
    pub stuck_download_timeout_seconds: u64,
    pub stuck_summarize_timeout_seconds: u64,
}

impl Default for VodqConfig {
    fn default() -> Self {
        Self {
            video_storage_dir: default_storage_dir(),
            ollama_url: "http://localhost:11434".to_string(),
            vllm_url: None,
            llm_model: "qwen2.5:7b".to_string(),
            acceleration: Acceleration::Cpu,

            audio_target_sample_rate: 16_000,
            audio_enable_denoise: false,
            audio_denoise_backend: "none".to_string(),
            vad_threshold: 0.5,
            vad_min_silence_duration_ms: 500,
            vad_speech_pad_ms: 200,
            vad_max_speech_duration_s: 30.0,

            ytdlp_download_max_attempts: 1,
            ytdlp_download_retry_backoff_seconds: 5,
            queue_download_concurrency: 1,
            queue_download_min_interval_seconds: 0,
            queue_blocked_threshold: 3,
            queue_blocked_pause_seconds: 3_600,

            queue_process_concurrency: 1,

            transcribe_runner_url: None,
            transcribe_runner_timeout_seconds: 7_200,
            transcribe_runner_poll_interval_seconds: 30,
            transcribe_runner_concurrency: 1,

            subscription_check_interval_hours: 12,
            subscription_max_videos_per_channel: 10,
            pending_subscriptions_interval_seconds: 30,
            resolve_channel_timeout_seconds: 90,

            supervisor_scan_interval_seconds: 60,
            stuck_download_timeout_seconds: 3_600,
            stuck_summarize_timeout_seconds: 3_600,
        }
    }
}

fn default_storage_dir() -> PathBuf {
    xdg::BaseDirectories::with_prefix("vodq")
        .ok()
        .map(|dirs| dirs.get_data_home().join("videos"))
        .unwrap_or_else(|| PathBuf::from("./videos"))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vodq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VodqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = VodqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: VodqConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = VodqConfig::default();
        assert_eq!(cfg.acceleration, Acceleration::Cpu);
        assert_eq!(cfg.audio_target_sample_rate, 16_000);
        assert_eq!(cfg.queue_blocked_threshold, 3);
        assert_eq!(cfg.ytdlp_download_max_attempts, 1);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = VodqConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: VodqConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.llm_model, cfg.llm_model);
        assert_eq!(parsed.queue_download_concurrency, cfg.queue_download_concurrency);
        assert_eq!(parsed.vad_max_speech_duration_s, cfg.vad_max_speech_duration_s);
    }

    #[test]
    fn config_toml_partial_override_keeps_defaults() {
        let toml = r#"
            llm_model = "llama3:70b"
            acceleration = "cuda"
        "#;
        let cfg: VodqConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.llm_model, "llama3:70b");
        assert_eq!(cfg.acceleration, Acceleration::Cuda);
        // untouched fields retain their Default impl values
        assert_eq!(cfg.queue_download_concurrency, 1);
    }
}
