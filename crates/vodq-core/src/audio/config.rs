//! Audio pipeline configuration (spec §4.4, §6 "Audio" config surface).

/// VAD tuning knobs, lifted straight from the enumerated config surface:
/// `vad_threshold`, `vad_min_silence_duration_ms`, `vad_speech_pad_ms`,
/// `vad_max_speech_duration_s`.
#[derive(Debug, Clone, Copy)]
pub struct VadConfig {
    /// Energy threshold in `[0.0, 1.0]` above which a frame is "speech".
    pub threshold: f32,
    pub min_silence_duration_ms: u32,
    pub speech_pad_ms: u32,
    pub max_speech_duration_s: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_silence_duration_ms: 500,
            speech_pad_ms: 200,
            max_speech_duration_s: 30.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioPipelineConfig {
    pub target_sample_rate: u32,
    pub enable_denoise: bool,
    pub denoise_backend: String,
    pub vad: VadConfig,
}

impl Default for AudioPipelineConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16_000,
            enable_denoise: false,
            denoise_backend: "none".to_string(),
            vad: VadConfig::default(),
        }
    }
}

impl From<&crate::config::VodqConfig> for AudioPipelineConfig {
    fn from(cfg: &crate::config::VodqConfig) -> Self {
        Self {
            target_sample_rate: cfg.audio_target_sample_rate,
            enable_denoise: cfg.audio_enable_denoise,
            denoise_backend: cfg.audio_denoise_backend.clone(),
            vad: VadConfig {
                threshold: cfg.vad_threshold,
                min_silence_duration_ms: cfg.vad_min_silence_duration_ms,
                speech_pad_ms: cfg.vad_speech_pad_ms,
                max_speech_duration_s: cfg.vad_max_speech_duration_s,
            },
        }
    }
}
