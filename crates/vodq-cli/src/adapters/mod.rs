//! Concrete capability implementations the binary wires behind the
//! `vodq-core` capability traits (spec §6): `yt-dlp` for download/channel
//! metadata, `ffmpeg`/`ffprobe` for audio conversion/probing/thumbnails,
//! Ollama for the LLM, and either the null in-process ASR or a remote
//! runner client depending on configuration.

mod ffmpeg;
mod ffprobe;
mod null_asr;
mod ollama;
mod ytdlp;

pub use ffmpeg::{FfmpegConverter, FfmpegThumbnailGenerator};
pub use ffprobe::FfprobeProber;
pub use null_asr::NullAsr;
pub use ollama::OllamaLlm;
pub use ytdlp::{YtDlpChannelService, YtDlpDownloader};

use std::sync::Arc;
use vodq_core::config::VodqConfig;
use vodq_core::dispatch::{RemoteQueue, TranscriptionDispatcher};
use vodq_core::runner::{RunnerClient, RunnerClientConfig};
use vodq_core::stages::Capabilities;

/// Build the full `Capabilities` bundle from config: `yt-dlp`/`ffmpeg`
/// process adapters, Ollama for the LLM, and the Transcription Dispatcher
/// wired for either remote-runner mode or the (ASR-less) in-process
/// fallback, per `transcribe_runner_url` (spec §4.5 design note).
pub fn build_capabilities(cfg: &VodqConfig) -> Arc<Capabilities> {
    let asr: Arc<TranscriptionDispatcher> = match &cfg.transcribe_runner_url {
        Some(base_url) => {
            let client = Arc::new(RunnerClient::new(RunnerClientConfig {
                base_url: base_url.clone(),
                poll_interval: std::time::Duration::from_secs(cfg.transcribe_runner_poll_interval_seconds.max(1)),
                overall_timeout: std::time::Duration::from_secs(cfg.transcribe_runner_timeout_seconds.max(1)),
            }));
            let queue = RemoteQueue::spawn(client, cfg.transcribe_runner_concurrency.max(1));
            Arc::new(TranscriptionDispatcher::remote(queue))
        }
        None => Arc::new(TranscriptionDispatcher::in_process(Arc::new(NullAsr))),
    };

    Arc::new(Capabilities {
        downloader: Arc::new(YtDlpDownloader::new(cfg.video_storage_dir.clone())),
        converter: Arc::new(FfmpegConverter {
            target_sample_rate: cfg.audio_target_sample_rate,
        }),
        prober: Arc::new(FfprobeProber),
        thumbnails: Arc::new(FfmpegThumbnailGenerator {
            thumbnails_dir: cfg.video_storage_dir.join("thumbnails"),
        }),
        asr,
        llm: Arc::new(OllamaLlm::new(cfg.ollama_url.clone(), cfg.llm_model.clone())),
        channels: Arc::new(YtDlpChannelService),
    })
}
