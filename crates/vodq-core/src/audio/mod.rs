//! Audio Pipeline (spec §4.4): load WAV, resample, optionally denoise, run
//! VAD, then slice into chunks bounded by `max_speech_duration_s`. A pure
//! function of the WAV file's contents plus configuration — no network or
//! database I/O, so it is safe to run under `spawn_blocking` from a heavy-
//! processing pool slot.

mod chunk;
mod config;
mod denoise;
mod pipeline;
mod resample;
mod vad;
mod wav;

pub use chunk::collect_chunks;
pub use config::{AudioPipelineConfig, VadConfig};
pub use pipeline::run_pipeline;
pub use vad::SpeechSegment;
pub use wav::probe_wav_duration;
