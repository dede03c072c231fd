//! Placeholder in-process `Asr` used when no remote transcription runner
//! is configured (`transcribe_runner_url` unset) and no local ASR model is
//! wired in. Every call fails, which the transcribe stage already treats
//! as "no usable transcript" via the sentinel-transcript convention rather
//! than a hard item failure.

use async_trait::async_trait;
use vodq_core::capabilities::{Asr, AsrResult, ProgressCb};

pub struct NullAsr;

#[async_trait]
impl Asr for NullAsr {
    async fn transcribe_segments(
        &self,
        _chunks: &[Vec<f32>],
        _chunk_meta: &[(f64, f64)],
        _language: Option<&str>,
        _progress_cb: &ProgressCb<'_>,
        _sample_rate: u32,
    ) -> anyhow::Result<AsrResult> {
        anyhow::bail!("no in-process ASR backend configured; set transcribe_runner_url to use a remote runner")
    }
}
