//! Transcription Dispatcher (C4, spec §4.5): routes transcription either to
//! in-process ASR or to a remote GPU runner pool, globalizing chunk-local
//! segment timestamps either way.
//!
//! Modeled as the tagged variant the design notes call for: `Asr =
//! InProcess(AsrCap) | Remote(RunnerClient)`, both satisfying the same
//! `Asr` capability the transcribe stage executor already depends on (spec
//! §4.5 design note).

use super::queue::{ChunkJob, RemoteQueue};
use crate::capabilities::{Asr, AsrResult, AsrSegment, ProgressCb};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

enum Mode {
    InProcess(Arc<dyn Asr>),
    Remote(RemoteQueue),
}

/// Routes transcription work for a whole item's chunk list. Implements
/// `Asr` itself so stage executors hold one capability regardless of mode.
pub struct TranscriptionDispatcher {
    mode: Mode,
}

impl TranscriptionDispatcher {
    pub fn in_process(asr: Arc<dyn Asr>) -> Self {
        Self {
            mode: Mode::InProcess(asr),
        }
    }

    pub fn remote(queue: RemoteQueue) -> Self {
        Self {
            mode: Mode::Remote(queue),
        }
    }

    /// Transcribe a single chunk, returning segments local to that chunk
    /// (starting at zero). The caller offsets by the chunk's true position
    /// in the original audio (spec §4.5, §8 property 7).
    async fn transcribe_one_chunk(
        &self,
        samples: &[f32],
        sample_rate: u32,
        language: Option<&str>,
    ) -> Result<AsrResult> {
        match &self.mode {
            Mode::InProcess(asr) => {
                let duration = samples.len() as f64 / sample_rate.max(1) as f64;
                let single_chunk = [samples.to_vec()];
                asr.transcribe_segments(&single_chunk, &[(0.0, duration)], language, &|_| {}, sample_rate)
                    .await
            }
            Mode::Remote(queue) => {
                let wav_path = write_chunk_to_temp_wav(samples, sample_rate)?;
                let (tx, rx) = oneshot::channel();
                queue
                    .submit(ChunkJob {
                        wav_path: wav_path.clone(),
                        language: language.map(str::to_string),
                        respond_to: tx,
                    })
                    .await;
                let result = rx.await.context("runner dispatch worker dropped without replying")?;
                let _ = tokio::fs::remove_file(&wav_path).await;
                result.map_err(Into::into)
            }
        }
    }
}

#[async_trait]
impl Asr for TranscriptionDispatcher {
    async fn transcribe_segments(
        &self,
        chunks: &[Vec<f32>],
        chunk_meta: &[(f64, f64)],
        language: Option<&str>,
        progress_cb: &ProgressCb<'_>,
        sample_rate: u32,
    ) -> Result<AsrResult> {
        if chunks.is_empty() {
            return Ok(AsrResult {
                text: String::new(),
                language: language.unwrap_or_default().to_string(),
                language_probability: None,
                segments: Vec::new(),
            });
        }

        let mut texts = Vec::with_capacity(chunks.len());
        let mut segments = Vec::new();
        let mut detected_language: Option<String> = None;
        let mut detected_probability = None;

        for (i, chunk) in chunks.iter().enumerate() {
            let (offset, _duration) = chunk_meta.get(i).copied().unwrap_or((0.0, 0.0));
            let local = self.transcribe_one_chunk(chunk, sample_rate, language).await?;

            if detected_language.is_none() && !local.language.is_empty() {
                detected_language = Some(local.language.clone());
                detected_probability = local.language_probability;
            }
            if !local.text.is_empty() {
                texts.push(local.text);
            }
            segments.extend(local.segments.into_iter().map(|s| AsrSegment {
                start: s.start + offset,
                end: s.end + offset,
                text: s.text,
            }));

            progress_cb((i + 1) as f64 / chunks.len() as f64);
        }

        Ok(AsrResult {
            text: texts.join(" "),
            language: detected_language.unwrap_or_else(|| language.unwrap_or_default().to_string()),
            language_probability: detected_probability,
            segments,
        })
    }
}

fn write_chunk_to_temp_wav(samples: &[f32], sample_rate: u32) -> Result<String> {
    let path = std::env::temp_dir().join(format!("vodq-chunk-{}.wav", Uuid::new_v4()));
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec)
        .with_context(|| format!("create temp chunk wav: {}", path.display()))?;
    for s in samples {
        writer.write_sample(*s)?;
    }
    writer.finalize().context("finalize temp chunk wav")?;
    Ok(path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::AsrSegment as Seg;

    struct StubAsr {
        language: String,
    }

    #[async_trait]
    impl Asr for StubAsr {
        async fn transcribe_segments(
            &self,
            chunks: &[Vec<f32>],
            _chunk_meta: &[(f64, f64)],
            _language: Option<&str>,
            _progress_cb: &ProgressCb<'_>,
            _sample_rate: u32,
        ) -> Result<AsrResult> {
            Ok(AsrResult {
                text: format!("chunk-{}", chunks[0].len()),
                language: self.language.clone(),
                language_probability: Some(0.9),
                segments: vec![Seg {
                    start: 0.0,
                    end: 1.0,
                    text: "hi".to_string(),
                }],
            })
        }
    }

    #[tokio::test]
    async fn in_process_globalizes_segment_offsets() {
        let dispatcher = TranscriptionDispatcher::in_process(Arc::new(StubAsr {
            language: "en".to_string(),
        }));
        let chunks = vec![vec![0.0f32; 16_000], vec![0.0f32; 16_000]];
        let chunk_meta = vec![(0.0, 1.0), (30.0, 1.0)];
        let result = dispatcher
            .transcribe_segments(&chunks, &chunk_meta, None, &|_| {}, 16_000)
            .await
            .unwrap();
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[0].start, 0.0);
        assert_eq!(result.segments[1].start, 30.0);
        assert_eq!(result.segments[1].end, 31.0);
        assert_eq!(result.language, "en");
    }

    #[tokio::test]
    async fn empty_chunks_short_circuit() {
        let dispatcher = TranscriptionDispatcher::in_process(Arc::new(StubAsr {
            language: "en".to_string(),
        }));
        let result = dispatcher
            .transcribe_segments(&[], &[], None, &|_| {}, 16_000)
            .await
            .unwrap();
        assert!(result.text.is_empty());
        assert!(result.segments.is_empty());
    }
}
