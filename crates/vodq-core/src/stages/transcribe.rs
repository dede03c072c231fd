//! Transcribe stage executor (spec §4.5): run the Audio Pipeline to chunk
//! speech out of the converted WAV, then dispatch each chunk through the
//! Transcription Dispatcher. Progress band 50–90, ASR sub-band 60–90.
//!
//! A capability failure here does not fail the item outright: per the
//! sentinel-transcript convention (GLOSSARY), the item is left with a
//! sentinel transcript and allowed to proceed to the summarize stage, which
//! recognizes the sentinel and skips straight to completion.

use super::context::ExecCtx;
use super::media;
use crate::audio::{run_pipeline, AudioPipelineConfig};
use crate::capabilities::ProgressCb;
use crate::store::{Item, ItemPatch, Stage};
use anyhow::{Context, Result};

const NO_SPEECH_SENTINEL: &str = "Transcription unavailable (no speech detected)";
const FAILED_SENTINEL: &str = "Transcription unavailable (runner failed or timeout)";

pub async fn execute(ctx: &ExecCtx, item: Item) -> Result<()> {
    let Some(audio_path) = item.audio_file_path.clone() else {
        ctx.store
            .update(
                item.id,
                &ItemPatch::new()
                    .stage(Stage::Failed)
                    .error_message("transcribe stage reached with no audio_file_path"),
            )
            .await?;
        return Ok(());
    };
    let Some(video_id) = item.source_video_id.clone() else {
        ctx.store
            .update(item.id, &ItemPatch::new().stage(Stage::Failed).error_message("missing source video id"))
            .await?;
        return Ok(());
    };

    ctx.store.update(item.id, &ItemPatch::new().stage(Stage::Transcribing).progress(50)).await?;

    // Re-entry: a non-sentinel transcript already on disk means a prior pass
    // already ran ASR to completion — skip straight to summarize rather than
    // re-transcribing (spec §4.2, §4.3(a)).
    let transcript_path = media::transcript_path(&ctx.cfg.video_storage_dir, &video_id);
    if let Ok(existing) = tokio::fs::read_to_string(&transcript_path).await {
        if !media::is_sentinel_transcript(&existing) {
            tracing::info!(item_id = item.id, "transcript already on disk; skipping transcribe");
            ctx.store
                .update(
                    item.id,
                    &ItemPatch::new()
                        .transcript(existing)
                        .transcript_file_path(transcript_path.to_string_lossy().into_owned())
                        .stage(Stage::Summarizing)
                        .progress(95),
                )
                .await?;
            return Ok(());
        }
    }

    let pipeline_cfg = AudioPipelineConfig::from(ctx.cfg.as_ref());
    let sample_rate = pipeline_cfg.target_sample_rate;
    let pipeline_path = audio_path.clone();
    let (chunks, chunk_meta) = tokio::task::spawn_blocking(move || run_pipeline(&pipeline_path, &pipeline_cfg))
        .await
        .context("audio pipeline task panicked")??;

    if chunks.is_empty() {
        return store_sentinel_and_advance(ctx, &item, &video_id, NO_SPEECH_SENTINEL).await;
    }

    // Cap progress writes to avoid amplifying DB traffic across many short
    // chunks: at most one update every 10s, or 30s for audio <= 1h (spec
    // §4.3 "Progress callback semantics").
    let total_duration = ctx.caps.prober.probe_duration(&audio_path).await;
    let min_update_interval = match total_duration {
        Some(seconds) if seconds > 3_600.0 => std::time::Duration::from_secs(10),
        _ => std::time::Duration::from_secs(30),
    };

    let asr = ctx.caps.asr.clone();
    let language = item.language.clone();
    let progress_store = ctx.store.clone();
    let item_id = item.id;
    let last_update = std::sync::Arc::new(std::sync::Mutex::new(None::<std::time::Instant>));
    let progress_cb: Box<dyn Fn(f64) + Send + Sync> = Box::new(move |frac: f64| {
        let now = std::time::Instant::now();
        {
            let mut last = last_update.lock().unwrap();
            if let Some(prev) = *last {
                if now.duration_since(prev) < min_update_interval && frac < 1.0 {
                    return;
                }
            }
            *last = Some(now);
        }
        let pct = 60 + (frac.clamp(0.0, 1.0) * 30.0).round() as i32;
        let store = progress_store.clone();
        tokio::spawn(async move {
            let _ = store.update(item_id, &ItemPatch::new().progress(pct)).await;
        });
    });
    let progress_cb: &ProgressCb<'_> = progress_cb.as_ref();

    use crate::capabilities::Asr;
    let result = asr
        .transcribe_segments(&chunks, &chunk_meta, language.as_deref(), progress_cb, sample_rate)
        .await;

    match result {
        Ok(asr_result) if !asr_result.text.trim().is_empty() => {
            let language = if !asr_result.language.is_empty() { asr_result.language.clone() } else { language.unwrap_or_default() };

            // Punctuate before persisting: the `.txt` on disk and the
            // `transcript` column both hold the formatted text, never the
            // raw ASR output (spec §4.3(d), §4.5 call order
            // transcribe_segments -> format_transcript -> write file).
            let formatted = match ctx.caps.llm.format_transcript(&asr_result.text, &language).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(item_id = item.id, error = %e, "transcript formatting failed; keeping raw transcript");
                    asr_result.text.clone()
                }
            };

            let transcript_path = media::transcript_path(&ctx.cfg.video_storage_dir, &video_id);
            tokio::fs::write(&transcript_path, &formatted)
                .await
                .context("write transcript to disk")?;

            let segments_path = media::segments_path(&ctx.cfg.video_storage_dir, &video_id);
            if let Ok(json) = serde_json::to_vec(&asr_result.segments) {
                let _ = tokio::fs::write(&segments_path, json).await;
            }

            let mut patch = ItemPatch::new()
                .transcript(formatted)
                .transcript_file_path(transcript_path.to_string_lossy().into_owned())
                .stage(Stage::Summarizing)
                .progress(95);
            if !language.is_empty() {
                patch = patch.language(language);
            }
            ctx.store.update(item.id, &patch).await?;
            Ok(())
        }
        Ok(_) => store_sentinel_and_advance(ctx, &item, &video_id, NO_SPEECH_SENTINEL).await,
        Err(e) => {
            tracing::warn!(item_id = item.id, error = %e, "transcription failed");
            store_sentinel_and_advance(ctx, &item, &video_id, FAILED_SENTINEL).await
        }
    }
}

async fn store_sentinel_and_advance(ctx: &ExecCtx, item: &Item, video_id: &str, sentinel: &str) -> Result<()> {
    let transcript_path = media::transcript_path(&ctx.cfg.video_storage_dir, video_id);
    let _ = tokio::fs::write(&transcript_path, sentinel).await;
    ctx.store
        .update(
            item.id,
            &ItemPatch::new()
                .transcript(sentinel)
                .transcript_file_path(transcript_path.to_string_lossy().into_owned())
                .stage(Stage::Summarizing)
                .progress(95),
        )
        .await?;
    Ok(())
}
