//! Convert stage executor (spec §4.4 "Convert stage"): extract mono 16 kHz
//! PCM WAV from the downloaded media file. Progress band 25–50.

use super::context::ExecCtx;
use super::media;
use crate::store::{Item, ItemPatch, Stage};
use anyhow::{Context, Result};

pub async fn execute(ctx: &ExecCtx, item: Item) -> Result<()> {
    let Some(media_path) = item.media_file_path.clone() else {
        ctx.store
            .update(
                item.id,
                &ItemPatch::new()
                    .stage(Stage::Failed)
                    .error_message("convert stage reached with no media_file_path"),
            )
            .await?;
        return Ok(());
    };

    ctx.store.update(item.id, &ItemPatch::new().stage(Stage::Converting)).await?;

    // Re-entry: a WAV already on disk for this item means convert already
    // ran to completion before a crash/restart — skip straight to
    // transcribe rather than re-running ffmpeg (spec §4.2).
    if let Some(video_id) = &item.source_video_id {
        let wav_path = media::audio_path(&ctx.cfg.video_storage_dir, video_id);
        if wav_path.exists() {
            tracing::info!(item_id = item.id, "audio wav already on disk; skipping convert");
            ctx.store
                .update(
                    item.id,
                    &ItemPatch::new()
                        .audio_file_path(wav_path.to_string_lossy().into_owned())
                        .stage(Stage::Transcribing)
                        .progress(50),
                )
                .await?;
            return Ok(());
        }
    }

    match ctx.caps.converter.convert_to_audio(&media_path).await {
        Ok(wav_path) => {
            let mut patch = ItemPatch::new().audio_file_path(wav_path.clone()).stage(Stage::Transcribing).progress(50);
            // The downloader's own metadata is the primary source of
            // `duration_seconds`; probe the converted audio as a fallback
            // for sources that don't report it up front.
            if item.duration_seconds.is_none() {
                if let Some(duration) = ctx.caps.prober.probe_duration(&wav_path).await {
                    patch = patch.duration_seconds(duration);
                }
            }
            ctx.store.update(item.id, &patch).await.context("persist converted audio path")?;
        }
        Err(e) => {
            tracing::warn!(item_id = item.id, error = %e, "audio conversion failed");
            ctx.store
                .update(
                    item.id,
                    &ItemPatch::new().stage(Stage::Failed).error_message(format!("convert failed: {e}")),
                )
                .await?;
        }
    }
    Ok(())
}
