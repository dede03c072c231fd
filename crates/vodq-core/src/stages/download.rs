//! Download stage executor (spec §4.3).
//!
//! Re-entry: if media already exists on disk for the item's
//! `source_video_id`, the download is skipped entirely and the item fast-
//! forwards to `converting` (or `completed` for playlist members) — spec
//! §4.2's idempotent re-entry contract, §3 invariant 3.

use super::context::ExecCtx;
use super::media;
use crate::capabilities::{DownloadMetadata, ProgressCb, LOOSE_FORMAT_SELECTOR};
use crate::error::{DownloadError, DownloadErrorKind};
use crate::retry::run_with_retry;
use crate::store::{Item, ItemPatch, Stage};
use anyhow::Result;
use chrono::Utc;

pub async fn execute(ctx: &ExecCtx, item: Item) -> Result<()> {
    let storage_dir = ctx.cfg.video_storage_dir.clone();
    let _ = tokio::fs::create_dir_all(&storage_dir).await;

    let Some(video_id) = item.source_video_id.clone() else {
        ctx.store
            .update(
                item.id,
                &ItemPatch::new()
                    .stage(Stage::Failed)
                    .error_message("url did not contain a recognizable video id"),
            )
            .await?;
        return Ok(());
    };

    // Mark in-flight before doing anything else so the Stuck-Task
    // Supervisor can see (and eventually recover) a download that never
    // comes back (spec §4.8).
    ctx.store.update(item.id, &ItemPatch::new().stage(Stage::Downloading)).await?;

    if let Some(existing) = media::find_existing_media(&storage_dir, &video_id) {
        tracing::info!(item_id = item.id, %video_id, "media already on disk; skipping download");
        return finish_after_download(
            ctx,
            &item,
            &video_id,
            existing.to_string_lossy().into_owned(),
            None,
        )
        .await;
    }

    ctx.gate.wait_if_paused().await;
    ctx.gate.wait_for_spacing().await;

    let progress_store = ctx.store.clone();
    let item_id = item.id;
    let progress_cb: Box<dyn Fn(f64) + Send + Sync> = Box::new(move |frac: f64| {
        let pct = (frac.clamp(0.0, 1.0) * 25.0).round() as i32;
        let store = progress_store.clone();
        tokio::spawn(async move {
            let _ = store.update(item_id, &ItemPatch::new().progress(pct)).await;
        });
    });
    let progress_cb: &ProgressCb<'_> = progress_cb.as_ref();

    match run_download_with_policy(ctx, &item.url, None, progress_cb).await {
        Ok(metadata) => {
            ctx.gate.reset_blocked_counter_on_success().await;
            finish_after_download(ctx, &item, &video_id, metadata.file_path.clone(), Some(metadata)).await
        }
        Err(err) if err.kind == DownloadErrorKind::FormatUnavailable => {
            tracing::info!(item_id = item.id, "format unavailable; retrying with looser selector");
            match run_download_with_policy(ctx, &item.url, Some(LOOSE_FORMAT_SELECTOR), progress_cb).await {
                Ok(metadata) => {
                    ctx.gate.reset_blocked_counter_on_success().await;
                    finish_after_download(ctx, &item, &video_id, metadata.file_path.clone(), Some(metadata)).await
                }
                Err(err2) => handle_download_error(ctx, &item, err2).await,
            }
        }
        Err(err) => handle_download_error(ctx, &item, err).await,
    }
}

/// Drive one download call through the bounded-retry policy for
/// `retryable_network` failures (spec §4.3, §7). `format_hint` carries the
/// looser selector on the format-unavailable retry pass.
async fn run_download_with_policy(
    ctx: &ExecCtx,
    url: &str,
    format_hint: Option<&str>,
    progress_cb: &ProgressCb<'_>,
) -> Result<DownloadMetadata, DownloadError> {
    run_with_retry(&ctx.download_retry_policy, || async {
        // Second-chance membership-only classification before the retry
        // policy ever sees the error (SPEC_FULL supplement 3).
        ctx.caps
            .downloader
            .download(url, format_hint, progress_cb)
            .await
            .map_err(DownloadError::reclassify_membership_only)
    })
    .await
}

async fn handle_download_error(ctx: &ExecCtx, item: &Item, err: DownloadError) -> Result<()> {
    match err.kind {
        DownloadErrorKind::Blocked => {
            ctx.gate.register_blocked_failure(&err.message).await;
            ctx.store
                .update(item.id, &ItemPatch::new().stage(Stage::Failed).error_message(err.message))
                .await?;
        }
        DownloadErrorKind::MembershipOnly => {
            ctx.store
                .update(
                    item.id,
                    &ItemPatch::new().stage(Stage::Unavailable).error_message(err.message),
                )
                .await?;
        }
        DownloadErrorKind::LiveStream
        | DownloadErrorKind::FormatUnavailable
        | DownloadErrorKind::Retryable
        | DownloadErrorKind::Other => {
            ctx.store
                .update(item.id, &ItemPatch::new().stage(Stage::Failed).error_message(err.message))
                .await?;
        }
    }
    Ok(())
}

/// Persist captured metadata, generate a best-effort thumbnail, and advance
/// the item past download: to `completed` if it belongs to a playlist
/// (playlist members skip transcript/summary, spec §4.3), otherwise to
/// `converting`.
async fn finish_after_download(
    ctx: &ExecCtx,
    item: &Item,
    video_id: &str,
    media_path: String,
    metadata: Option<DownloadMetadata>,
) -> Result<()> {
    let mut patch = ItemPatch::new().media_file_path(media_path.clone()).downloaded_at(Utc::now());

    if let Some(meta) = &metadata {
        patch = patch.title(meta.title.clone());
        if let Some(d) = meta.duration {
            patch = patch.duration_seconds(d);
        }
        if let Some(v) = &meta.channel_id {
            patch = patch.channel_id(v.clone());
        }
        if let Some(v) = &meta.channel {
            patch = patch.channel_title(v.clone());
        }
        if let Some(v) = &meta.uploader_id {
            patch = patch.uploader_id(v.clone());
        }
        if let Some(v) = &meta.uploader {
            patch = patch.uploader(v.clone());
        }
        if let Some(v) = meta.view_count {
            patch = patch.view_count(v);
        }
        if let Some(v) = meta.like_count {
            patch = patch.like_count(v);
        }
        if let Some(v) = &meta.upload_date {
            patch = patch.upload_date(v.clone());
        }
        if let Some(v) = &meta.thumbnail {
            patch = patch.thumbnail_url(v.clone());
        }
    }

    match ctx.caps.thumbnails.generate_thumbnail(&media_path, video_id).await {
        Ok(path) => patch = patch.thumbnail_path(path),
        Err(e) => tracing::warn!(item_id = item.id, error = %e, "thumbnail generation failed; continuing"),
    }

    let in_playlist = ctx.store.item_in_any_playlist(item.id).await?;
    patch = if in_playlist {
        patch.stage(Stage::Completed).progress(100).completed_at(Utc::now())
    } else {
        patch.stage(Stage::Converting).progress(25)
    };

    ctx.store.update(item.id, &patch).await?;
    Ok(())
}
