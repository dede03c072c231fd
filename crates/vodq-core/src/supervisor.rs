//! Stuck-Task Supervisor (C6, spec §4.8): periodically scans items left in
//! a non-terminal, in-flight stage far longer than that stage could
//! plausibly take, and recovers them.
//!
//! Recovery actions per stage:
//! - `downloading`: fail outright. The download stage already bounds its
//!   own retries; a download still running past the timeout is treated as
//!   wedged (crashed worker, network stall) rather than retryable.
//! - `converting`: left alone. Conversion is a single local `ffmpeg`
//!   invocation with no network dependency; there is no plausible "stuck"
//!   state worth recovering from here short of a process crash, which
//!   recovery on next boot's scan will already have moved past by the time
//!   this stage is reached again.
//! - `transcribing`: reset to `pending`, so the item re-enters the pipeline
//!   from the download pool (which immediately fast-forwards past download
//!   and re-extracts audio). The timeout is dynamic, derived from the
//!   on-disk WAV's own duration rather than any stored estimate, since the
//!   file on disk is the ground truth for how long transcription should
//!   take (spec §4.8 design note).
//! - `summarizing`: reset to `pending` after a fixed timeout; re-entry
//!   re-runs conversion and transcription too, which is wasteful but safe —
//!   summarization failures are rare enough that this is not worth a
//!   dedicated restart point.
//!
//! Every recovery write goes through `claim_and_update`, so a supervisor
//! tick racing a stage executor that finishes (or advances) the item
//! between the scan and the write is a silent no-op rather than a
//! corrupted transition.

use crate::audio::probe_wav_duration;
use crate::control::Shutdown;
use crate::stages::ExecCtx;
use crate::store::{Item, ItemPatch, ListOrder, Stage};
use chrono::Utc;
use std::time::Duration;

const DYNAMIC_TIMEOUT_MIN_SECONDS: u64 = 7_200;
const DYNAMIC_TIMEOUT_MAX_SECONDS: u64 = 86_400;
const DYNAMIC_TIMEOUT_FALLBACK_SECONDS: u64 = 6 * 3_600;

pub async fn run_supervisor(ctx: ExecCtx, shutdown: Shutdown) {
    let scan_interval = Duration::from_secs(ctx.cfg.supervisor_scan_interval_seconds.max(1));
    while !shutdown.is_requested() {
        if let Err(e) = scan_once(&ctx).await {
            tracing::error!(error = %e, "stuck-task supervisor scan failed");
        }
        tokio::select! {
            _ = tokio::time::sleep(scan_interval) => {}
            _ = shutdown.cancelled() => {}
        }
    }
}

async fn scan_once(ctx: &ExecCtx) -> anyhow::Result<()> {
    let in_flight = [Stage::Downloading, Stage::Converting, Stage::Transcribing, Stage::Summarizing];
    let items = ctx.store.list_by_stage(&in_flight, 256, ListOrder::NewestTouched).await?;
    let now = Utc::now();

    for item in items {
        let age_seconds = (now - item.updated_at).num_seconds().max(0) as u64;
        match item.stage {
            Stage::Converting => continue,
            Stage::Downloading => {
                if age_seconds >= ctx.cfg.stuck_download_timeout_seconds {
                    recover(
                        ctx,
                        &item,
                        Stage::Downloading,
                        ItemPatch::new()
                            .stage(Stage::Failed)
                            .error_message("download stage exceeded the stuck-task timeout"),
                    )
                    .await;
                }
            }
            Stage::Transcribing => {
                let timeout = transcribe_timeout_seconds(&item).await;
                if age_seconds >= timeout {
                    recover(
                        ctx,
                        &item,
                        Stage::Transcribing,
                        ItemPatch::new().stage(Stage::Pending).progress(0),
                    )
                    .await;
                }
            }
            Stage::Summarizing => {
                if age_seconds >= ctx.cfg.stuck_summarize_timeout_seconds {
                    recover(
                        ctx,
                        &item,
                        Stage::Summarizing,
                        ItemPatch::new().stage(Stage::Pending).progress(0),
                    )
                    .await;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// `clamp(duration_seconds * 10 + 3600, 7200, 86400)`, falling back to 6
/// hours when the WAV on disk can't be probed at all (spec §4.8).
async fn transcribe_timeout_seconds(item: &Item) -> u64 {
    let Some(audio_path) = item.audio_file_path.clone() else {
        return DYNAMIC_TIMEOUT_FALLBACK_SECONDS;
    };
    let duration = tokio::task::spawn_blocking(move || probe_wav_duration(&audio_path))
        .await
        .unwrap_or(None);
    match duration {
        Some(seconds) => {
            let raw = (seconds * 10.0 + 3_600.0).round().max(0.0) as u64;
            raw.clamp(DYNAMIC_TIMEOUT_MIN_SECONDS, DYNAMIC_TIMEOUT_MAX_SECONDS)
        }
        None => DYNAMIC_TIMEOUT_FALLBACK_SECONDS,
    }
}

async fn recover(ctx: &ExecCtx, item: &Item, expect_stage: Stage, patch: ItemPatch) {
    match ctx.store.claim_and_update(item.id, expect_stage, &patch).await {
        Ok(true) => {
            tracing::warn!(item_id = item.id, stage = expect_stage.as_str(), "recovered stuck item");
        }
        Ok(false) => {
            tracing::debug!(item_id = item.id, "stuck item already advanced; skipping recovery");
        }
        Err(e) => {
            tracing::error!(item_id = item.id, error = %e, "failed to recover stuck item");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[tokio::test]
    async fn recovers_a_stuck_downloading_item_via_claim_and_update() {
        let store = Store::open_memory().await.unwrap();
        let id = store.create_item(1, "https://example.com/watch?v=ABCDEFGHIJK", None).await.unwrap();
        store.update(id, &ItemPatch::new().stage(Stage::Downloading)).await.unwrap();
        let item = store.fetch_by_id(id).await.unwrap().unwrap();

        recover(
            &dummy_ctx(&store),
            &item,
            Stage::Downloading,
            ItemPatch::new().stage(Stage::Failed).error_message("timed out"),
        )
        .await;

        let updated = store.fetch_by_id(id).await.unwrap().unwrap();
        assert_eq!(updated.stage, Stage::Failed);
    }

    #[tokio::test]
    async fn claim_and_update_no_ops_if_stage_already_advanced() {
        let store = Store::open_memory().await.unwrap();
        let id = store.create_item(1, "https://example.com/watch?v=ABCDEFGHIJK", None).await.unwrap();
        store.update(id, &ItemPatch::new().stage(Stage::Downloading)).await.unwrap();
        let stale_snapshot = store.fetch_by_id(id).await.unwrap().unwrap();
        // The item actually finished downloading before the recovery write lands.
        store.update(id, &ItemPatch::new().stage(Stage::Converting)).await.unwrap();

        recover(
            &dummy_ctx(&store),
            &stale_snapshot,
            Stage::Downloading,
            ItemPatch::new().stage(Stage::Failed),
        )
        .await;

        let updated = store.fetch_by_id(id).await.unwrap().unwrap();
        assert_eq!(updated.stage, Stage::Converting);
    }

    #[tokio::test]
    async fn fallback_timeout_when_audio_file_missing() {
        let seconds = transcribe_timeout_seconds(&fake_item(None)).await;
        assert_eq!(seconds, DYNAMIC_TIMEOUT_FALLBACK_SECONDS);
    }

    fn fake_item(audio_file_path: Option<String>) -> Item {
        Item {
            id: 1,
            user_id: 1,
            url: "https://example.com".to_string(),
            source_video_id: None,
            stage: Stage::Transcribing,
            progress: 0,
            language: None,
            title: None,
            channel_id: None,
            channel_title: None,
            uploader_id: None,
            uploader: None,
            view_count: None,
            like_count: None,
            duration_seconds: None,
            upload_date: None,
            thumbnail_url: None,
            thumbnail_path: None,
            media_file_path: None,
            audio_file_path,
            transcript_file_path: None,
            transcript: None,
            summary: None,
            keywords: None,
            watch_position_seconds: None,
            read_count: 0,
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            downloaded_at: None,
            completed_at: None,
            subscription_id: None,
        }
    }

    fn dummy_ctx(store: &Store) -> ExecCtx {
        // Only `store` is exercised by `recover` in these tests; the rest of
        // `ExecCtx` is not touched.
        ExecCtx {
            store: store.clone(),
            caps: test_capabilities(),
            gate: crate::gate::DownloadGate::new(3, 3600, 0),
            cfg: std::sync::Arc::new(crate::config::VodqConfig::default()),
            download_retry_policy: crate::retry::RetryPolicy::default(),
        }
    }

    fn test_capabilities() -> std::sync::Arc<crate::stages::Capabilities> {
        use crate::capabilities::*;
        use async_trait::async_trait;
        use std::sync::Arc;

        struct Unused;
        #[async_trait]
        impl Downloader for Unused {
            async fn download(&self, _: &str, _: Option<&str>, _: &ProgressCb<'_>) -> Result<DownloadMetadata, DownloadError> {
                unreachable!()
            }
        }
        #[async_trait]
        impl AudioConverter for Unused {
            async fn convert_to_audio(&self, _: &str) -> anyhow::Result<String> {
                unreachable!()
            }
        }
        #[async_trait]
        impl Prober for Unused {
            async fn probe_duration(&self, _: &str) -> Option<f64> {
                unreachable!()
            }
        }
        #[async_trait]
        impl ThumbnailGenerator for Unused {
            async fn generate_thumbnail(&self, _: &str, _: &str) -> anyhow::Result<String> {
                unreachable!()
            }
        }
        #[async_trait]
        impl Asr for Unused {
            async fn transcribe_segments(
                &self,
                _: &[Vec<f32>],
                _: &[(f64, f64)],
                _: Option<&str>,
                _: &ProgressCb<'_>,
                _: u32,
            ) -> anyhow::Result<AsrResult> {
                unreachable!()
            }
        }
        #[async_trait]
        impl Llm for Unused {
            async fn format_transcript(&self, _: &str, _: &str) -> Result<String, LlmError> {
                unreachable!()
            }
            async fn generate_summary(&self, _: &str, _: &str) -> Result<String, LlmError> {
                unreachable!()
            }
            async fn generate_keywords(&self, _: &str, _: &str, _: &str) -> Result<String, LlmError> {
                unreachable!()
            }
        }
        #[async_trait]
        impl ChannelService for Unused {
            async fn resolve_channel(&self, _: &str) -> anyhow::Result<ResolvedChannel> {
                unreachable!()
            }
            async fn fetch_latest_video_urls(&self, _: &str, _: usize) -> anyhow::Result<Vec<String>> {
                unreachable!()
            }
        }

        Arc::new(crate::stages::Capabilities {
            downloader: Arc::new(Unused),
            converter: Arc::new(Unused),
            prober: Arc::new(Unused),
            thumbnails: Arc::new(Unused),
            asr: Arc::new(crate::dispatch::TranscriptionDispatcher::in_process(Arc::new(Unused))),
            llm: Arc::new(Unused),
            channels: Arc::new(Unused),
        })
    }
}
