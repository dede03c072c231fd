//! Top-level wiring: constructs the shared `ExecCtx` and spawns the Pool
//! Scheduler's two pools, the Stuck-Task Supervisor, and the two
//! Subscription Loops (spec §5 "Process layout").
//!
//! The core never builds a `Capabilities` bundle itself — that is the
//! binary's job, wiring concrete `yt-dlp`/`ffmpeg`/ASR/LLM adapters behind
//! the capability traits (spec §6). `Worker::spawn` just needs the bundle,
//! config, and an open store.

use crate::config::VodqConfig;
use crate::control::Shutdown;
use crate::gate::DownloadGate;
use crate::retry::RetryPolicy;
use crate::scheduler::{run_pool, RunningSet};
use crate::stages::{Capabilities, ExecCtx};
use crate::store::{ListOrder, Stage};
use crate::store::Store;
use crate::subscriptions::{run_poller_loop, run_resolver_loop, EarlyPollSignal};
use crate::supervisor::run_supervisor;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handle to every background loop the worker process runs. Dropping it
/// does not stop the loops (they hold their own clones of `Shutdown`) —
/// call `shutdown()` then `join()` for a clean stop.
pub struct Worker {
    shutdown: Shutdown,
    handles: Vec<JoinHandle<()>>,
}

impl Worker {
    /// Build the shared context and spawn every background loop.
    pub fn spawn(store: Store, cfg: Arc<VodqConfig>, caps: Arc<Capabilities>) -> Self {
        let shutdown = Shutdown::new();
        let gate = DownloadGate::new(cfg.queue_blocked_threshold, cfg.queue_blocked_pause_seconds, cfg.queue_download_min_interval_seconds);
        let download_retry_policy = RetryPolicy::from_config(cfg.ytdlp_download_max_attempts, cfg.ytdlp_download_retry_backoff_seconds);

        let ctx = ExecCtx {
            store,
            caps,
            gate,
            cfg,
            download_retry_policy,
        };

        let mut handles = Vec::new();

        // Candidates are `pending` only (spec §4.6 point 2) — a `downloading`
        // row left over from a crashed process is the Stuck-Task
        // Supervisor's job to recover (spec §4.8: a stuck download is marked
        // `failed`, never silently retried by the scheduler).
        let download_running = RunningSet::new();
        handles.push(tokio::spawn(run_pool(
            ctx.clone(),
            vec![Stage::Pending],
            ctx.cfg.queue_download_concurrency,
            download_running,
            shutdown.clone(),
            ListOrder::NewestCreated,
        )));

        let process_running = RunningSet::new();
        handles.push(tokio::spawn(run_pool(
            ctx.clone(),
            vec![Stage::Converting, Stage::Transcribing, Stage::Summarizing],
            ctx.cfg.queue_process_concurrency,
            process_running,
            shutdown.clone(),
            ListOrder::NewestTouched,
        )));

        handles.push(tokio::spawn(run_supervisor(ctx.clone(), shutdown.clone())));

        let early_poll = EarlyPollSignal::new();
        handles.push(tokio::spawn(run_resolver_loop(ctx.clone(), early_poll.clone(), shutdown.clone())));
        handles.push(tokio::spawn(run_poller_loop(ctx, early_poll, shutdown.clone())));

        Self { shutdown, handles }
    }

    /// Request every loop to stop at its next suspension point.
    pub fn shutdown(&self) {
        self.shutdown.request();
    }

    /// Await every spawned loop's task (normally only returns once
    /// `shutdown()` has been called).
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "a worker loop panicked");
            }
        }
    }
}
