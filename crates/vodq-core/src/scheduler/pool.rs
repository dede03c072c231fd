//! Pool Scheduler tick loop (C5, spec §4.6): a bounded-concurrency worker
//! pool over a fixed set of stages, polling the Job Store for newest-first
//! candidates and dispatching each to its Stage Executor.
//!
//! Two pools are wired by the worker: the download pool (`pending`,
//! bounded by `queue_download_concurrency`) and the
//! heavy-processing pool (`converting` / `transcribing` / `summarizing`,
//! bounded by `queue_process_concurrency`). Because the two pools query
//! disjoint stage sets and each keeps its own `RunningSet`, an item can
//! never be claimed by both pools at once — the cross-pool exclusion the
//! design calls for falls out of the stage partition rather than needing
//! its own lock.

use super::running_set::RunningSet;
use crate::control::Shutdown;
use crate::stages::{execute_stage, ExecCtx};
use crate::store::{ListOrder, Stage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Back-off applied after a tick that spawned nothing, and while every
/// concurrency slot is occupied (spec §4.6 point 4: "~1s when no work is
/// scheduled").
const IDLE_BACKOFF: Duration = Duration::from_secs(1);
/// Back-off applied after a store error (spec §4.6 point 4: "on errors,
/// back-off 5s").
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Runs one pool's tick loop until shutdown is requested. Exits once every
/// in-flight stage executor this pool spawned has actually completed is
/// NOT awaited here — consistent with spec §5: shutdown cancels the tick
/// loop, in-flight work runs to its next suspension point on its own.
///
/// `order` picks the candidate ordering (spec §4.1): the download pool
/// lists `pending` items newest-created-first, while the heavy-processing
/// pool lists its in-flight stages newest-touched-first so a stage
/// executor's own progress updates keep surfacing the item at the front.
pub async fn run_pool(ctx: ExecCtx, stages: Vec<Stage>, concurrency: usize, running: RunningSet, shutdown: Shutdown, order: ListOrder) {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    while !shutdown.is_requested() {
        let available = semaphore.available_permits();
        if available == 0 {
            sleep_or_shutdown(IDLE_BACKOFF, &shutdown).await;
            continue;
        }

        let candidates = match ctx.store.list_by_stage(&stages, available * 4, order).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "failed to list pool candidates");
                sleep_or_shutdown(ERROR_BACKOFF, &shutdown).await;
                continue;
            }
        };

        let mut spawned = 0usize;
        for item in candidates {
            if spawned >= available {
                break;
            }
            if running.contains(item.id) {
                continue;
            }
            let Some(guard) = running.try_claim(item.id) else {
                continue;
            };
            let permit = match semaphore.clone().try_acquire_owned() {
                Ok(p) => p,
                Err(_) => break,
            };

            spawned += 1;
            let task_ctx = ctx.clone();
            let item_id = item.id;
            tokio::spawn(async move {
                let _guard = guard;
                let _permit = permit;
                if let Err(e) = execute_stage(&task_ctx, item).await {
                    tracing::error!(item_id, error = %e, "stage executor returned an error");
                }
            });
        }

        if spawned == 0 {
            sleep_or_shutdown(IDLE_BACKOFF, &shutdown).await;
        }
    }
}

async fn sleep_or_shutdown(duration: Duration, shutdown: &Shutdown) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = shutdown.cancelled() => {}
    }
}
