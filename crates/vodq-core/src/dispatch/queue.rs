//! The remote half of the Transcription Dispatcher (C4, spec §4.5): a
//! process-wide bounded queue of chunk transcription requests served by a
//! fixed number of dispatcher workers, one per configured runner
//! concurrency slot.
//!
//! Each worker loops `dequeue → submit → poll → complete → dequeue`
//! (design notes), which is exactly the "send the next request as soon as
//! the previous one returns" contract spec §4.5 requires — no additional
//! inter-submit delay is layered on top.

use crate::capabilities::AsrResult;
use crate::error::RunnerError;
use crate::runner::RunnerClient;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};

/// One chunk's worth of work queued for a remote runner.
pub struct ChunkJob {
    pub wav_path: String,
    pub language: Option<String>,
    pub respond_to: oneshot::Sender<Result<AsrResult, RunnerError>>,
}

/// Handle to the shared submission queue. Cloning shares the same channel.
#[derive(Clone)]
pub struct RemoteQueue {
    tx: mpsc::Sender<ChunkJob>,
}

impl RemoteQueue {
    /// Spawns `concurrency` worker tasks pulling from one shared bounded
    /// channel. `concurrency` should match the number of remote GPU runners
    /// (spec §6 `transcribe_runner_concurrency`).
    pub fn spawn(client: Arc<RunnerClient>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        // Bounded generously above concurrency: workers drain as fast as the
        // runner allows, so the channel mostly holds queued-but-not-yet-
        // in-flight chunks rather than a backlog.
        let (tx, rx) = mpsc::channel(concurrency * 64);
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..concurrency {
            let rx = rx.clone();
            let client = client.clone();
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut guard = rx.lock().await;
                        guard.recv().await
                    };
                    let Some(job) = job else {
                        tracing::debug!(worker_id, "runner dispatch worker shutting down");
                        break;
                    };
                    let result = client.transcribe(&job.wav_path, job.language.as_deref()).await;
                    let _ = job.respond_to.send(result);
                }
            });
        }

        Self { tx }
    }

    pub async fn submit(&self, job: ChunkJob) {
        // A closed receiver only happens if every worker panicked; the
        // caller's `oneshot` receiver will then observe a dropped sender and
        // surface that as a transport error instead of hanging forever.
        let _ = self.tx.send(job).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunnerClientConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn submit_without_workers_drops_silently() {
        // Exercises the channel plumbing without a live runner: a queue with
        // zero live workers (rx dropped) should not panic on submit.
        let client = Arc::new(RunnerClient::new(RunnerClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            poll_interval: Duration::from_millis(10),
            overall_timeout: Duration::from_millis(50),
        }));
        let (tx, rx) = mpsc::channel::<ChunkJob>(4);
        drop(rx);
        let queue = RemoteQueue { tx };
        let (done_tx, _done_rx) = oneshot::channel();
        queue
            .submit(ChunkJob {
                wav_path: "/nonexistent.wav".to_string(),
                language: None,
                respond_to: done_tx,
            })
            .await;
        let _ = client;
    }
}
