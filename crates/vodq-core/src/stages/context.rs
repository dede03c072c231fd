//! Shared context stage executors run against: the Job Store, the Download
//! Gate, capability implementations, and configuration (spec §4.3, §6).

use crate::capabilities::{AudioConverter, ChannelService, Downloader, Llm, Prober, ThumbnailGenerator};
use crate::config::VodqConfig;
use crate::dispatch::TranscriptionDispatcher;
use crate::gate::DownloadGate;
use crate::retry::RetryPolicy;
use crate::store::Store;
use std::sync::Arc;

/// Bundle of capability implementations the stage executors consume (spec
/// §6). `asr` is the Transcription Dispatcher, already generalized over
/// in-process vs. remote-runner mode (spec §4.5).
pub struct Capabilities {
    pub downloader: Arc<dyn Downloader>,
    pub converter: Arc<dyn AudioConverter>,
    pub prober: Arc<dyn Prober>,
    pub thumbnails: Arc<dyn ThumbnailGenerator>,
    pub asr: Arc<TranscriptionDispatcher>,
    pub llm: Arc<dyn Llm>,
    pub channels: Arc<dyn ChannelService>,
}

/// Everything a stage executor needs beyond the `Item` it was handed.
#[derive(Clone)]
pub struct ExecCtx {
    pub store: Store,
    pub caps: Arc<Capabilities>,
    pub gate: DownloadGate,
    pub cfg: Arc<VodqConfig>,
    pub download_retry_policy: RetryPolicy,
}
