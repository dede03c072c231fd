//! Transcription Dispatcher (C4, spec §4.5).

mod dispatcher;
mod queue;

pub use dispatcher::TranscriptionDispatcher;
pub use queue::{ChunkJob, RemoteQueue};
