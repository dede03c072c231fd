//! Stage Executors (C3, spec §4.3–§4.6): one module per `Item` stage, plus
//! the shared `ExecCtx`/`Capabilities` bundle and on-disk artifact helpers.

mod context;
mod convert;
mod download;
mod media;
mod summarize;
mod transcribe;

pub use context::{Capabilities, ExecCtx};
pub use media::{is_sentinel_transcript, SENTINEL_PREFIX};

use crate::store::{Item, Stage};
use anyhow::Result;

/// Run the executor for whichever stage `item` is currently in. Terminal
/// stages and `Pending` (picked up only by the scheduler, which transitions
/// it to `Downloading` before calling in) are not dispatched here.
pub async fn execute_stage(ctx: &ExecCtx, item: Item) -> Result<()> {
    match item.stage {
        Stage::Pending | Stage::Downloading => download::execute(ctx, item).await,
        Stage::Converting => convert::execute(ctx, item).await,
        Stage::Transcribing => transcribe::execute(ctx, item).await,
        Stage::Summarizing => summarize::execute(ctx, item).await,
        Stage::Completed | Stage::Failed | Stage::Unavailable => Ok(()),
    }
}
