//! Summarize stage executor (spec §4.6): generate a summary and
//! (independently, non-blocking) a keyword list from the already-formatted
//! transcript (punctuation is applied by the transcribe stage, spec
//! §4.3(d)), in the item's detected language, defaulting to Chinese when
//! none was detected (GLOSSARY: "user's preferred language, default 中文").
//!
//! Items carrying a sentinel transcript (no usable ASR output) skip the LLM
//! entirely and complete directly — there is nothing to summarize.

use super::media;
use super::context::ExecCtx;
use crate::store::{Item, ItemPatch, Stage};
use anyhow::Result;
use chrono::Utc;

const DEFAULT_SUMMARY_LANGUAGE: &str = "中文";

pub async fn execute(ctx: &ExecCtx, item: Item) -> Result<()> {
    ctx.store.update(item.id, &ItemPatch::new().stage(Stage::Summarizing).progress(90)).await?;

    let transcript = item.transcript.clone().unwrap_or_default();
    if media::is_sentinel_transcript(&transcript) {
        return complete(ctx, &item, None, None).await;
    }

    let language = item.language.clone().unwrap_or_else(|| DEFAULT_SUMMARY_LANGUAGE.to_string());
    let title = item.title.clone().unwrap_or_default();

    let summary = match ctx.caps.llm.generate_summary(&transcript, &language).await {
        Ok(s) => s,
        Err(e) if e.transient => {
            tracing::warn!(item_id = item.id, error = %e, "summary generation transiently failed; retrying later");
            return Ok(());
        }
        Err(e) => {
            fail(ctx, &item, format!("generate_summary: {e}")).await?;
            return Ok(());
        }
    };

    let keywords = match ctx.caps.llm.generate_keywords(&transcript, &title, &language).await {
        Ok(k) => Some(k),
        Err(e) => {
            tracing::warn!(item_id = item.id, error = %e, "keyword generation failed; completing without keywords");
            None
        }
    };

    complete(ctx, &item, Some(summary), keywords).await
}

async fn fail(ctx: &ExecCtx, item: &Item, message: String) -> Result<()> {
    ctx.store
        .update(item.id, &ItemPatch::new().stage(Stage::Failed).error_message(message))
        .await?;
    Ok(())
}

async fn complete(ctx: &ExecCtx, item: &Item, summary: Option<String>, keywords: Option<String>) -> Result<()> {
    let mut patch = ItemPatch::new().stage(Stage::Completed).progress(100).completed_at(Utc::now());
    if let Some(s) = summary {
        patch = patch.summary(s);
    }
    if let Some(k) = keywords {
        patch = patch.keywords(k);
    }
    ctx.store.update(item.id, &patch).await?;
    Ok(())
}
