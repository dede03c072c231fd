//! Subscription Loops (C7, spec §4.9): the resolver loop promotes pending
//! channel subscriptions to a stable `channel_id`, merging with any
//! already-resolved subscription for the same channel; the poller loop
//! periodically fetches each resolved channel's latest videos and enqueues
//! the ones not already seen.

use crate::stages::ExecCtx;
use crate::control::Shutdown;
use crate::store::{ItemPatch, Subscription};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Shared between the resolver and poller loops: a freshly resolved
/// subscription wakes the poller immediately instead of waiting out the
/// full check interval (SPEC_FULL supplement 2, mirroring the original's
/// "resolver success triggers an early poll").
#[derive(Clone, Default)]
pub struct EarlyPollSignal {
    notify: Arc<Notify>,
}

impl EarlyPollSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn trigger(&self) {
        self.notify.notify_one();
    }

    async fn wait_or_timeout(&self, timeout: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {}
            _ = self.notify.notified() => {}
        }
    }
}

/// Resolver loop: runs every `pending_subscriptions_interval_seconds`,
/// bounded per-subscription by `resolve_channel_timeout_seconds`.
pub async fn run_resolver_loop(ctx: ExecCtx, early_poll: EarlyPollSignal, shutdown: Shutdown) {
    let interval = Duration::from_secs(ctx.cfg.pending_subscriptions_interval_seconds.max(1));
    while !shutdown.is_requested() {
        if let Err(e) = resolve_pending_once(&ctx, &early_poll).await {
            tracing::error!(error = %e, "subscription resolver tick failed");
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.cancelled() => {}
        }
    }
}

async fn resolve_pending_once(ctx: &ExecCtx, early_poll: &EarlyPollSignal) -> anyhow::Result<()> {
    let pending = ctx.store.list_pending_subscriptions().await?;
    let fetch_timeout = Duration::from_secs(ctx.cfg.resolve_channel_timeout_seconds.max(1));

    for sub in pending {
        let resolved = tokio::time::timeout(fetch_timeout, ctx.caps.channels.resolve_channel(&sub.channel_url)).await;
        let resolved = match resolved {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => {
                tracing::warn!(subscription_id = sub.id, error = %e, "channel resolution failed; retrying next tick");
                continue;
            }
            Err(_) => {
                tracing::warn!(subscription_id = sub.id, "channel resolution timed out; retrying next tick");
                continue;
            }
        };
        let Some(channel_id) = resolved.channel_id else {
            tracing::warn!(subscription_id = sub.id, "channel resolution returned no channel id; retrying next tick");
            continue;
        };

        let merge_target = ctx.store.find_resolved_subscription(sub.user_id, &channel_id).await?;
        if merge_target.is_some() {
            // Already-resolved subscription for this channel exists; merge
            // into it rather than creating a duplicate (spec §4.9, §8
            // property 8).
            ctx.store.delete_subscription(sub.id).await?;
        } else {
            ctx.store
                .resolve_subscription(sub.id, &channel_id, resolved.channel_title.as_deref())
                .await?;
        }

        early_poll.trigger();
    }
    Ok(())
}

/// Items the user already submitted directly (before a subscription for
/// their channel existed) get retroactively linked to the subscription so
/// they show up as part of it. Run from the poller loop on every tick
/// rather than once at resolution time, so items created after a
/// subscription already resolved still get healed (spec §4.9 poller
/// back-link).
async fn backlink_unlinked_items(ctx: &ExecCtx, user_id: i64, channel_id: &str, subscription_id: i64) -> anyhow::Result<()> {
    let unlinked = ctx.store.list_unlinked_items_for_channel(user_id, channel_id).await?;
    for item in unlinked {
        ctx.store.update(item.id, &ItemPatch::new().subscription_id(subscription_id)).await?;
    }
    Ok(())
}

/// Poller loop: runs every `subscription_check_interval_hours`, woken early
/// by a just-resolved subscription.
pub async fn run_poller_loop(ctx: ExecCtx, early_poll: EarlyPollSignal, shutdown: Shutdown) {
    let interval = Duration::from_secs(ctx.cfg.subscription_check_interval_hours.max(1) * 3_600);
    while !shutdown.is_requested() {
        if let Err(e) = poll_once(&ctx).await {
            tracing::error!(error = %e, "subscription poller tick failed");
        }
        tokio::select! {
            _ = early_poll.wait_or_timeout(interval) => {}
            _ = shutdown.cancelled() => {}
        }
    }
}

async fn poll_once(ctx: &ExecCtx) -> anyhow::Result<()> {
    // Every subscription with a channel URL is polled, pending or resolved
    // (spec §4.9) — a pending subscription can still have new uploads worth
    // enqueuing while the resolver keeps retrying the channel-id lookup.
    let subs: Vec<Subscription> = ctx.store.list_all_subscriptions().await?;
    let fetch_timeout = Duration::from_secs(ctx.cfg.resolve_channel_timeout_seconds.max(1));

    for sub in subs {
        // Heal items created after this subscription already resolved
        // (spec §4.9 poller back-link) — run every tick, not just once at
        // resolution time, since new unlinked items can show up at any
        // point.
        if let Some(channel_id) = &sub.channel_id {
            backlink_unlinked_items(ctx, sub.user_id, channel_id, sub.id).await?;
        }

        let urls = tokio::time::timeout(
            fetch_timeout,
            ctx.caps.channels.fetch_latest_video_urls(&sub.channel_url, ctx.cfg.subscription_max_videos_per_channel),
        )
        .await;
        let urls = match urls {
            Ok(Ok(urls)) => urls,
            Ok(Err(e)) => {
                tracing::warn!(subscription_id = sub.id, error = %e, "fetching latest videos failed");
                continue;
            }
            Err(_) => {
                tracing::warn!(subscription_id = sub.id, "fetching latest videos timed out");
                continue;
            }
        };

        for url in urls {
            if ctx.store.find_item_by_user_and_url(sub.user_id, &url).await?.is_some() {
                continue;
            }
            let item_id = ctx.store.create_item(sub.user_id, &url, Some(sub.id)).await?;
            if let Some(playlist_id) = sub.auto_playlist_id {
                let next_position = ctx.store.max_playlist_position(playlist_id).await? + 1;
                ctx.store.append_to_playlist(playlist_id, item_id, next_position).await?;
            }
        }

        ctx.store.touch_subscription_checked(sub.id).await?;
    }
    Ok(())
}
