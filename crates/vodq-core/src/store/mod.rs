//! Job Store (C1, spec §4.1): durable record of every item's stage,
//! progress, timestamps, artifacts, and error; plus subscriptions and
//! playlist membership.

mod db;
mod patch;
mod types;

pub use db::Store;
pub use patch::ItemPatch;
pub use types::{
    Item, ItemId, ListOrder, PlaylistItem, Stage, Subscription, SubscriptionId,
    SubscriptionStatus, UserId,
};

use once_cell::sync::Lazy;
use regex::Regex;

/// Pattern for the 11-character alphanumeric (`-`/`_`) video id embedded in
/// most source URLs (spec §3: "derived `source_video_id`... 11-character
/// alphanumeric with `-` and `_`").
static VIDEO_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:v=|/|^)([A-Za-z0-9_-]{11})(?:[?&]|$)").unwrap());

/// Extract the `source_video_id` from a source URL, if present.
pub fn extract_source_video_id(url: &str) -> Option<String> {
    VIDEO_ID_RE
        .captures_iter(url)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod id_tests {
    use super::*;

    #[test]
    fn extracts_v_query_param() {
        assert_eq!(
            extract_source_video_id("https://example.com/watch?v=ABCDEFGHIJK"),
            Some("ABCDEFGHIJK".to_string())
        );
    }

    #[test]
    fn extracts_short_url_path() {
        assert_eq!(
            extract_source_video_id("https://youtu.be/ABCDEFGHIJK"),
            Some("ABCDEFGHIJK".to_string())
        );
    }

    #[test]
    fn extracts_trailing_id_with_extra_query() {
        assert_eq!(
            extract_source_video_id("https://example.com/watch?v=ABCDEFGHIJK&t=30s"),
            Some("ABCDEFGHIJK".to_string())
        );
    }

    #[test]
    fn returns_none_for_unrecognized_url() {
        assert_eq!(extract_source_video_id("https://example.com/"), None);
    }
}
