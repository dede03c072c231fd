//! Item/Subscription/PlaylistItem row types (spec §3).

use chrono::{DateTime, Utc};

pub type ItemId = i64;
pub type SubscriptionId = i64;
pub type UserId = i64;

/// Item state machine stage (spec §4.2). `Unavailable` is stored as the
/// canonical lowercase label; legacy uppercase labels are translated on
/// read (see `Stage::from_db_str`, SPEC_FULL open question (b)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Downloading,
    Converting,
    Transcribing,
    Summarizing,
    Completed,
    Failed,
    Unavailable,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Downloading => "downloading",
            Stage::Converting => "converting",
            Stage::Transcribing => "transcribing",
            Stage::Summarizing => "summarizing",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
            Stage::Unavailable => "unavailable",
        }
    }

    /// Parse a stage label read back from storage, normalizing legacy
    /// uppercase `unavailable` spellings to the canonical lowercase form.
    pub fn from_db_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Stage::Pending,
            "downloading" => Stage::Downloading,
            "converting" => Stage::Converting,
            "transcribing" => Stage::Transcribing,
            "summarizing" => Stage::Summarizing,
            "completed" => Stage::Completed,
            "failed" => Stage::Failed,
            "unavailable" => Stage::Unavailable,
            _ => Stage::Failed,
        }
    }

    /// An item in one of these stages is terminal and is never re-scheduled
    /// (spec §3 invariant 1).
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed | Stage::Unavailable)
    }
}

/// One submitted URL per user (spec §3).
#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    pub user_id: UserId,
    pub url: String,
    pub source_video_id: Option<String>,
    pub stage: Stage,
    pub progress: i32,
    pub language: Option<String>,
    pub title: Option<String>,
    pub channel_id: Option<String>,
    pub channel_title: Option<String>,
    pub uploader_id: Option<String>,
    pub uploader: Option<String>,
    pub view_count: Option<i64>,
    pub like_count: Option<i64>,
    pub duration_seconds: Option<f64>,
    pub upload_date: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_path: Option<String>,
    pub media_file_path: Option<String>,
    pub audio_file_path: Option<String>,
    pub transcript_file_path: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub keywords: Option<String>,
    pub watch_position_seconds: Option<f64>,
    pub read_count: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub subscription_id: Option<SubscriptionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Pending,
    Resolved,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Resolved => "resolved",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "resolved" => SubscriptionStatus::Resolved,
            _ => SubscriptionStatus::Pending,
        }
    }
}

/// One per (user, channel) (spec §3).
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub channel_url: String,
    pub channel_id: Option<String>,
    pub title: Option<String>,
    pub status: SubscriptionStatus,
    pub auto_playlist_id: Option<i64>,
    pub last_check_at: Option<DateTime<Utc>>,
}

/// (playlist id, item id, position) — used by the download stage to
/// short-circuit playlist members past transcription (spec §3, §4.3).
#[derive(Debug, Clone)]
pub struct PlaylistItem {
    pub playlist_id: i64,
    pub item_id: ItemId,
    pub position: i64,
}

/// Ordering used by the scheduler when asking the store for candidates
/// (spec §4.1): pending items are newest-first by creation; in-flight items
/// bias toward whatever was touched most recently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    /// `created_at DESC, id DESC` — used for the download pool's pending candidates.
    NewestCreated,
    /// `created_at DESC, updated_at DESC NULLS LAST, id DESC` — in-flight candidates.
    NewestTouched,
}
