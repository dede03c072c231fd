//! Partial-field update descriptor for `Store::update` (spec §4.1).
//!
//! Stage executors only ever know the handful of fields their stage
//! produced, so `update` takes a sparse patch rather than a full `Item`.

use super::types::{ItemId, Stage};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub stage: Option<Stage>,
    pub progress: Option<i32>,
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
    pub error_message: Option<Option<String>>,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub subscription_id: Option<ItemId>,
}

impl ItemPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn progress(mut self, progress: i32) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn error_message(mut self, msg: impl Into<String>) -> Self {
        self.error_message = Some(Some(msg.into()));
        self
    }

    pub fn clear_error_message(mut self) -> Self {
        self.error_message = Some(None);
        self
    }

    pub fn language(mut self, v: impl Into<String>) -> Self {
        self.language = Some(v.into());
        self
    }

    pub fn title(mut self, v: impl Into<String>) -> Self {
        self.title = Some(v.into());
        self
    }

    pub fn channel_id(mut self, v: impl Into<String>) -> Self {
        self.channel_id = Some(v.into());
        self
    }

    pub fn channel_title(mut self, v: impl Into<String>) -> Self {
        self.channel_title = Some(v.into());
        self
    }

    pub fn uploader_id(mut self, v: impl Into<String>) -> Self {
        self.uploader_id = Some(v.into());
        self
    }

    pub fn uploader(mut self, v: impl Into<String>) -> Self {
        self.uploader = Some(v.into());
        self
    }

    pub fn view_count(mut self, v: i64) -> Self {
        self.view_count = Some(v);
        self
    }

    pub fn like_count(mut self, v: i64) -> Self {
        self.like_count = Some(v);
        self
    }

    pub fn duration_seconds(mut self, v: f64) -> Self {
        self.duration_seconds = Some(v);
        self
    }

    pub fn upload_date(mut self, v: impl Into<String>) -> Self {
        self.upload_date = Some(v.into());
        self
    }

    pub fn thumbnail_url(mut self, v: impl Into<String>) -> Self {
        self.thumbnail_url = Some(v.into());
        self
    }

    pub fn thumbnail_path(mut self, v: impl Into<String>) -> Self {
        self.thumbnail_path = Some(v.into());
        self
    }

    pub fn media_file_path(mut self, v: impl Into<String>) -> Self {
        self.media_file_path = Some(v.into());
        self
    }

    pub fn audio_file_path(mut self, v: impl Into<String>) -> Self {
        self.audio_file_path = Some(v.into());
        self
    }

    pub fn transcript_file_path(mut self, v: impl Into<String>) -> Self {
        self.transcript_file_path = Some(v.into());
        self
    }

    pub fn transcript(mut self, v: impl Into<String>) -> Self {
        self.transcript = Some(v.into());
        self
    }

    pub fn summary(mut self, v: impl Into<String>) -> Self {
        self.summary = Some(v.into());
        self
    }

    pub fn keywords(mut self, v: impl Into<String>) -> Self {
        self.keywords = Some(v.into());
        self
    }

    pub fn downloaded_at(mut self, v: DateTime<Utc>) -> Self {
        self.downloaded_at = Some(v);
        self
    }

    pub fn completed_at(mut self, v: DateTime<Utc>) -> Self {
        self.completed_at = Some(v);
        self
    }

    pub fn subscription_id(mut self, v: ItemId) -> Self {
        self.subscription_id = Some(v);
        self
    }
}
