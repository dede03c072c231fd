//! SQLite-backed Job Store implementation.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};

use super::patch::ItemPatch;
use super::types::{
    Item, ItemId, ListOrder, PlaylistItem, Stage, Subscription, SubscriptionId,
    SubscriptionStatus, UserId,
};
use super::extract_source_video_id;

/// Handle to the SQLite-backed job store.
///
/// The database file lives under the XDG state directory:
/// `~/.local/state/vodq/vodq.db`, mirroring the teacher's `ResumeDb`.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Open (or create) the default store database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("vodq")?;
        let state_dir = xdg_dirs.get_state_home();
        tokio::fs::create_dir_all(&state_dir).await?;
        let db_path = state_dir.join("vodq.db");
        let uri = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new().max_connections(8).connect(&uri).await?;
        let store = Store { pool };
        store.migrate().await?;
        Ok(store)
    }

    #[cfg(test)]
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Store { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                url TEXT NOT NULL,
                source_video_id TEXT,
                stage TEXT NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                language TEXT,
                title TEXT,
                channel_id TEXT,
                channel_title TEXT,
                uploader_id TEXT,
                uploader TEXT,
                view_count INTEGER,
                like_count INTEGER,
                duration_seconds REAL,
                upload_date TEXT,
                thumbnail_url TEXT,
                thumbnail_path TEXT,
                media_file_path TEXT,
                audio_file_path TEXT,
                transcript_file_path TEXT,
                transcript TEXT,
                summary TEXT,
                keywords TEXT,
                watch_position_seconds REAL,
                read_count INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                downloaded_at TEXT,
                completed_at TEXT,
                subscription_id INTEGER
            );

            CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                channel_url TEXT NOT NULL,
                channel_id TEXT,
                title TEXT,
                status TEXT NOT NULL,
                auto_playlist_id INTEGER,
                last_check_at TEXT
            );

            CREATE TABLE IF NOT EXISTS playlist_items (
                playlist_id INTEGER NOT NULL,
                item_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (playlist_id, item_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -- items --

    /// Create a new `pending` item for `user_id`/`url`, deriving
    /// `source_video_id` by regex (spec §3). `subscription_id` is set when
    /// the item originates from the poller loop (spec §4.9).
    pub async fn create_item(
        &self,
        user_id: UserId,
        url: &str,
        subscription_id: Option<SubscriptionId>,
    ) -> Result<ItemId> {
        let now = Utc::now();
        let video_id = extract_source_video_id(url);
        let row_id = sqlx::query(
            r#"
            INSERT INTO items (
                user_id, url, source_video_id, stage, progress,
                read_count, created_at, updated_at, subscription_id
            ) VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?5, ?6)
            "#,
        )
        .bind(user_id)
        .bind(url)
        .bind(video_id)
        .bind(Stage::Pending.as_str())
        .bind(now)
        .bind(subscription_id)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(row_id)
    }

    /// Find an existing item owned by `user_id` for the same `url` (used by
    /// the poller to skip URLs already enqueued for that user, spec §4.9 S5).
    pub async fn find_item_by_user_and_url(
        &self,
        user_id: UserId,
        url: &str,
    ) -> Result<Option<Item>> {
        let row = sqlx::query(&item_select_sql("WHERE user_id = ?1 AND url = ?2"))
            .bind(user_id)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_item(&r)))
    }

    /// Items owned by `user_id` with the given `channel_id` and no
    /// subscription backlink yet (spec §4.9: resolver back-link).
    pub async fn list_unlinked_items_for_channel(
        &self,
        user_id: UserId,
        channel_id: &str,
    ) -> Result<Vec<Item>> {
        let rows = sqlx::query(&item_select_sql(
            "WHERE user_id = ?1 AND channel_id = ?2 AND subscription_id IS NULL",
        ))
        .bind(user_id)
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_item).collect())
    }

    pub async fn fetch_by_id(&self, id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query(&item_select_sql("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_item(&r)))
    }

    /// Candidates for a pool, ordered per spec §4.1. `stages` selects the
    /// set of stages the pool is allowed to pick up.
    pub async fn list_by_stage(
        &self,
        stages: &[Stage],
        limit: usize,
        order: ListOrder,
    ) -> Result<Vec<Item>> {
        if stages.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let placeholders: Vec<String> = (1..=stages.len()).map(|i| format!("?{i}")).collect();
        let order_sql = match order {
            ListOrder::NewestCreated => "created_at DESC, id DESC",
            ListOrder::NewestTouched => "created_at DESC, updated_at DESC, id DESC",
        };
        let sql = format!(
            "{} WHERE stage IN ({}) ORDER BY {} LIMIT {}",
            item_select_sql(""),
            placeholders.join(", "),
            order_sql,
            limit
        );
        let mut q = sqlx::query(&sql);
        for s in stages {
            q = q.bind(s.as_str());
        }
        let rows = q.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_item).collect())
    }

    /// Unconditional update applying a sparse patch (spec §4.1 `update`).
    pub async fn update(&self, id: ItemId, patch: &ItemPatch) -> Result<()> {
        let (sql, binder) = build_update(patch);
        if sql.is_empty() {
            return Ok(());
        }
        let full_sql = format!("UPDATE items SET {sql}, updated_at = ? WHERE id = ?");
        let mut q = sqlx::query(&full_sql);
        q = binder(q);
        q = q.bind(Utc::now()).bind(id);
        q.execute(&self.pool).await?;
        Ok(())
    }

    /// Optimistic update used by the supervisor to avoid racing a live
    /// executor (spec §4.1 `claim_and_update`, §4.8): only applies if the row
    /// is still in `expect_stage` at the time of the write.
    pub async fn claim_and_update(
        &self,
        id: ItemId,
        expect_stage: Stage,
        patch: &ItemPatch,
    ) -> Result<bool> {
        let (sql, binder) = build_update(patch);
        if sql.is_empty() {
            return Ok(false);
        }
        let full_sql =
            format!("UPDATE items SET {sql}, updated_at = ? WHERE id = ? AND stage = ?");
        let mut q = sqlx::query(&full_sql);
        q = binder(q);
        q = q.bind(Utc::now()).bind(id).bind(expect_stage.as_str());
        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    // -- subscriptions --

    /// Enqueue a channel subscription for `user_id`, deduping on an existing
    /// pending row for the same (user, channel url) (spec §3 uniqueness,
    /// §8 property 8).
    pub async fn create_subscription(&self, user_id: UserId, channel_url: &str) -> Result<SubscriptionId> {
        if let Some(existing) = sqlx::query(
            "SELECT id FROM subscriptions WHERE user_id = ?1 AND channel_url = ?2 AND status = 'pending'",
        )
        .bind(user_id)
        .bind(channel_url)
        .fetch_optional(&self.pool)
        .await?
        {
            return Ok(existing.get::<i64, _>("id"));
        }
        let row_id = sqlx::query(
            "INSERT INTO subscriptions (user_id, channel_url, status) VALUES (?1, ?2, 'pending')",
        )
        .bind(user_id)
        .bind(channel_url)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(row_id)
    }

    pub async fn list_pending_subscriptions(&self) -> Result<Vec<Subscription>> {
        let rows = sqlx::query(&subscription_select_sql("WHERE status = 'pending'"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }

    pub async fn list_all_subscriptions(&self) -> Result<Vec<Subscription>> {
        let rows = sqlx::query(&subscription_select_sql("")).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }

    pub async fn find_resolved_subscription(
        &self,
        user_id: UserId,
        channel_id: &str,
    ) -> Result<Option<Subscription>> {
        let row = sqlx::query(&subscription_select_sql(
            "WHERE user_id = ?1 AND channel_id = ?2 AND status = 'resolved'",
        ))
        .bind(user_id)
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| row_to_subscription(&r)))
    }

    /// Promote a pending subscription to `resolved` (spec §4.9). Also seeds
    /// `auto_playlist_id` with the subscription's own id: there is no
    /// separate playlist-creation operation, so each resolved subscription
    /// is itself the auto-playlist newly discovered videos are appended to.
    pub async fn resolve_subscription(
        &self,
        id: SubscriptionId,
        channel_id: &str,
        channel_title: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE subscriptions SET status = 'resolved', channel_id = ?1, title = ?2, auto_playlist_id = ?3 WHERE id = ?3",
        )
        .bind(channel_id)
        .bind(channel_title)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a pending subscription after merging it into an already
    /// resolved (user, channel_id) row (spec §4.9, §8 property 8).
    pub async fn delete_subscription(&self, id: SubscriptionId) -> Result<()> {
        sqlx::query("DELETE FROM subscriptions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn touch_subscription_checked(&self, id: SubscriptionId) -> Result<()> {
        sqlx::query("UPDATE subscriptions SET last_check_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // -- playlists --

    /// `true` if `item_id` is a member of any playlist (spec §4.3 download
    /// short-circuit: playlist items skip transcript/summary entirely).
    pub async fn item_in_any_playlist(&self, item_id: ItemId) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM playlist_items WHERE item_id = ?1")
            .bind(item_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n") > 0)
    }

    pub async fn max_playlist_position(&self, playlist_id: i64) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COALESCE(MAX(position), 0) AS m FROM playlist_items WHERE playlist_id = ?1",
        )
        .bind(playlist_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("m"))
    }

    pub async fn append_to_playlist(&self, playlist_id: i64, item_id: ItemId, position: i64) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO playlist_items (playlist_id, item_id, position) VALUES (?1, ?2, ?3)",
        )
        .bind(playlist_id)
        .bind(item_id)
        .bind(position)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn list_playlist_items(&self, playlist_id: i64) -> Result<Vec<PlaylistItem>> {
        let rows = sqlx::query(
            "SELECT playlist_id, item_id, position FROM playlist_items WHERE playlist_id = ?1 ORDER BY position",
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| PlaylistItem {
                playlist_id: r.get("playlist_id"),
                item_id: r.get("item_id"),
                position: r.get("position"),
            })
            .collect())
    }
}

const ITEM_COLUMNS: &str = "id, user_id, url, source_video_id, stage, progress, language, title, \
    channel_id, channel_title, uploader_id, uploader, view_count, like_count, duration_seconds, \
    upload_date, thumbnail_url, thumbnail_path, media_file_path, audio_file_path, \
    transcript_file_path, transcript, summary, keywords, watch_position_seconds, read_count, \
    error_message, created_at, updated_at, downloaded_at, completed_at, subscription_id";

fn item_select_sql(predicate: &str) -> String {
    format!("SELECT {ITEM_COLUMNS} FROM items {predicate}")
}

fn subscription_select_sql(predicate: &str) -> String {
    format!(
        "SELECT id, user_id, channel_url, channel_id, title, status, auto_playlist_id, \
         last_check_at FROM subscriptions {predicate}"
    )
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Item {
    Item {
        id: row.get("id"),
        user_id: row.get("user_id"),
        url: row.get("url"),
        source_video_id: row.get("source_video_id"),
        stage: Stage::from_db_str(&row.get::<String, _>("stage")),
        progress: row.get("progress"),
        language: row.get("language"),
        title: row.get("title"),
        channel_id: row.get("channel_id"),
        channel_title: row.get("channel_title"),
        uploader_id: row.get("uploader_id"),
        uploader: row.get("uploader"),
        view_count: row.get("view_count"),
        like_count: row.get("like_count"),
        duration_seconds: row.get("duration_seconds"),
        upload_date: row.get("upload_date"),
        thumbnail_url: row.get("thumbnail_url"),
        thumbnail_path: row.get("thumbnail_path"),
        media_file_path: row.get("media_file_path"),
        audio_file_path: row.get("audio_file_path"),
        transcript_file_path: row.get("transcript_file_path"),
        transcript: row.get("transcript"),
        summary: row.get("summary"),
        keywords: row.get("keywords"),
        watch_position_seconds: row.get("watch_position_seconds"),
        read_count: row.get("read_count"),
        error_message: row.get("error_message"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        downloaded_at: row.get("downloaded_at"),
        completed_at: row.get("completed_at"),
        subscription_id: row.get("subscription_id"),
    }
}

fn row_to_subscription(row: &sqlx::sqlite::SqliteRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        channel_url: row.get("channel_url"),
        channel_id: row.get("channel_id"),
        title: row.get("title"),
        status: SubscriptionStatus::from_db_str(&row.get::<String, _>("status")),
        auto_playlist_id: row.get("auto_playlist_id"),
        last_check_at: row.get("last_check_at"),
    }
}

type Binder = Box<
    dyn for<'q> FnOnce(
        sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
>;

/// Build the `SET col = ?, col2 = ?, ...` fragment and a binder closure for
/// only the fields present in `patch` (spec §4.1: sparse patch update).
fn build_update(patch: &ItemPatch) -> (String, Binder) {
    let mut clauses = Vec::new();
    let mut binders: Vec<
        Box<
            dyn for<'q> FnOnce(
                sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
            ) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        >,
    > = Vec::new();

    macro_rules! field {
        ($col:literal, $val:expr) => {
            if let Some(v) = $val.clone() {
                clauses.push(concat!($col, " = ?").to_string());
                binders.push(Box::new(move |q| q.bind(v)));
            }
        };
    }

    if let Some(stage) = patch.stage {
        clauses.push("stage = ?".to_string());
        binders.push(Box::new(move |q| q.bind(stage.as_str())));
    }
    field!("progress", patch.progress);
    field!("language", patch.language);
    field!("title", patch.title);
    field!("channel_id", patch.channel_id);
    field!("channel_title", patch.channel_title);
    field!("uploader_id", patch.uploader_id);
    field!("uploader", patch.uploader);
    field!("view_count", patch.view_count);
    field!("like_count", patch.like_count);
    field!("duration_seconds", patch.duration_seconds);
    field!("upload_date", patch.upload_date);
    field!("thumbnail_url", patch.thumbnail_url);
    field!("thumbnail_path", patch.thumbnail_path);
    field!("media_file_path", patch.media_file_path);
    field!("audio_file_path", patch.audio_file_path);
    field!("transcript_file_path", patch.transcript_file_path);
    field!("transcript", patch.transcript);
    field!("summary", patch.summary);
    field!("keywords", patch.keywords);
    field!("watch_position_seconds", patch.watch_position_seconds);
    field!("downloaded_at", patch.downloaded_at);
    field!("completed_at", patch.completed_at);
    field!("subscription_id", patch.subscription_id);

    if let Some(err) = patch.error_message.clone() {
        clauses.push("error_message = ?".to_string());
        binders.push(Box::new(move |q| q.bind(err)));
    }

    let binder: Binder = Box::new(move |mut q| {
        for b in binders {
            q = b(q);
        }
        q
    });

    (clauses.join(", "), binder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ItemPatch;

    #[tokio::test]
    async fn create_and_fetch_item() {
        let store = Store::open_memory().await.unwrap();
        let id = store
            .create_item(1, "https://example.com/watch?v=ABCDEFGHIJK", None)
            .await
            .unwrap();
        let item = store.fetch_by_id(id).await.unwrap().unwrap();
        assert_eq!(item.stage, Stage::Pending);
        assert_eq!(item.source_video_id.as_deref(), Some("ABCDEFGHIJK"));
        assert_eq!(item.progress, 0);
    }

    #[tokio::test]
    async fn update_applies_only_patched_fields() {
        let store = Store::open_memory().await.unwrap();
        let id = store.create_item(1, "https://example.com/x", None).await.unwrap();
        store
            .update(id, &ItemPatch::new().stage(Stage::Downloading).progress(10))
            .await
            .unwrap();
        let item = store.fetch_by_id(id).await.unwrap().unwrap();
        assert_eq!(item.stage, Stage::Downloading);
        assert_eq!(item.progress, 10);
        assert!(item.title.is_none());
    }

    #[tokio::test]
    async fn list_by_stage_orders_newest_first() {
        let store = Store::open_memory().await.unwrap();
        let _a = store.create_item(1, "https://example.com/a", None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let _b = store.create_item(1, "https://example.com/b", None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let c = store.create_item(1, "https://example.com/c", None).await.unwrap();

        let items = store
            .list_by_stage(&[Stage::Pending], 10, ListOrder::NewestCreated)
            .await
            .unwrap();
        assert_eq!(items[0].id, c);
    }

    #[tokio::test]
    async fn claim_and_update_fails_if_stage_changed() {
        let store = Store::open_memory().await.unwrap();
        let id = store.create_item(1, "https://example.com/x", None).await.unwrap();
        store.update(id, &ItemPatch::new().stage(Stage::Downloading)).await.unwrap();

        let ok = store
            .claim_and_update(id, Stage::Pending, &ItemPatch::new().stage(Stage::Failed))
            .await
            .unwrap();
        assert!(!ok);
        let item = store.fetch_by_id(id).await.unwrap().unwrap();
        assert_eq!(item.stage, Stage::Downloading);

        let ok = store
            .claim_and_update(id, Stage::Downloading, &ItemPatch::new().stage(Stage::Pending))
            .await
            .unwrap();
        assert!(ok);
        let item = store.fetch_by_id(id).await.unwrap().unwrap();
        assert_eq!(item.stage, Stage::Pending);
    }

    #[tokio::test]
    async fn subscription_create_dedups_pending() {
        let store = Store::open_memory().await.unwrap();
        let id1 = store.create_subscription(1, "https://example.com/c1").await.unwrap();
        let id2 = store.create_subscription(1, "https://example.com/c1").await.unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.list_pending_subscriptions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn playlist_short_circuit_membership() {
        let store = Store::open_memory().await.unwrap();
        let id = store.create_item(1, "https://example.com/x", None).await.unwrap();
        assert!(!store.item_in_any_playlist(id).await.unwrap());
        store.append_to_playlist(7, id, 1).await.unwrap();
        assert!(store.item_in_any_playlist(id).await.unwrap());
    }
}
