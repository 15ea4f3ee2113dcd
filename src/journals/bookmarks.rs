/// Journal bookmarks
use super::{store::parse_journal, Journal, JournalStore};
use crate::{
    db::{self, format_timestamp},
    error::AppResult,
};
use sqlx::SqlitePool;

/// Bookmark store
#[derive(Clone)]
pub struct BookmarkStore {
    db: SqlitePool,
    journals: JournalStore,
}

impl BookmarkStore {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            journals: JournalStore::new(db.clone()),
            db,
        }
    }

    /// Bookmark a journal the user can see. Bookmarking twice is a no-op.
    pub async fn add(&self, user_id: i64, journal_id: i64) -> AppResult<()> {
        self.journals.get_visible(journal_id, Some(user_id)).await?;

        sqlx::query(
            r#"
            INSERT INTO bookmarks (user_id, journal_id, created_at) VALUES (?, ?, ?)
            ON CONFLICT (user_id, journal_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(journal_id)
        .bind(format_timestamp(&db::now()))
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Remove a bookmark if present
    pub async fn remove(&self, user_id: i64, journal_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM bookmarks WHERE user_id = ? AND journal_id = ?")
            .bind(user_id)
            .bind(journal_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Bookmarked journals still visible to the user, most recently bookmarked first
    pub async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<Journal>> {
        let rows = sqlx::query(
            r#"
            SELECT j.id, j.user_id, j.event_id, j.title, j.content,
                   j.latitude, j.longitude, j.is_public, j.created_at
            FROM bookmarks b
            JOIN journals j ON j.id = b.journal_id
            WHERE b.user_id = ? AND (j.is_public = 1 OR j.user_id = b.user_id)
            ORDER BY b.created_at DESC, j.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(parse_journal).collect()
    }
}
