/// Journal likes
use super::JournalStore;
use crate::{
    db::{self, format_timestamp},
    error::AppResult,
};
use sqlx::SqlitePool;

/// Like store
#[derive(Clone)]
pub struct LikeStore {
    db: SqlitePool,
    journals: JournalStore,
}

impl LikeStore {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            journals: JournalStore::new(db.clone()),
            db,
        }
    }

    /// Like the journal, or remove an existing like. Returns whether the
    /// user likes it afterwards.
    pub async fn toggle(&self, journal_id: i64, user_id: i64) -> AppResult<bool> {
        self.journals.get_visible(journal_id, Some(user_id)).await?;

        let mut tx = self.db.begin().await?;

        let removed = sqlx::query("DELETE FROM journal_likes WHERE user_id = ? AND journal_id = ?")
            .bind(user_id)
            .bind(journal_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            sqlx::query(
                "INSERT INTO journal_likes (user_id, journal_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(journal_id)
            .bind(format_timestamp(&db::now()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let liked = removed == 0;
        tracing::debug!(journal_id, user_id, liked, "Toggled journal like");
        Ok(liked)
    }

    /// Like count of a journal the viewer can see
    pub async fn count(&self, journal_id: i64, viewer: Option<i64>) -> AppResult<i64> {
        self.journals.get_visible(journal_id, viewer).await?;

        let total = sqlx::query_scalar("SELECT COUNT(*) FROM journal_likes WHERE journal_id = ?")
            .bind(journal_id)
            .fetch_one(&self.db)
            .await?;
        Ok(total)
    }
}
