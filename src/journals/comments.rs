/// Journal comments
use super::{Author, JournalStore};
use crate::{
    db::{self, format_timestamp, parse_timestamp},
    error::{AppError, AppResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Comment with its author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub journal_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user: Author,
}

/// Comment store
#[derive(Clone)]
pub struct CommentStore {
    db: SqlitePool,
    journals: JournalStore,
}

impl CommentStore {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            journals: JournalStore::new(db.clone()),
            db,
        }
    }

    /// Comment on a journal the user can see
    pub async fn create(&self, journal_id: i64, user_id: i64, content: &str) -> AppResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("content required".to_string()));
        }

        self.journals.get_visible(journal_id, Some(user_id)).await?;

        let now = db::now();
        let result = sqlx::query(
            "INSERT INTO comments (journal_id, user_id, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(journal_id)
        .bind(user_id)
        .bind(content)
        .bind(format_timestamp(&now))
        .execute(&self.db)
        .await?;

        let email: String = sqlx::query_scalar("SELECT email FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            journal_id,
            content: content.to_string(),
            created_at: now,
            user: Author { id: user_id, email },
        })
    }

    /// Comments on a journal, oldest first
    pub async fn list_for_journal(
        &self,
        journal_id: i64,
        viewer: Option<i64>,
    ) -> AppResult<Vec<Comment>> {
        self.journals.get_visible(journal_id, viewer).await?;
        Self::list_rows(&self.db, journal_id).await
    }

    pub(crate) async fn list_rows(db: &SqlitePool, journal_id: i64) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.journal_id, c.content, c.created_at, u.id AS user_id, u.email
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.journal_id = ?
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(journal_id)
        .fetch_all(db)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Comment {
                    id: row.get("id"),
                    journal_id: row.get("journal_id"),
                    content: row.get("content"),
                    created_at: parse_timestamp(row.get("created_at"))?,
                    user: Author {
                        id: row.get("user_id"),
                        email: row.get("email"),
                    },
                })
            })
            .collect()
    }

    /// Delete a comment. Only its author may.
    pub async fn delete(&self, comment_id: i64, user_id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ? AND user_id = ?")
            .bind(comment_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM comments WHERE id = ?)")
                    .bind(comment_id)
                    .fetch_one(&self.db)
                    .await?;

            return Err(if exists {
                AppError::Forbidden("not allowed".to_string())
            } else {
                AppError::NotFound("comment not found".to_string())
            });
        }

        tracing::debug!(comment_id, user_id, "Deleted comment");
        Ok(())
    }
}
