/// Notification history persistence
use super::NotificationSink;
use crate::{
    db::{self, format_timestamp, parse_timestamp},
    error::AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Stored notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification store
#[derive(Clone)]
pub struct NotificationStore {
    db: SqlitePool,
}

impl NotificationStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record a notification for a user
    pub async fn save(&self, user_id: i64, title: &str, body: &str) -> AppResult<Notification> {
        let now = db::now();

        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, title, body, is_read, created_at)
            VALUES (?, ?, ?, 0, ?)
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(body)
        .bind(format_timestamp(&now))
        .execute(&self.db)
        .await?;

        Ok(Notification {
            id: result.last_insert_rowid(),
            user_id,
            title: title.to_string(),
            body: body.to_string(),
            is_read: false,
            created_at: now,
        })
    }

    /// Notifications for a user, newest first
    pub async fn list_for_user(&self, user_id: i64, limit: i64) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, body, is_read, created_at
            FROM notifications
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Notification {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    title: row.get("title"),
                    body: row.get("body"),
                    is_read: row.get("is_read"),
                    created_at: parse_timestamp(row.get("created_at"))?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl NotificationSink for NotificationStore {
    async fn save_notification(
        &self,
        user_id: i64,
        title: &str,
        body: &str,
    ) -> anyhow::Result<()> {
        self.save(user_id, title, body).await?;
        Ok(())
    }
}
