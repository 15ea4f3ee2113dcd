/// Append-only moderation audit trail
use super::ModerationAction;
use crate::{
    db::{self, format_timestamp, parse_timestamp},
    error::AppResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection, SqlitePool};

/// One moderation decision. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationLogEntry {
    pub id: i64,
    pub event_id: i64,
    pub admin_id: i64,
    pub action: ModerationAction,
    /// Present iff `action` is `rejected`
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Log entry joined with the acting admin's email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationLogView {
    #[serde(flatten)]
    pub entry: ModerationLogEntry,
    pub admin_email: Option<String>,
}

/// Moderation log
#[derive(Clone)]
pub struct ModerationLog {
    db: SqlitePool,
}

impl ModerationLog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append an entry on `conn`, normally inside the transaction that
    /// performed the status change.
    pub async fn append(
        &self,
        conn: &mut SqliteConnection,
        event_id: i64,
        admin_id: i64,
        action: ModerationAction,
        reason: Option<&str>,
    ) -> AppResult<ModerationLogEntry> {
        let now = db::now();
        let reason = match action {
            ModerationAction::Approved => None,
            ModerationAction::Rejected => reason.map(str::to_string),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO event_moderation_logs (event_id, admin_id, action, reason, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(event_id)
        .bind(admin_id)
        .bind(action.as_str())
        .bind(&reason)
        .bind(format_timestamp(&now))
        .execute(&mut *conn)
        .await?;

        Ok(ModerationLogEntry {
            id: result.last_insert_rowid(),
            event_id,
            admin_id,
            action,
            reason,
            created_at: now,
        })
    }

    /// Moderation history of an event, newest first
    pub async fn list_for_event(&self, event_id: i64) -> AppResult<Vec<ModerationLogView>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.event_id, l.admin_id, l.action, l.reason, l.created_at,
                   u.email AS admin_email
            FROM event_moderation_logs l
            LEFT JOIN users u ON u.id = l.admin_id
            WHERE l.event_id = ?
            ORDER BY l.created_at DESC, l.id DESC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ModerationLogView {
                    entry: ModerationLogEntry {
                        id: row.get("id"),
                        event_id: row.get("event_id"),
                        admin_id: row.get("admin_id"),
                        action: ModerationAction::from_str(row.get("action"))?,
                        reason: row.get("reason"),
                        created_at: parse_timestamp(row.get("created_at"))?,
                    },
                    admin_email: row.get("admin_email"),
                })
            })
            .collect()
    }

    /// Number of entries recorded for an event
    pub async fn count_for_event(&self, event_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM event_moderation_logs WHERE event_id = ?",
        )
        .bind(event_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }
}
