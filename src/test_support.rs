/// Shared fixtures for unit tests
use crate::{
    config::test_config,
    context::AppContext,
    db::{format_timestamp, test_pool},
    mailer::EmailTemplate,
    notifications::{
        fanout::Delivery, EmailChannel, NotificationChannels, NotificationSink, PushChannel,
    },
    push::PushMessage,
};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Matches the secret in `test_config()`
pub const TEST_JWT_SECRET: &str = "test-secret-that-is-at-least-32-characters";

/// Sign a token the way the auth service does
pub fn mint_token(user_id: i64, role: Option<&str>) -> String {
    let mut claims = serde_json::json!({
        "user_id": user_id,
        "exp": Utc::now().timestamp() + 3600,
    });
    if let Some(role) = role {
        claims["role"] = serde_json::json!(role);
    }

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn insert_user(db: &SqlitePool, email: &str, fcm_token: Option<&str>) -> i64 {
    sqlx::query("INSERT INTO users (name, email, fcm_token, created_at) VALUES (?, ?, ?, ?)")
        .bind(email.split('@').next().unwrap_or(email))
        .bind(email)
        .bind(fcm_token)
        .bind(format_timestamp(&Utc::now()))
        .execute(db)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub async fn insert_user_with_id(db: &SqlitePool, id: i64, email: &str) {
    sqlx::query("INSERT INTO users (id, name, email, created_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(email)
        .bind(email)
        .bind(format_timestamp(&Utc::now()))
        .execute(db)
        .await
        .unwrap();
}

pub async fn insert_pending_event(db: &SqlitePool, created_by: i64, title: &str) -> i64 {
    sqlx::query(
        "INSERT INTO events (event_type, title, status, created_by, created_at) \
         VALUES ('standard', ?, 'pending', ?, ?)",
    )
    .bind(title)
    .bind(created_by)
    .bind(format_timestamp(&Utc::now()))
    .execute(db)
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn insert_pending_event_with_id(
    db: &SqlitePool,
    id: i64,
    created_by: i64,
    title: &str,
) -> i64 {
    sqlx::query(
        "INSERT INTO events (id, event_type, title, status, created_by, created_at) \
         VALUES (?, 'standard', ?, 'pending', ?, ?)",
    )
    .bind(id)
    .bind(title)
    .bind(created_by)
    .bind(format_timestamp(&Utc::now()))
    .execute(db)
    .await
    .unwrap();
    id
}

pub async fn insert_pending_organizer_event(db: &SqlitePool, created_by: i64) -> i64 {
    let start = Utc::now();
    sqlx::query(
        "INSERT INTO events (event_type, title, start_date, end_date, location_name, status, created_by, created_at) \
         VALUES ('organizer', 'Festival', ?, ?, 'Park', 'pending', ?, ?)",
    )
    .bind(format_timestamp(&start))
    .bind(format_timestamp(&(start + chrono::Duration::hours(4))))
    .bind(created_by)
    .bind(format_timestamp(&start))
    .execute(db)
    .await
    .unwrap()
    .last_insert_rowid()
}

/// Journal at a fixed location, so it may be public
pub async fn insert_journal(db: &SqlitePool, user_id: i64, is_public: bool) -> i64 {
    sqlx::query(
        "INSERT INTO journals (user_id, title, content, latitude, longitude, is_public, created_at) \
         VALUES (?, 'Old town walk', 'Coffee and batik', -6.2, 106.8, ?, ?)",
    )
    .bind(user_id)
    .bind(is_public)
    .bind(format_timestamp(&Utc::now()))
    .execute(db)
    .await
    .unwrap()
    .last_insert_rowid()
}

/// Notification channels that record every attempt instead of sending
#[derive(Clone, Default)]
pub struct RecordingChannels {
    calls: Arc<Mutex<Vec<Delivery>>>,
    fail_email: bool,
}

impl RecordingChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Email attempts are recorded and then fail
    pub fn failing_email() -> Self {
        Self {
            fail_email: true,
            ..Self::default()
        }
    }

    pub fn channels(&self) -> NotificationChannels {
        let this = Arc::new(self.clone());
        NotificationChannels {
            email: this.clone(),
            push: this.clone(),
            sink: this,
            broadcast_topic: "all-users".to_string(),
        }
    }

    pub fn calls(&self) -> Vec<Delivery> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until at least `n` attempts were recorded
    pub async fn wait_for_calls(&self, n: usize) -> Vec<Delivery> {
        for _ in 0..200 {
            let calls = self.calls();
            if calls.len() >= n {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} notification attempts, got {:?}", n, self.calls());
    }

    /// Attempt count once in-flight deliveries had time to land
    pub async fn settled_count(&self) -> usize {
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.calls().len()
    }

    fn record(&self, delivery: Delivery) {
        self.calls.lock().unwrap().push(delivery);
    }
}

#[async_trait]
impl EmailChannel for RecordingChannels {
    async fn send_templated(&self, to: &str, template: &EmailTemplate) -> anyhow::Result<()> {
        self.record(Delivery::Email {
            to: to.to_string(),
            template: template.clone(),
        });
        if self.fail_email {
            anyhow::bail!("SMTP unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl PushChannel for RecordingChannels {
    async fn send_to_token(&self, token: &str, message: &PushMessage) -> anyhow::Result<()> {
        self.record(Delivery::PushToToken {
            token: token.to_string(),
            message: message.clone(),
        });
        Ok(())
    }

    async fn broadcast_to_topic(&self, topic: &str, message: &PushMessage) -> anyhow::Result<()> {
        self.record(Delivery::Broadcast {
            topic: topic.to_string(),
            message: message.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for RecordingChannels {
    async fn save_notification(
        &self,
        user_id: i64,
        title: &str,
        body: &str,
    ) -> anyhow::Result<()> {
        self.record(Delivery::SaveNotification {
            user_id,
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Application context over an in-memory database with recording channels
pub async fn test_context() -> (AppContext, RecordingChannels) {
    let db = test_pool().await;
    let recorder = RecordingChannels::new();
    let ctx = AppContext::with_channels(test_config(), db, recorder.channels());
    (ctx, recorder)
}
