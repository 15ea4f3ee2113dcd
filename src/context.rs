/// Application context and dependency injection
use crate::{
    account::AccountStore,
    admin::{ModerationLog, ModerationService},
    config::ServerConfig,
    db,
    error::AppResult,
    events::EventStore,
    journals::{BookmarkStore, CommentStore, ImageStore, JournalStore, LikeStore},
    mailer::Mailer,
    notifications::{FanoutQueue, NotificationChannels, NotificationStore},
    push::FcmClient,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub accounts: Arc<AccountStore>,
    pub events: Arc<EventStore>,
    pub notifications: Arc<NotificationStore>,
    // Journals
    pub journals: Arc<JournalStore>,
    pub comments: Arc<CommentStore>,
    pub likes: Arc<LikeStore>,
    pub bookmarks: Arc<BookmarkStore>,
    pub images: Arc<ImageStore>,
    // Moderation
    pub moderation_log: Arc<ModerationLog>,
    pub moderation: Arc<ModerationService>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize database
        let db = db::create_pool(
            &config.storage.database_path,
            db::DatabaseOptions {
                max_connections: config.storage.max_connections,
                ..Default::default()
            },
        )
        .await?;

        // Run migrations
        db::run_migrations(&db).await?;

        // Test connection
        db::test_connection(&db).await?;

        // Initialize notification transports
        let mailer = Mailer::new(config.email.clone())?;
        if !mailer.is_configured() {
            tracing::warn!("Email not configured - moderation emails will be skipped");
        }

        let push = FcmClient::new(&config.push)?;
        if !push.is_configured() {
            tracing::warn!("FCM not configured - push notifications will be skipped");
        }

        let channels = NotificationChannels {
            email: Arc::new(mailer),
            push: Arc::new(push),
            sink: Arc::new(NotificationStore::new(db.clone())),
            broadcast_topic: config.push.broadcast_topic.clone(),
        };

        Ok(Self::with_channels(config, db, channels))
    }

    /// Assemble the context around an open pool and notification channels.
    /// Starts the fan-out worker, so it must run inside a tokio runtime.
    pub fn with_channels(
        config: ServerConfig,
        db: SqlitePool,
        channels: NotificationChannels,
    ) -> Self {
        let config = Arc::new(config);
        let (fanout, _worker) = FanoutQueue::start(channels);

        let moderation = Arc::new(ModerationService::new(
            db.clone(),
            Arc::clone(&config),
            fanout,
        ));

        Self {
            accounts: Arc::new(AccountStore::new(db.clone())),
            events: Arc::new(EventStore::new(db.clone())),
            notifications: Arc::new(NotificationStore::new(db.clone())),
            journals: Arc::new(JournalStore::new(db.clone())),
            comments: Arc::new(CommentStore::new(db.clone())),
            likes: Arc::new(LikeStore::new(db.clone())),
            bookmarks: Arc::new(BookmarkStore::new(db.clone())),
            images: Arc::new(ImageStore::new(
                db.clone(),
                config.storage.upload_dir.clone(),
            )),
            moderation_log: Arc::new(ModerationLog::new(db.clone())),
            moderation,
            config,
            db,
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
