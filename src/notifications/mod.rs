/// Notification fan-out
///
/// After a moderation decision commits, the event creator (and, for
/// approvals, every subscribed client) is told about it over several
/// independent channels. Delivery is best-effort and at-most-once: a failed
/// channel is logged and never retried, and nothing here can undo or fail
/// the decision itself.

pub mod fanout;
pub mod store;

pub use fanout::{FanoutJob, FanoutQueue};
pub use store::{Notification, NotificationStore};

use crate::{mailer::EmailTemplate, push::PushMessage};
use async_trait::async_trait;
use std::sync::Arc;

/// Templated email transport
#[async_trait]
pub trait EmailChannel: Send + Sync {
    async fn send_templated(&self, to: &str, template: &EmailTemplate) -> anyhow::Result<()>;
}

/// Push notification transport
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Send a push notification to a single device token
    async fn send_to_token(&self, token: &str, message: &PushMessage) -> anyhow::Result<()>;

    /// Send a push notification to every device subscribed to `topic`
    async fn broadcast_to_topic(&self, topic: &str, message: &PushMessage) -> anyhow::Result<()>;
}

/// Persisted notification history
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn save_notification(&self, user_id: i64, title: &str, body: &str)
        -> anyhow::Result<()>;
}

/// The set of transports a fan-out delivers through
#[derive(Clone)]
pub struct NotificationChannels {
    pub email: Arc<dyn EmailChannel>,
    pub push: Arc<dyn PushChannel>,
    pub sink: Arc<dyn NotificationSink>,
    /// Topic used for approval broadcasts
    pub broadcast_topic: String,
}
