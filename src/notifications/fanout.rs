/// Fire-and-forget dispatch of moderation notifications
///
/// Jobs are pushed onto an unbounded queue and picked up by a single worker,
/// which spawns one detached task per delivery. Deliveries of the same job
/// run concurrently and in no particular order.
use super::NotificationChannels;
use crate::{
    admin::ModerationAction, events::EventContact, mailer::EmailTemplate, push::PushMessage,
};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, warn};

/// Notifications owed for one committed moderation decision
#[derive(Debug, Clone)]
pub struct FanoutJob {
    pub contact: EventContact,
    pub action: ModerationAction,
    /// Present for rejections
    pub reason: Option<String>,
    /// Frontend link to the event
    pub event_url: String,
}

/// A single notification attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Email {
        to: String,
        template: EmailTemplate,
    },
    PushToToken {
        token: String,
        message: PushMessage,
    },
    SaveNotification {
        user_id: i64,
        title: String,
        body: String,
    },
    Broadcast {
        topic: String,
        message: PushMessage,
    },
}

impl Delivery {
    /// Channel name for logs
    pub fn channel(&self) -> &'static str {
        match self {
            Delivery::Email { .. } => "email",
            Delivery::PushToToken { .. } => "push",
            Delivery::SaveNotification { .. } => "notification",
            Delivery::Broadcast { .. } => "broadcast",
        }
    }
}

/// Work out every delivery a job calls for.
///
/// The creator always gets an email and a stored notification, plus a push
/// when they have a device token. Approvals are also broadcast to
/// `broadcast_topic`.
pub fn plan_deliveries(job: &FanoutJob, broadcast_topic: &str) -> Vec<Delivery> {
    let contact = &job.contact;
    let event_id = contact.event_id.to_string();
    let mut deliveries = Vec::with_capacity(4);

    let (template, creator_message) = match job.action {
        ModerationAction::Approved => (
            EmailTemplate::EventApproved {
                title: contact.title.clone(),
                event_url: job.event_url.clone(),
            },
            PushMessage::new(
                "Event Approved 🎉",
                format!("Your event '{}' has been approved!", contact.title),
            )
            .with_data("type", "event_approved")
            .with_data("event_id", &event_id),
        ),
        ModerationAction::Rejected => (
            EmailTemplate::EventRejected {
                title: contact.title.clone(),
                reason: job.reason.clone().unwrap_or_default(),
                event_url: job.event_url.clone(),
            },
            PushMessage::new(
                "Event Rejected ❌",
                format!("Your event '{}' was rejected.", contact.title),
            )
            .with_data("type", "event_rejected")
            .with_data("event_id", &event_id),
        ),
    };

    deliveries.push(Delivery::Email {
        to: contact.recipient_email.clone(),
        template,
    });

    if let Some(token) = contact.recipient_push_token.as_deref().filter(|t| !t.is_empty()) {
        deliveries.push(Delivery::PushToToken {
            token: token.to_string(),
            message: creator_message.clone(),
        });
    }

    deliveries.push(Delivery::SaveNotification {
        user_id: contact.recipient_user_id,
        title: creator_message.title.clone(),
        body: creator_message.body.clone(),
    });

    if job.action == ModerationAction::Approved {
        deliveries.push(Delivery::Broadcast {
            topic: broadcast_topic.to_string(),
            message: PushMessage::new("New Event Available 🎊", contact.title.clone())
                .with_data("type", "new_event")
                .with_data("event_id", &event_id),
        });
    }

    deliveries
}

/// Run one delivery against its channel
async fn deliver(channels: &NotificationChannels, delivery: &Delivery) -> anyhow::Result<()> {
    match delivery {
        Delivery::Email { to, template } => channels.email.send_templated(to, template).await,
        Delivery::PushToToken { token, message } => {
            channels.push.send_to_token(token, message).await
        }
        Delivery::SaveNotification {
            user_id,
            title,
            body,
        } => channels.sink.save_notification(*user_id, title, body).await,
        Delivery::Broadcast { topic, message } => {
            channels.push.broadcast_to_topic(topic, message).await
        }
    }
}

/// Spawn one detached task per delivery
fn dispatch(channels: &Arc<NotificationChannels>, job: FanoutJob) {
    let event_id = job.contact.event_id;

    for delivery in plan_deliveries(&job, &channels.broadcast_topic) {
        let channels = Arc::clone(channels);
        tokio::spawn(async move {
            let channel = delivery.channel();
            match deliver(&channels, &delivery).await {
                Ok(()) => debug!(event_id, channel, "Notification delivered"),
                Err(e) => warn!(event_id, channel, "Notification failed: {:#}", e),
            }
        });
    }
}

/// Handle for enqueueing fan-out jobs
#[derive(Clone)]
pub struct FanoutQueue {
    sender: mpsc::UnboundedSender<FanoutJob>,
}

impl FanoutQueue {
    /// Start the worker. It exits once every queue handle has been dropped.
    pub fn start(channels: NotificationChannels) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<FanoutJob>();
        let channels = Arc::new(channels);

        let worker = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                dispatch(&channels, job);
            }
            debug!("Notification fan-out worker stopped");
        });

        (Self { sender }, worker)
    }

    /// Enqueue a job without waiting for it. Never fails the caller.
    pub fn enqueue(&self, job: FanoutJob) {
        let event_id = job.contact.event_id;
        if self.sender.send(job).is_err() {
            error!(event_id, "Notification fan-out worker is gone, dropping notifications");
        }
    }
}
