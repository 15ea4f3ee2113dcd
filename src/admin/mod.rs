/// Event moderation
///
/// Admins move pending events to approved or rejected. Each decision is a
/// single guarded update plus an audit-log entry, followed by best-effort
/// notifications.

pub mod audit_log;
pub mod moderation;

pub use audit_log::{ModerationLog, ModerationLogEntry, ModerationLogView};
pub use moderation::{Decision, ModerationOutcome, ModerationService};

use crate::{
    error::{AppError, AppResult},
    events::EventStatus,
};
use serde::{Deserialize, Serialize};

/// Recorded moderation action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approved,
    Rejected,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Approved => "approved",
            ModerationAction::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "approved" => Ok(ModerationAction::Approved),
            "rejected" => Ok(ModerationAction::Rejected),
            _ => Err(AppError::Internal(format!("Invalid moderation action: {}", s))),
        }
    }

    /// Event status after this action
    pub fn target_status(&self) -> EventStatus {
        match self {
            ModerationAction::Approved => EventStatus::Approved,
            ModerationAction::Rejected => EventStatus::Rejected,
        }
    }
}
