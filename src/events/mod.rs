/// Events and their lifecycle
///
/// Two event variants coexist: community (`standard`) events, which go
/// through admin moderation, and `organizer` events, which may additionally
/// be published. Both start out `pending`.

pub mod store;

pub use store::EventStore;

use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event variant, stored as `event_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Standard,
    Organizer,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Standard => "standard",
            EventKind::Organizer => "organizer",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "standard" => Ok(EventKind::Standard),
            "organizer" => Ok(EventKind::Organizer),
            _ => Err(AppError::Internal(format!("Invalid event type: {}", s))),
        }
    }
}

/// Event lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Awaiting moderation; the initial state of every event
    Pending,
    Approved,
    Rejected,
    /// Organizer events only
    Published,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
            EventStatus::Published => "published",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "pending" => Ok(EventStatus::Pending),
            "approved" => Ok(EventStatus::Approved),
            "rejected" => Ok(EventStatus::Rejected),
            "published" => Ok(EventStatus::Published),
            _ => Err(AppError::Internal(format!("Invalid event status: {}", s))),
        }
    }

    /// Whether an event of `kind` may move from this status to `next`.
    ///
    /// Every transition starts at `pending`; `published` belongs to organizer
    /// events alone.
    pub fn can_transition_to(&self, next: EventStatus, kind: EventKind) -> bool {
        matches!(
            (self, next, kind),
            (EventStatus::Pending, EventStatus::Approved, _)
                | (EventStatus::Pending, EventStatus::Rejected, _)
                | (EventStatus::Pending, EventStatus::Published, EventKind::Organizer)
        )
    }
}

/// Variant-specific scheduling data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "lowercase")]
pub enum EventSchedule {
    Standard {
        event_date: Option<DateTime<Utc>>,
    },
    Organizer {
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    },
}

impl EventSchedule {
    pub fn kind(&self) -> EventKind {
        match self {
            EventSchedule::Standard { .. } => EventKind::Standard,
            EventSchedule::Organizer { .. } => EventKind::Organizer,
        }
    }
}

/// Event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    #[serde(flatten)]
    pub schedule: EventSchedule,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    pub is_paid: bool,
    pub registration_url: Option<String>,
    pub status: EventStatus,
    /// Set iff `status` is `rejected`
    pub rejection_reason: Option<String>,
    /// Set iff `status` is `rejected`
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.schedule.kind()
    }
}

/// Event title joined with its creator's contact identifiers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventContact {
    pub event_id: i64,
    pub title: String,
    pub recipient_email: String,
    pub recipient_push_token: Option<String>,
    pub recipient_user_id: i64,
}

/// Creator summary shown in the moderation queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub id: i64,
    pub email: String,
}

/// Entry in the moderation queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingEvent {
    pub id: i64,
    pub event_type: EventKind,
    pub title: String,
    pub event_date: Option<DateTime<Utc>>,
    pub location_name: String,
    pub created_at: DateTime<Utc>,
    pub creator: Creator,
}

/// Input for a community event
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub location_name: String,
    #[serde(default)]
    pub is_paid: bool,
    pub registration_url: Option<String>,
}

impl NewEvent {
    pub fn validate(&self) -> AppResult<()> {
        require_non_empty("title", &self.title)?;
        validate_coordinates(self.latitude, self.longitude)?;

        let has_url = self
            .registration_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        if self.is_paid && !has_url {
            return Err(AppError::Validation(
                "registration_url is required for paid events".to_string(),
            ));
        }

        Ok(())
    }
}

/// Input for an organizer event
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrganizerEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    #[serde(default)]
    pub is_paid: bool,
}

impl NewOrganizerEvent {
    pub fn validate(&self) -> AppResult<()> {
        require_non_empty("title", &self.title)?;
        require_non_empty("location_name", &self.location_name)?;
        validate_coordinates(self.latitude, self.longitude)?;

        if self.start_date > self.end_date {
            return Err(AppError::Validation(
                "start_date must not be after end_date".to_string(),
            ));
        }

        Ok(())
    }
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

pub(crate) fn validate_coordinates(latitude: f64, longitude: f64) -> AppResult<()> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::Validation("Coordinates out of range".to_string()));
    }
    Ok(())
}
