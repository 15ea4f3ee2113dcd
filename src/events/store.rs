/// Event persistence
use super::{
    Creator, Event, EventContact, EventKind, EventSchedule, EventStatus, NewEvent,
    NewOrganizerEvent, PendingEvent,
};
use crate::{
    db::{self, format_timestamp, parse_optional_timestamp, parse_timestamp},
    error::{AppError, AppResult},
};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

const EVENT_COLUMNS: &str = r#"
    id, event_type, title, description, event_date, start_date, end_date,
    latitude, longitude, location_name, is_paid, registration_url,
    status, rejection_reason, rejected_at, created_by, created_at
"#;

/// Event store
#[derive(Clone)]
pub struct EventStore {
    db: SqlitePool,
}

impl EventStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a community event awaiting moderation
    pub async fn create_event(&self, created_by: i64, input: NewEvent) -> AppResult<Event> {
        input.validate()?;

        let now = db::now();
        let event_date = input.event_date.map(db::truncate_timestamp);
        let registration_url = input
            .registration_url
            .filter(|url| !url.trim().is_empty());

        let result = sqlx::query(
            r#"
            INSERT INTO events
            (event_type, title, description, event_date, latitude, longitude,
             location_name, is_paid, registration_url, status, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(EventKind::Standard.as_str())
        .bind(&input.title)
        .bind(&input.description)
        .bind(event_date.as_ref().map(format_timestamp))
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(&input.location_name)
        .bind(input.is_paid)
        .bind(&registration_url)
        .bind(EventStatus::Pending.as_str())
        .bind(created_by)
        .bind(format_timestamp(&now))
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!(event_id = id, created_by, "Created pending event");

        Ok(Event {
            id,
            schedule: EventSchedule::Standard { event_date },
            title: input.title,
            description: input.description,
            latitude: input.latitude,
            longitude: input.longitude,
            location_name: input.location_name,
            is_paid: input.is_paid,
            registration_url,
            status: EventStatus::Pending,
            rejection_reason: None,
            rejected_at: None,
            created_by,
            created_at: now,
        })
    }

    /// Create an organizer event awaiting moderation or publication
    pub async fn create_organizer_event(
        &self,
        created_by: i64,
        input: NewOrganizerEvent,
    ) -> AppResult<Event> {
        input.validate()?;

        let now = db::now();
        let start_date = db::truncate_timestamp(input.start_date);
        let end_date = db::truncate_timestamp(input.end_date);

        let result = sqlx::query(
            r#"
            INSERT INTO events
            (event_type, title, description, start_date, end_date, latitude, longitude,
             location_name, is_paid, status, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(EventKind::Organizer.as_str())
        .bind(&input.title)
        .bind(&input.description)
        .bind(format_timestamp(&start_date))
        .bind(format_timestamp(&end_date))
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(&input.location_name)
        .bind(input.is_paid)
        .bind(EventStatus::Pending.as_str())
        .bind(created_by)
        .bind(format_timestamp(&now))
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!(event_id = id, created_by, "Created pending organizer event");

        Ok(Event {
            id,
            schedule: EventSchedule::Organizer {
                start_date,
                end_date,
            },
            title: input.title,
            description: input.description,
            latitude: input.latitude,
            longitude: input.longitude,
            location_name: input.location_name,
            is_paid: input.is_paid,
            registration_url: None,
            status: EventStatus::Pending,
            rejection_reason: None,
            rejected_at: None,
            created_by,
            created_at: now,
        })
    }

    /// Get an event regardless of status
    pub async fn get_event(&self, event_id: i64) -> AppResult<Event> {
        let row = sqlx::query(&format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS))
            .bind(event_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

        parse_event(&row)
    }

    /// Get an approved event, as shown to the public
    pub async fn get_approved_event(&self, event_id: i64) -> AppResult<Event> {
        let event = self.get_event(event_id).await?;
        if event.status != EventStatus::Approved {
            return Err(AppError::NotFound(format!("Event {} not found", event_id)));
        }
        Ok(event)
    }

    /// Get an organizer event
    pub async fn get_organizer_event(&self, event_id: i64) -> AppResult<Event> {
        let event = self.get_event(event_id).await?;
        if event.kind() != EventKind::Organizer {
            return Err(AppError::NotFound(format!(
                "Organizer event {} not found",
                event_id
            )));
        }
        Ok(event)
    }

    /// Events created by a user, newest first
    pub async fn list_by_creator(&self, user_id: i64) -> AppResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM events WHERE created_by = ? ORDER BY created_at DESC, id DESC",
            EVENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(parse_event).collect()
    }

    /// All approved events, newest first
    pub async fn list_approved(&self) -> AppResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM events WHERE status = 'approved' ORDER BY created_at DESC, id DESC",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(parse_event).collect()
    }

    /// Moderation queue, oldest first
    pub async fn list_pending(&self) -> AppResult<Vec<PendingEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT e.id, e.event_type, e.title, e.event_date, e.start_date,
                   e.location_name, e.created_at, u.id AS creator_id, u.email AS creator_email
            FROM events e
            JOIN users u ON u.id = e.created_by
            WHERE e.status = 'pending'
            ORDER BY e.created_at ASC, e.id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let event_type = EventKind::from_str(row.get("event_type"))?;
            // Organizer events carry their start date in place of event_date
            let event_date = match event_type {
                EventKind::Standard => parse_optional_timestamp(row.get("event_date"))?,
                EventKind::Organizer => parse_optional_timestamp(row.get("start_date"))?,
            };

            events.push(PendingEvent {
                id: row.get("id"),
                event_type,
                title: row.get("title"),
                event_date,
                location_name: row.get("location_name"),
                created_at: parse_timestamp(row.get("created_at"))?,
                creator: Creator {
                    id: row.get("creator_id"),
                    email: row.get("creator_email"),
                },
            });
        }

        Ok(events)
    }

    /// Published organizer events whose span lies within `[start, end]`
    pub async fn search_published_organizer(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM events
            WHERE event_type = 'organizer'
              AND status = 'published'
              AND start_date >= ?
              AND end_date <= ?
            ORDER BY start_date ASC, id ASC
            "#,
            EVENT_COLUMNS
        ))
        .bind(format_timestamp(&start))
        .bind(format_timestamp(&end))
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(parse_event).collect()
    }

    /// Title and creator contact details for notifying about an event
    pub async fn get_event_data(&self, event_id: i64) -> AppResult<EventContact> {
        let row = sqlx::query(
            r#"
            SELECT e.title, u.email, u.fcm_token, u.id
            FROM events e
            JOIN users u ON u.id = e.created_by
            WHERE e.id = ?
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Event {} or its creator not found", event_id))
        })?;

        let push_token: Option<String> = row.get("fcm_token");

        Ok(EventContact {
            event_id,
            title: row.get("title"),
            recipient_email: row.get("email"),
            recipient_push_token: push_token.filter(|t| !t.is_empty()),
            recipient_user_id: row.get("id"),
        })
    }
}

/// Parse a row selected with `EVENT_COLUMNS`
fn parse_event(row: &SqliteRow) -> AppResult<Event> {
    let kind = EventKind::from_str(row.get("event_type"))?;
    let schedule = match kind {
        EventKind::Standard => EventSchedule::Standard {
            event_date: parse_optional_timestamp(row.get("event_date"))?,
        },
        EventKind::Organizer => {
            let start: Option<String> = row.get("start_date");
            let end: Option<String> = row.get("end_date");
            match (start, end) {
                (Some(start), Some(end)) => EventSchedule::Organizer {
                    start_date: parse_timestamp(&start)?,
                    end_date: parse_timestamp(&end)?,
                },
                _ => {
                    return Err(AppError::Internal(format!(
                        "Organizer event {} is missing its date range",
                        row.get::<i64, _>("id")
                    )))
                }
            }
        }
    };

    Ok(Event {
        id: row.get("id"),
        schedule,
        title: row.get("title"),
        description: row.get("description"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        location_name: row.get("location_name"),
        is_paid: row.get("is_paid"),
        registration_url: row.get("registration_url"),
        status: EventStatus::from_str(row.get("status"))?,
        rejection_reason: row.get("rejection_reason"),
        rejected_at: parse_optional_timestamp(row.get("rejected_at"))?,
        created_by: row.get("created_by"),
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}
