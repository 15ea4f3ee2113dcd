/// Event moderation state machine
use super::{ModerationAction, ModerationLog, ModerationLogEntry};
use crate::{
    auth::Actor,
    config::ServerConfig,
    db::{self, format_timestamp},
    error::{AppError, AppResult},
    events::{EventKind, EventStatus, EventStore},
    notifications::{FanoutJob, FanoutQueue},
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

/// An admin's verdict on a pending event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { reason: Option<String> },
}

impl Decision {
    /// Resolve to the recorded action and its reason.
    /// Rejections need a reason with visible content.
    fn into_action(self) -> AppResult<(ModerationAction, Option<String>)> {
        match self {
            Decision::Approve => Ok((ModerationAction::Approved, None)),
            Decision::Reject { reason } => {
                let reason = reason
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| {
                        AppError::Validation("rejection reason required".to_string())
                    })?;
                Ok((ModerationAction::Rejected, Some(reason)))
            }
        }
    }
}

/// Result of a committed moderation decision
#[derive(Debug, Clone, Serialize)]
pub struct ModerationOutcome {
    pub event_id: i64,
    pub status: EventStatus,
    pub log_entry: ModerationLogEntry,
}

/// Moderation service
///
/// The only writer of event status. Concurrent decisions on one event are
/// resolved by the `status = 'pending'` predicate of a single UPDATE: the
/// first writer wins and every later one matches zero rows.
#[derive(Clone)]
pub struct ModerationService {
    db: SqlitePool,
    config: Arc<ServerConfig>,
    events: EventStore,
    log: ModerationLog,
    fanout: FanoutQueue,
}

impl ModerationService {
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>, fanout: FanoutQueue) -> Self {
        Self {
            events: EventStore::new(db.clone()),
            log: ModerationLog::new(db.clone()),
            db,
            config,
            fanout,
        }
    }

    /// Apply one moderation decision to a pending event.
    ///
    /// On success the status change and its log entry are committed together
    /// and notifications are queued; their outcome never affects the result.
    pub async fn transition(
        &self,
        event_id: i64,
        actor: &Actor,
        decision: Decision,
    ) -> AppResult<ModerationOutcome> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden("admin only".to_string()));
        }

        let (action, reason) = decision.into_action()?;
        let target = action.target_status();
        debug_assert!(EventStatus::Pending.can_transition_to(target, EventKind::Standard));

        let mut tx = self.db.begin().await?;

        let result = match action {
            ModerationAction::Approved => {
                sqlx::query(
                    r#"
                    UPDATE events
                    SET status = 'approved',
                        rejection_reason = NULL,
                        rejected_at = NULL
                    WHERE id = ? AND status = 'pending'
                    "#,
                )
                .bind(event_id)
                .execute(&mut *tx)
                .await?
            }
            ModerationAction::Rejected => {
                sqlx::query(
                    r#"
                    UPDATE events
                    SET status = 'rejected',
                        rejection_reason = ?,
                        rejected_at = ?
                    WHERE id = ? AND status = 'pending'
                    "#,
                )
                .bind(&reason)
                .bind(format_timestamp(&db::now()))
                .bind(event_id)
                .execute(&mut *tx)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFoundOrAlreadyProcessed { event_id });
        }

        let log_entry = self
            .log
            .append(&mut tx, event_id, actor.id, action, reason.as_deref())
            .await?;

        tx.commit().await?;

        info!(
            event_id,
            admin_id = actor.id,
            action = action.as_str(),
            "Moderation decision recorded"
        );

        self.notify(event_id, action, reason).await;

        Ok(ModerationOutcome {
            event_id,
            status: target,
            log_entry,
        })
    }

    /// Move a pending organizer event to `published`.
    ///
    /// Publication is outside the moderation log and sends no notifications.
    pub async fn publish_organizer_event(&self, event_id: i64, actor: &Actor) -> AppResult<()> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden("admin only".to_string()));
        }

        debug_assert!(
            EventStatus::Pending.can_transition_to(EventStatus::Published, EventKind::Organizer)
        );

        let result = sqlx::query(
            r#"
            UPDATE events
            SET status = 'published'
            WHERE id = ? AND event_type = 'organizer' AND status = 'pending'
            "#,
        )
        .bind(event_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFoundOrAlreadyProcessed { event_id });
        }

        info!(event_id, admin_id = actor.id, "Organizer event published");
        Ok(())
    }

    /// Queue notifications for a committed decision
    async fn notify(&self, event_id: i64, action: ModerationAction, reason: Option<String>) {
        let contact = match self.events.get_event_data(event_id).await {
            Ok(contact) => contact,
            Err(e) => {
                warn!(event_id, "Skipping notifications, event data unavailable: {}", e);
                return;
            }
        };

        self.fanout.enqueue(FanoutJob {
            contact,
            action,
            reason,
            event_url: self.config.event_url(event_id),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::Role,
        config::test_config,
        db::{self, test_pool},
        events::Event,
        notifications::fanout::Delivery,
        test_support::{self, RecordingChannels},
    };

    const ADMIN: Actor = Actor {
        id: 7,
        role: Role::Admin,
    };

    struct Harness {
        db: SqlitePool,
        service: ModerationService,
        recorder: RecordingChannels,
        event_id: i64,
        creator_id: i64,
    }

    async fn harness_with_pool(db: SqlitePool) -> Harness {
        let creator_id = test_support::insert_user(&db, "ayu@example.com", Some("tok-ayu")).await;
        test_support::insert_user_with_id(&db, 7, "admin7@example.com").await;
        test_support::insert_user_with_id(&db, 9, "admin9@example.com").await;
        let event_id =
            test_support::insert_pending_event_with_id(&db, 42, creator_id, "Night market").await;

        let recorder = RecordingChannels::new();
        let (fanout, _worker) = FanoutQueue::start(recorder.channels());
        let service = ModerationService::new(db.clone(), Arc::new(test_config()), fanout);

        Harness {
            db,
            service,
            recorder,
            event_id,
            creator_id,
        }
    }

    async fn harness() -> Harness {
        harness_with_pool(test_pool().await).await
    }

    impl Harness {
        async fn event(&self) -> Event {
            EventStore::new(self.db.clone())
                .get_event(self.event_id)
                .await
                .unwrap()
        }

        async fn log_count(&self) -> i64 {
            ModerationLog::new(self.db.clone())
                .count_for_event(self.event_id)
                .await
                .unwrap()
        }
    }

    fn reject(reason: &str) -> Decision {
        Decision::Reject {
            reason: Some(reason.to_string()),
        }
    }

    #[tokio::test]
    async fn test_approve_pending_event() {
        let h = harness().await;

        let outcome = h
            .service
            .transition(42, &ADMIN, Decision::Approve)
            .await
            .unwrap();

        assert_eq!(outcome.status, EventStatus::Approved);
        assert_eq!(outcome.log_entry.event_id, 42);
        assert_eq!(outcome.log_entry.admin_id, 7);
        assert_eq!(outcome.log_entry.action, ModerationAction::Approved);
        assert_eq!(outcome.log_entry.reason, None);

        let event = h.event().await;
        assert_eq!(event.status, EventStatus::Approved);
        assert!(event.rejection_reason.is_none());
        assert!(event.rejected_at.is_none());
        assert_eq!(h.log_count().await, 1);

        let calls = h.recorder.wait_for_calls(4).await;
        let mut channels: Vec<&str> = calls.iter().map(Delivery::channel).collect();
        channels.sort();
        assert_eq!(channels, vec!["broadcast", "email", "notification", "push"]);

        assert!(calls.iter().any(|c| matches!(
            c,
            Delivery::Email { to, template }
                if to == "ayu@example.com" && template.name() == "event_approved"
        )));
        assert!(calls.iter().any(|c| matches!(
            c,
            Delivery::SaveNotification { user_id, .. } if *user_id == h.creator_id
        )));
    }

    #[tokio::test]
    async fn test_reject_sets_reason_and_timestamp() {
        let h = harness().await;

        let outcome = h
            .service
            .transition(42, &ADMIN, reject("  Duplicate listing "))
            .await
            .unwrap();

        assert_eq!(outcome.status, EventStatus::Rejected);
        assert_eq!(outcome.log_entry.reason.as_deref(), Some("Duplicate listing"));

        let event = h.event().await;
        assert_eq!(event.status, EventStatus::Rejected);
        assert_eq!(event.rejection_reason.as_deref(), Some("Duplicate listing"));
        assert!(event.rejected_at.is_some());

        let calls = h.recorder.wait_for_calls(3).await;
        let mut channels: Vec<&str> = calls.iter().map(Delivery::channel).collect();
        channels.sort();
        assert_eq!(channels, vec!["email", "notification", "push"]);
        assert_eq!(h.recorder.settled_count().await, 3);
    }

    #[tokio::test]
    async fn test_reject_without_reason_changes_nothing() {
        let h = harness().await;

        for decision in [
            Decision::Reject { reason: None },
            reject(""),
            reject("   "),
        ] {
            let err = h.service.transition(42, &ADMIN, decision).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        let event = h.event().await;
        assert_eq!(event.status, EventStatus::Pending);
        assert!(event.rejection_reason.is_none());
        assert_eq!(h.log_count().await, 0);
        assert_eq!(h.recorder.settled_count().await, 0);
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let h = harness().await;
        let member = Actor {
            id: h.creator_id,
            role: Role::Member,
        };

        let err = h
            .service
            .transition(42, &member, Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = h
            .service
            .transition(42, &member, Decision::Reject { reason: None })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        assert_eq!(h.event().await.status, EventStatus::Pending);
        assert_eq!(h.log_count().await, 0);
    }

    #[tokio::test]
    async fn test_already_approved_event_cannot_be_rejected() {
        let h = harness().await;
        h.service
            .transition(42, &ADMIN, Decision::Approve)
            .await
            .unwrap();
        h.recorder.wait_for_calls(4).await;

        let admin9 = Actor {
            id: 9,
            role: Role::Admin,
        };
        let err = h
            .service
            .transition(42, &admin9, reject("Changed my mind"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::NotFoundOrAlreadyProcessed { event_id: 42 }
        ));

        let event = h.event().await;
        assert_eq!(event.status, EventStatus::Approved);
        assert!(event.rejection_reason.is_none());
        assert_eq!(h.log_count().await, 1);
        assert_eq!(h.recorder.settled_count().await, 4);
    }

    #[tokio::test]
    async fn test_rejected_event_is_terminal() {
        let h = harness().await;
        h.service
            .transition(42, &ADMIN, reject("Spam"))
            .await
            .unwrap();

        for decision in [Decision::Approve, reject("Still spam")] {
            let err = h.service.transition(42, &ADMIN, decision).await.unwrap_err();
            assert!(matches!(err, AppError::NotFoundOrAlreadyProcessed { .. }));
        }

        let event = h.event().await;
        assert_eq!(event.status, EventStatus::Rejected);
        assert_eq!(event.rejection_reason.as_deref(), Some("Spam"));
        assert_eq!(h.log_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_event_is_ambiguous_failure() {
        let h = harness().await;

        let err = h
            .service
            .transition(4242, &ADMIN, Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::NotFoundOrAlreadyProcessed { event_id: 4242 }
        ));
        assert_eq!(h.recorder.settled_count().await, 0);
    }

    #[tokio::test]
    async fn test_approve_clears_stale_rejection_fields() {
        let h = harness().await;
        sqlx::query(
            "UPDATE events SET rejection_reason = 'old', rejected_at = '2024-01-01T00:00:00.000000Z' WHERE id = ?",
        )
        .bind(h.event_id)
        .execute(&h.db)
        .await
        .unwrap();

        h.service
            .transition(42, &ADMIN, Decision::Approve)
            .await
            .unwrap();

        let event = h.event().await;
        assert!(event.rejection_reason.is_none());
        assert!(event.rejected_at.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_decisions_have_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::create_pool(
            &dir.path().join("race.sqlite"),
            db::DatabaseOptions {
                max_connections: 4,
                enable_wal: true,
            },
        )
        .await
        .unwrap();
        db::run_migrations(&pool).await.unwrap();
        let h = harness_with_pool(pool).await;

        let approve = {
            let service = h.service.clone();
            tokio::spawn(async move { service.transition(42, &ADMIN, Decision::Approve).await })
        };
        let rejecting = {
            let service = h.service.clone();
            let admin9 = Actor {
                id: 9,
                role: Role::Admin,
            };
            tokio::spawn(async move { service.transition(42, &admin9, reject("Too late")).await })
        };

        let results = [approve.await.unwrap(), rejecting.await.unwrap()];
        let winners: Vec<&ModerationOutcome> =
            results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(AppError::NotFoundOrAlreadyProcessed { event_id: 42 })
        )));

        assert_eq!(h.event().await.status, winners[0].status);
        assert_eq!(h.log_count().await, 1);
    }

    #[tokio::test]
    async fn test_publish_organizer_event() {
        let h = harness().await;
        let organizer_event = test_support::insert_pending_organizer_event(&h.db, h.creator_id).await;

        h.service
            .publish_organizer_event(organizer_event, &ADMIN)
            .await
            .unwrap();

        let event = EventStore::new(h.db.clone())
            .get_event(organizer_event)
            .await
            .unwrap();
        assert_eq!(event.status, EventStatus::Published);

        // Not part of the moderation log, no notifications
        assert_eq!(
            ModerationLog::new(h.db.clone())
                .count_for_event(organizer_event)
                .await
                .unwrap(),
            0
        );
        assert_eq!(h.recorder.settled_count().await, 0);

        assert!(matches!(
            h.service.publish_organizer_event(organizer_event, &ADMIN).await,
            Err(AppError::NotFoundOrAlreadyProcessed { .. })
        ));
    }

    #[tokio::test]
    async fn test_publish_rejects_standard_events_and_members() {
        let h = harness().await;

        assert!(matches!(
            h.service.publish_organizer_event(42, &ADMIN).await,
            Err(AppError::NotFoundOrAlreadyProcessed { event_id: 42 })
        ));

        let member = Actor {
            id: h.creator_id,
            role: Role::Member,
        };
        assert!(matches!(
            h.service.publish_organizer_event(42, &member).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(h.event().await.status, EventStatus::Pending);
    }

    #[tokio::test]
    async fn test_outcome_log_entry_matches_stored_row() {
        let h = harness().await;

        let outcome = h
            .service
            .transition(42, &ADMIN, reject("Wrong city"))
            .await
            .unwrap();

        let stored = ModerationLog::new(h.db.clone())
            .list_for_event(42)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].entry, outcome.log_entry);
        assert_eq!(
            h.event().await.rejected_at.map(|t| t.timestamp_subsec_nanos() % 1_000),
            Some(0)
        );
    }

    #[tokio::test]
    async fn test_admin_without_account_row_can_moderate() {
        let h = harness().await;
        let external_admin = Actor {
            id: 777,
            role: Role::Admin,
        };

        let outcome = h
            .service
            .transition(42, &external_admin, Decision::Approve)
            .await
            .unwrap();
        assert_eq!(outcome.log_entry.admin_id, 777);
        assert_eq!(h.event().await.status, EventStatus::Approved);

        let stored = ModerationLog::new(h.db.clone())
            .list_for_event(42)
            .await
            .unwrap();
        assert_eq!(stored[0].entry.admin_id, 777);
        assert_eq!(stored[0].admin_email, None);
    }
}
