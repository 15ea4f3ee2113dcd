/// Admin moderation endpoints
use super::extract::AppPath;
use crate::{
    admin::{Decision, ModerationLogView, ModerationOutcome},
    auth::AdminAuthContext,
    context::AppContext,
    error::{AppError, AppResult},
    events::PendingEvent,
};
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build admin API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        // Moderation queue and history
        .route("/api/admin/events/pending", get(get_pending_events))
        .route("/api/admin/events/:id/logs", get(get_moderation_logs))
        // Moderation decisions
        .route("/api/admin/events/:id/approve", post(approve_event))
        .route("/api/admin/events/:id/reject", post(reject_event))
        // Organizer events
        .route(
            "/api/admin/organizer/events/:id/publish",
            post(publish_organizer_event),
        )
}

// ============================================================================
// Moderation Queue
// ============================================================================

#[derive(Debug, Serialize)]
struct PendingEventsResponse {
    data: Vec<PendingEvent>,
}

/// List events awaiting moderation, oldest first
async fn get_pending_events(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
) -> AppResult<Json<PendingEventsResponse>> {
    let data = ctx.events.list_pending().await?;
    Ok(Json(PendingEventsResponse { data }))
}

#[derive(Debug, Serialize)]
struct ModerationLogsResponse {
    logs: Vec<ModerationLogView>,
}

/// Moderation history of one event
async fn get_moderation_logs(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    AppPath(event_id): AppPath<i64>,
) -> AppResult<Json<ModerationLogsResponse>> {
    let logs = ctx.moderation_log.list_for_event(event_id).await?;
    Ok(Json(ModerationLogsResponse { logs }))
}

// ============================================================================
// Moderation Decisions
// ============================================================================

// The extractor rejects non-admins before the body is read; the moderation
// service enforces the same precondition for its other callers.

#[derive(Debug, Serialize)]
struct ModerationResponse {
    message: &'static str,
    #[serde(flatten)]
    outcome: ModerationOutcome,
}

/// Approve a pending event
async fn approve_event(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    AppPath(event_id): AppPath<i64>,
) -> AppResult<Json<ModerationResponse>> {
    let outcome = ctx
        .moderation
        .transition(event_id, &auth.actor, Decision::Approve)
        .await?;

    Ok(Json(ModerationResponse {
        message: "event approved",
        outcome,
    }))
}

#[derive(Debug, Default, Deserialize)]
struct RejectEventRequest {
    #[serde(default)]
    reason: Option<String>,
}

/// Reject a pending event. The body is `{"reason": "..."}`.
async fn reject_event(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    AppPath(event_id): AppPath<i64>,
    body: Bytes,
) -> AppResult<Json<ModerationResponse>> {
    // An empty body is a missing reason, which the service reports
    let req: RejectEventRequest = if body.is_empty() {
        RejectEventRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?
    };

    let outcome = ctx
        .moderation
        .transition(
            event_id,
            &auth.actor,
            Decision::Reject { reason: req.reason },
        )
        .await?;

    Ok(Json(ModerationResponse {
        message: "event rejected",
        outcome,
    }))
}

/// Publish a pending organizer event
async fn publish_organizer_event(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    AppPath(event_id): AppPath<i64>,
) -> AppResult<Json<serde_json::Value>> {
    ctx.moderation
        .publish_organizer_event(event_id, &auth.actor)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "event published",
        "event_id": event_id,
    })))
}
