/// Community event endpoints
use super::extract::{AppJson, AppPath};
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::AppResult,
    events::{Event, NewEvent},
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

/// Build event routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/events", get(get_my_events).post(create_event))
        .route("/api/events/all", get(get_events))
        .route("/api/events/:id", get(get_event_detail))
}

#[derive(Debug, Serialize)]
struct EventsResponse {
    data: Vec<Event>,
}

/// Submit an event for moderation
async fn create_event(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    AppJson(input): AppJson<NewEvent>,
) -> AppResult<(StatusCode, Json<Event>)> {
    let event = ctx.events.create_event(auth.actor.id, input).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// The caller's own events with their moderation status
async fn get_my_events(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<EventsResponse>> {
    let data = ctx.events.list_by_creator(auth.actor.id).await?;
    Ok(Json(EventsResponse { data }))
}

/// Approved events
async fn get_events(State(ctx): State<AppContext>) -> AppResult<Json<EventsResponse>> {
    let data = ctx.events.list_approved().await?;
    Ok(Json(EventsResponse { data }))
}

/// Approved event detail
async fn get_event_detail(
    State(ctx): State<AppContext>,
    AppPath(event_id): AppPath<i64>,
) -> AppResult<Json<Event>> {
    Ok(Json(ctx.events.get_approved_event(event_id).await?))
}
