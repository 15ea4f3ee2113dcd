/// Organizer event endpoints
use super::extract::{AppJson, AppPath, AppQuery};
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::{AppError, AppResult},
    events::{Event, NewOrganizerEvent},
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Build organizer event routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/organizer/events",
            get(search_organizer_events).post(create_organizer_event),
        )
        .route("/api/organizer/events/:id", get(get_organizer_event_detail))
}

/// Submit an organizer event
async fn create_organizer_event(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    AppJson(input): AppJson<NewOrganizerEvent>,
) -> AppResult<(StatusCode, Json<Event>)> {
    let event = ctx
        .events
        .create_organizer_event(auth.actor.id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    data: Vec<Event>,
}

/// Published organizer events within a date window
async fn search_organizer_events(
    State(ctx): State<AppContext>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    if query.start_date > query.end_date {
        return Err(AppError::Validation(
            "start_date must not be after end_date".to_string(),
        ));
    }

    let data = ctx
        .events
        .search_published_organizer(query.start_date, query.end_date)
        .await?;
    Ok(Json(SearchResponse { data }))
}

/// Organizer event detail
async fn get_organizer_event_detail(
    State(ctx): State<AppContext>,
    AppPath(event_id): AppPath<i64>,
) -> AppResult<Json<Event>> {
    Ok(Json(ctx.events.get_organizer_event(event_id).await?))
}
