/// Bookmark endpoints
use super::extract::{AppJson, AppPath};
use crate::{auth::AuthContext, context::AppContext, error::AppResult, journals::Journal};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Build bookmark routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/bookmarks", get(get_my_bookmarks).post(bookmark_journal))
        .route("/api/bookmarks/:journal_id", delete(unbookmark_journal))
}

#[derive(Debug, Deserialize)]
struct BookmarkRequest {
    journal_id: i64,
}

#[derive(Debug, Serialize)]
struct BookmarksResponse {
    data: Vec<Journal>,
}

async fn bookmark_journal(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    AppJson(req): AppJson<BookmarkRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    ctx.bookmarks.add(auth.actor.id, req.journal_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "journal bookmarked" })),
    ))
}

async fn unbookmark_journal(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    AppPath(journal_id): AppPath<i64>,
) -> AppResult<Json<Value>> {
    ctx.bookmarks.remove(auth.actor.id, journal_id).await?;
    Ok(Json(json!({ "message": "bookmark removed" })))
}

async fn get_my_bookmarks(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<BookmarksResponse>> {
    let data = ctx.bookmarks.list_for_user(auth.actor.id).await?;
    Ok(Json(BookmarksResponse { data }))
}
