/// Notification history, push token and profile endpoints
use super::extract::{AppJson, AppQuery};
use crate::{
    account::User,
    auth::AuthContext,
    context::AppContext,
    error::AppResult,
    notifications::Notification,
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build notification routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/notifications", get(get_notifications))
        .route("/api/push/token", post(save_push_token))
}

#[derive(Debug, Serialize)]
struct MeResponse {
    user: User,
}

/// The caller's profile
async fn me(State(ctx): State<AppContext>, auth: AuthContext) -> AppResult<Json<MeResponse>> {
    let user = ctx.accounts.get_user(auth.actor.id).await?;
    Ok(Json(MeResponse { user }))
}

#[derive(Debug, Deserialize)]
struct NotificationsQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct NotificationsResponse {
    data: Vec<Notification>,
}

/// The caller's notification history, newest first
async fn get_notifications(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    AppQuery(query): AppQuery<NotificationsQuery>,
) -> AppResult<Json<NotificationsResponse>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let data = ctx
        .notifications
        .list_for_user(auth.actor.id, limit)
        .await?;
    Ok(Json(NotificationsResponse { data }))
}

#[derive(Debug, Deserialize)]
struct SaveTokenRequest {
    token: String,
}

/// Register the caller's push device token
async fn save_push_token(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    AppJson(req): AppJson<SaveTokenRequest>,
) -> AppResult<Json<serde_json::Value>> {
    ctx.accounts.save_push_token(auth.actor.id, &req.token).await?;
    Ok(Json(serde_json::json!({ "message": "Token saved" })))
}
