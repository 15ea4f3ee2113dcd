/// Registration and login endpoints
use super::extract::AppJson;
use crate::{
    account::{NewAccount, User},
    auth::issue_access_token,
    context::AppContext,
    error::AppResult,
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    message: &'static str,
    user: User,
}

/// Create an account
async fn register(
    State(ctx): State<AppContext>,
    AppJson(input): AppJson<NewAccount>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let user = ctx.accounts.register(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "user registered successfully",
            user,
        }),
    ))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    message: &'static str,
    token: String,
}

/// Exchange credentials for an access token
async fn login(
    State(ctx): State<AppContext>,
    AppJson(req): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (user, role) = ctx.accounts.authenticate(&req.email, &req.password).await?;

    let token = issue_access_token(
        user.id,
        &user.email,
        role,
        &ctx.config.authentication.jwt_secret,
        ctx.config.authentication.token_ttl_secs,
    )?;

    tracing::info!(user_id = user.id, role = role.as_str(), "Login");
    Ok(Json(LoginResponse {
        message: "login success",
        token,
    }))
}
