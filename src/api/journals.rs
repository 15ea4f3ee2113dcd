/// Journal, map, like, comment and image endpoints
use super::extract::{AppJson, AppPath, AppQuery};
use crate::{
    auth::{AuthContext, OptionalAuthContext},
    context::AppContext,
    error::{AppError, AppResult},
    journals::{
        images::MAX_IMAGE_BYTES, Comment, Journal, JournalDetail, JournalImage, MapJournal,
        NewJournal, Page, PageRequest,
    },
};
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const DEFAULT_RADIUS_KM: f64 = 5.0;

/// Build journal routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        // Journals
        .route("/api/journals", get(get_my_journals).post(create_journal))
        .route("/api/journals/public", get(get_public_journals))
        .route("/api/journals/:id", get(get_journal_detail))
        .route("/api/map/journals", get(get_map_journals))
        .route("/api/events/:id/journals", get(get_event_journals))
        // Likes
        .route("/api/journals/:id/like", post(toggle_like))
        .route("/api/journals/:id/likes", get(get_likes))
        // Images
        .route(
            "/api/journals/:id/images",
            get(get_images)
                .post(upload_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
        // Comments
        .route(
            "/api/journals/:id/comments",
            get(get_comments).post(create_comment),
        )
        .route("/api/comments/:id", delete(delete_comment))
}

#[derive(Debug, Serialize)]
struct DataResponse<T> {
    data: Vec<T>,
}

// ============================================================================
// Journals
// ============================================================================

async fn create_journal(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    AppJson(input): AppJson<NewJournal>,
) -> AppResult<(StatusCode, Json<Journal>)> {
    let journal = ctx.journals.create(auth.actor.id, input).await?;
    Ok((StatusCode::CREATED, Json(journal)))
}

/// The caller's journals, private ones included
async fn get_my_journals(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<DataResponse<Journal>>> {
    let data = ctx.journals.list_by_user(auth.actor.id).await?;
    Ok(Json(DataResponse { data }))
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    lat: f64,
    lng: f64,
    radius: Option<f64>,
}

/// Public journals near a point
async fn get_public_journals(
    State(ctx): State<AppContext>,
    AppQuery(query): AppQuery<NearbyQuery>,
) -> AppResult<Json<DataResponse<Journal>>> {
    let radius = query.radius.unwrap_or(DEFAULT_RADIUS_KM);
    let data = ctx
        .journals
        .list_public_nearby(query.lat, query.lng, radius)
        .await?;
    Ok(Json(DataResponse { data }))
}

async fn get_map_journals(
    State(ctx): State<AppContext>,
) -> AppResult<Json<DataResponse<MapJournal>>> {
    let data = ctx.journals.list_map().await?;
    Ok(Json(DataResponse { data }))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

async fn get_event_journals(
    State(ctx): State<AppContext>,
    AppPath(event_id): AppPath<i64>,
    AppQuery(query): AppQuery<PageQuery>,
) -> AppResult<Json<Page<Journal>>> {
    let request = PageRequest::new(query.page, query.limit);
    Ok(Json(
        ctx.journals.list_public_for_event(event_id, request).await?,
    ))
}

/// Journal detail; private journals only for their author
async fn get_journal_detail(
    State(ctx): State<AppContext>,
    auth: OptionalAuthContext,
    AppPath(journal_id): AppPath<i64>,
) -> AppResult<Json<JournalDetail>> {
    Ok(Json(ctx.journals.detail(journal_id, auth.user_id()).await?))
}

// ============================================================================
// Likes
// ============================================================================

async fn toggle_like(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    AppPath(journal_id): AppPath<i64>,
) -> AppResult<Json<Value>> {
    let liked = ctx.likes.toggle(journal_id, auth.actor.id).await?;
    Ok(Json(json!({ "liked": liked })))
}

async fn get_likes(
    State(ctx): State<AppContext>,
    auth: OptionalAuthContext,
    AppPath(journal_id): AppPath<i64>,
) -> AppResult<Json<Value>> {
    let total = ctx.likes.count(journal_id, auth.user_id()).await?;
    Ok(Json(json!({ "journal_id": journal_id, "total_likes": total })))
}

// ============================================================================
// Images
// ============================================================================

/// Multipart upload; the file goes in the `image` field
async fn upload_image(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    AppPath(journal_id): AppPath<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<JournalImage>)> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;

        let image = ctx
            .images
            .save(journal_id, auth.actor.id, &filename, &bytes)
            .await?;
        return Ok((StatusCode::CREATED, Json(image)));
    }

    Err(AppError::Validation("image is required".to_string()))
}

async fn get_images(
    State(ctx): State<AppContext>,
    auth: OptionalAuthContext,
    AppPath(journal_id): AppPath<i64>,
) -> AppResult<Json<DataResponse<JournalImage>>> {
    let data = ctx.images.list(journal_id, auth.user_id()).await?;
    Ok(Json(DataResponse { data }))
}

// ============================================================================
// Comments
// ============================================================================

#[derive(Debug, Deserialize)]
struct CommentRequest {
    content: String,
}

async fn create_comment(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    AppPath(journal_id): AppPath<i64>,
    AppJson(req): AppJson<CommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let comment = ctx
        .comments
        .create(journal_id, auth.actor.id, &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn get_comments(
    State(ctx): State<AppContext>,
    auth: OptionalAuthContext,
    AppPath(journal_id): AppPath<i64>,
) -> AppResult<Json<DataResponse<Comment>>> {
    let data = ctx
        .comments
        .list_for_journal(journal_id, auth.user_id())
        .await?;
    Ok(Json(DataResponse { data }))
}

async fn delete_comment(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    AppPath(comment_id): AppPath<i64>,
) -> AppResult<Json<Value>> {
    ctx.comments.delete(comment_id, auth.actor.id).await?;
    Ok(Json(json!({ "message": "comment deleted" })))
}
