/// API routes and handlers
pub mod admin;
pub mod auth;
pub mod bookmarks;
pub mod events;
pub mod extract;
pub mod journals;
pub mod middleware;
pub mod notifications;
pub mod organizer;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(events::routes())
        .merge(journals::routes())
        .merge(bookmarks::routes())
        .merge(organizer::routes())
        .merge(notifications::routes())
        .merge(admin::routes())
}
