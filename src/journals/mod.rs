/// Travel journals and their social features
///
/// A journal belongs to its author and may be tied to an organizer event.
/// Private journals are visible to their author only; public journals must
/// carry a location and appear on the map and in nearby searches.

pub mod bookmarks;
pub mod comments;
pub mod images;
pub mod likes;
pub mod store;

pub use bookmarks::BookmarkStore;
pub use comments::{Comment, CommentStore};
pub use images::{ImageStore, JournalImage};
pub use likes::LikeStore;
pub use store::JournalStore;

use crate::{
    error::{AppError, AppResult},
    events::{require_non_empty, validate_coordinates},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Characters of content shown on map pins
pub const PREVIEW_CHARS: usize = 80;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Journal record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub id: i64,
    pub user_id: i64,
    pub event_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

impl Journal {
    pub fn is_visible_to(&self, viewer: Option<i64>) -> bool {
        self.is_public || viewer == Some(self.user_id)
    }
}

/// Input for a new journal
#[derive(Debug, Clone, Deserialize)]
pub struct NewJournal {
    pub event_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub is_public: bool,
}

impl NewJournal {
    pub fn validate(&self) -> AppResult<()> {
        require_non_empty("title", &self.title)?;

        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => validate_coordinates(latitude, longitude)?,
            (None, None) => {
                if self.is_public {
                    return Err(AppError::Validation(
                        "public journal must have location".to_string(),
                    ));
                }
            }
            _ => {
                return Err(AppError::Validation(
                    "latitude and longitude must be given together".to_string(),
                ))
            }
        }

        Ok(())
    }
}

/// Public journal pinned on the map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapJournal {
    pub id: i64,
    pub title: String,
    pub preview: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// User shown next to journals and comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub email: String,
}

/// Journal with everything its detail page shows
#[derive(Debug, Clone, Serialize)]
pub struct JournalDetail {
    #[serde(flatten)]
    pub journal: Journal,
    pub author: Author,
    /// Whether the viewer bookmarked it; false for anonymous viewers
    pub bookmarked: bool,
    pub total_likes: i64,
    pub images: Vec<String>,
    pub comments: Vec<Comment>,
}

/// Page request, clamped to sane bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 50;

    /// Pages start at 1; a limit outside `1..=MAX_LIMIT` falls back to the default
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = match limit {
            Some(limit) if (1..=Self::MAX_LIMIT).contains(&limit) => limit,
            _ => Self::DEFAULT_LIMIT,
        };
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: (total + request.limit - 1) / request.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Shorten content for a map pin, on a character boundary
pub fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((end, _)) => format!("{}...", &content[..end]),
        None => content.to_string(),
    }
}

/// Great-circle distance in kilometres
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}
