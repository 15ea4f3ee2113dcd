/// Journal persistence
use super::{
    distance_km, preview, Author, CommentStore, ImageStore, Journal, JournalDetail, MapJournal,
    NewJournal, Page, PageRequest, Pagination,
};
use crate::{
    db::{self, format_timestamp, parse_timestamp},
    error::{AppError, AppResult},
    events::{validate_coordinates, EventKind},
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

const JOURNAL_COLUMNS: &str = r#"
    j.id, j.user_id, j.event_id, j.title, j.content,
    j.latitude, j.longitude, j.is_public, j.created_at
"#;

/// Journal store
#[derive(Clone)]
pub struct JournalStore {
    db: SqlitePool,
}

impl JournalStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a journal for `user_id`
    pub async fn create(&self, user_id: i64, input: NewJournal) -> AppResult<Journal> {
        input.validate()?;

        // Journals attach to organizer events only
        if let Some(event_id) = input.event_id {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM events WHERE id = ? AND event_type = ?)",
            )
            .bind(event_id)
            .bind(EventKind::Organizer.as_str())
            .fetch_one(&self.db)
            .await?;

            if !exists {
                return Err(AppError::Validation("invalid event_id".to_string()));
            }
        }

        let now = db::now();
        let result = sqlx::query(
            r#"
            INSERT INTO journals
            (user_id, event_id, title, content, latitude, longitude, is_public, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(input.event_id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.is_public)
        .bind(format_timestamp(&now))
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!(journal_id = id, user_id, public = input.is_public, "Created journal");

        Ok(Journal {
            id,
            user_id,
            event_id: input.event_id,
            title: input.title,
            content: input.content,
            latitude: input.latitude,
            longitude: input.longitude,
            is_public: input.is_public,
            created_at: now,
        })
    }

    /// Get a journal regardless of visibility
    pub async fn get(&self, journal_id: i64) -> AppResult<Journal> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM journals j WHERE j.id = ?",
            JOURNAL_COLUMNS
        ))
        .bind(journal_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("journal not found".to_string()))?;

        parse_journal(&row)
    }

    /// Get a journal the viewer is allowed to see
    pub async fn get_visible(&self, journal_id: i64, viewer: Option<i64>) -> AppResult<Journal> {
        let journal = self.get(journal_id).await?;
        if !journal.is_visible_to(viewer) {
            return Err(AppError::Forbidden("this journal is private".to_string()));
        }
        Ok(journal)
    }

    /// The author's journals, newest first
    pub async fn list_by_user(&self, user_id: i64) -> AppResult<Vec<Journal>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM journals j WHERE j.user_id = ? ORDER BY j.created_at DESC, j.id DESC",
            JOURNAL_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(parse_journal).collect()
    }

    /// Public journals within `radius_km` of a point, newest first
    pub async fn list_public_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> AppResult<Vec<Journal>> {
        validate_coordinates(latitude, longitude)?;
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(AppError::Validation("radius must be positive".to_string()));
        }

        let journals = self.list_public_located().await?;
        Ok(journals
            .into_iter()
            .filter(|j| match (j.latitude, j.longitude) {
                (Some(lat), Some(lng)) => distance_km(latitude, longitude, lat, lng) <= radius_km,
                _ => false,
            })
            .collect())
    }

    /// Map pins for every public journal
    pub async fn list_map(&self) -> AppResult<Vec<MapJournal>> {
        let journals = self.list_public_located().await?;
        Ok(journals
            .into_iter()
            .filter_map(|j| {
                Some(MapJournal {
                    latitude: j.latitude?,
                    longitude: j.longitude?,
                    preview: preview(&j.content),
                    id: j.id,
                    title: j.title,
                })
            })
            .collect())
    }

    async fn list_public_located(&self) -> AppResult<Vec<Journal>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM journals j
            WHERE j.is_public = 1 AND j.latitude IS NOT NULL AND j.longitude IS NOT NULL
            ORDER BY j.created_at DESC, j.id DESC
            "#,
            JOURNAL_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(parse_journal).collect()
    }

    /// Public journals written about an event
    pub async fn list_public_for_event(
        &self,
        event_id: i64,
        request: PageRequest,
    ) -> AppResult<Page<Journal>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM journals WHERE event_id = ? AND is_public = 1",
        )
        .bind(event_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM journals j
            WHERE j.event_id = ? AND j.is_public = 1
            ORDER BY j.created_at DESC, j.id DESC
            LIMIT ? OFFSET ?
            "#,
            JOURNAL_COLUMNS
        ))
        .bind(event_id)
        .bind(request.limit)
        .bind(request.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(Page {
            data: rows.iter().map(parse_journal).collect::<AppResult<_>>()?,
            pagination: Pagination::new(request, total),
        })
    }

    /// Journal with author, viewer bookmark flag, likes, images and comments
    pub async fn detail(&self, journal_id: i64, viewer: Option<i64>) -> AppResult<JournalDetail> {
        let journal = self.get_visible(journal_id, viewer).await?;

        let author_email: String = sqlx::query_scalar("SELECT email FROM users WHERE id = ?")
            .bind(journal.user_id)
            .fetch_one(&self.db)
            .await?;

        let bookmarked: bool = match viewer {
            Some(user_id) => {
                sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM bookmarks WHERE user_id = ? AND journal_id = ?)",
                )
                .bind(user_id)
                .bind(journal_id)
                .fetch_one(&self.db)
                .await?
            }
            None => false,
        };

        let total_likes: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM journal_likes WHERE journal_id = ?")
                .bind(journal_id)
                .fetch_one(&self.db)
                .await?;

        let images = ImageStore::list_urls(&self.db, journal_id).await?;
        let comments = CommentStore::list_rows(&self.db, journal_id).await?;

        Ok(JournalDetail {
            author: Author {
                id: journal.user_id,
                email: author_email,
            },
            journal,
            bookmarked,
            total_likes,
            images,
            comments,
        })
    }
}

pub(crate) fn parse_journal(row: &SqliteRow) -> AppResult<Journal> {
    Ok(Journal {
        id: row.get("id"),
        user_id: row.get("user_id"),
        event_id: row.get("event_id"),
        title: row.get("title"),
        content: row.get("content"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        is_public: row.get("is_public"),
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::test_pool, test_support};

    fn journal(title: &str, location: Option<(f64, f64)>, is_public: bool) -> NewJournal {
        NewJournal {
            event_id: None,
            title: title.to_string(),
            content: format!("{} notes", title),
            latitude: location.map(|l| l.0),
            longitude: location.map(|l| l.1),
            is_public,
        }
    }

    const JAKARTA: (f64, f64) = (-6.2088, 106.8456);
    const BANDUNG: (f64, f64) = (-6.9175, 107.6191);

    #[tokio::test]
    async fn test_create_and_list_own_journals() {
        let db = test_pool().await;
        let user = test_support::insert_user(&db, "ayu@example.com", None).await;
        let store = JournalStore::new(db);

        let created = store.create(user, journal("Diary", None, false)).await.unwrap();
        store.create(user, journal("Trip", Some(JAKARTA), true)).await.unwrap();

        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched, created);

        let titles: Vec<String> = store
            .list_by_user(user)
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.title)
            .collect();
        assert_eq!(titles, vec!["Trip", "Diary"]);
    }

    #[tokio::test]
    async fn test_event_id_must_be_organizer_event() {
        let db = test_pool().await;
        let user = test_support::insert_user(&db, "ayu@example.com", None).await;
        let standard = test_support::insert_pending_event(&db, user, "Choir").await;
        let organizer = test_support::insert_pending_organizer_event(&db, user).await;
        let store = JournalStore::new(db);

        let mut input = journal("Recap", None, false);
        input.event_id = Some(standard);
        let err = store.create(user, input.clone()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "invalid event_id"));

        input.event_id = Some(organizer);
        assert_eq!(
            store.create(user, input).await.unwrap().event_id,
            Some(organizer)
        );
    }

    #[tokio::test]
    async fn test_private_journal_visible_to_author_only() {
        let db = test_pool().await;
        let author = test_support::insert_user(&db, "ayu@example.com", None).await;
        let other = test_support::insert_user(&db, "budi@example.com", None).await;
        let store = JournalStore::new(db);

        let private = store.create(author, journal("Secret", None, false)).await.unwrap();

        assert!(store.get_visible(private.id, Some(author)).await.is_ok());
        assert!(matches!(
            store.get_visible(private.id, Some(other)).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            store.get_visible(private.id, None).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            store.get_visible(private.id + 100, None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_nearby_and_map_only_show_public_located() {
        let db = test_pool().await;
        let user = test_support::insert_user(&db, "ayu@example.com", None).await;
        let store = JournalStore::new(db);

        store.create(user, journal("Monas", Some(JAKARTA), true)).await.unwrap();
        store.create(user, journal("Braga", Some(BANDUNG), true)).await.unwrap();
        store.create(user, journal("Hidden", Some(JAKARTA), false)).await.unwrap();
        store.create(user, journal("Nowhere", None, false)).await.unwrap();

        let near = store
            .list_public_nearby(JAKARTA.0, JAKARTA.1, 5.0)
            .await
            .unwrap();
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].title, "Monas");

        let wide = store
            .list_public_nearby(JAKARTA.0, JAKARTA.1, 200.0)
            .await
            .unwrap();
        assert_eq!(wide.len(), 2);

        assert!(store
            .list_public_nearby(JAKARTA.0, JAKARTA.1, 0.0)
            .await
            .is_err());

        let pins = store.list_map().await.unwrap();
        let titles: Vec<&str> = pins.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Braga", "Monas"]);
        assert_eq!(pins[1].preview, "Monas notes");
    }

    #[tokio::test]
    async fn test_event_journals_are_paginated() {
        let db = test_pool().await;
        let user = test_support::insert_user(&db, "ayu@example.com", None).await;
        let event = test_support::insert_pending_organizer_event(&db, user).await;
        let store = JournalStore::new(db);

        for i in 0..3 {
            let mut input = journal(&format!("Day {}", i), Some(JAKARTA), true);
            input.event_id = Some(event);
            store.create(user, input).await.unwrap();
        }
        let mut private = journal("Mine only", None, false);
        private.event_id = Some(event);
        store.create(user, private).await.unwrap();

        let page = store
            .list_public_for_event(event, PageRequest::new(Some(2), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].title, "Day 0");
        assert_eq!(
            page.pagination,
            Pagination {
                page: 2,
                limit: 2,
                total: 3,
                total_pages: 2
            }
        );
    }
}
