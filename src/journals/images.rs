/// Journal image uploads
use super::JournalStore;
use crate::{
    db::{self, format_timestamp, parse_timestamp},
    error::{AppError, AppResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

/// Largest accepted upload
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Public URL prefix the upload directory is served under
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Stored image record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalImage {
    pub id: i64,
    pub journal_id: i64,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Lowercased extension of an allowed image filename
pub fn image_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Some(ext)
    } else {
        None
    }
}

/// Image store. Files live under `<upload_dir>/journals`.
#[derive(Clone)]
pub struct ImageStore {
    db: SqlitePool,
    journals: JournalStore,
    upload_dir: PathBuf,
}

impl ImageStore {
    pub fn new(db: SqlitePool, upload_dir: PathBuf) -> Self {
        Self {
            journals: JournalStore::new(db.clone()),
            db,
            upload_dir,
        }
    }

    /// Attach an image to a journal. Only the journal's author may upload.
    pub async fn save(
        &self,
        journal_id: i64,
        user_id: i64,
        filename: &str,
        bytes: &[u8],
    ) -> AppResult<JournalImage> {
        let journal = self.journals.get(journal_id).await?;
        if journal.user_id != user_id {
            return Err(AppError::Forbidden("not allowed".to_string()));
        }

        let ext = image_extension(filename)
            .ok_or_else(|| AppError::Validation("only image files are allowed".to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::Validation("image required".to_string()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::Validation("image too large".to_string()));
        }

        let now = db::now();
        let stored_name = format!("journal_{}_{}.{}", journal_id, now.timestamp_micros(), ext);
        let dir = self.upload_dir.join("journals");
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(&stored_name);
        tokio::fs::write(&path, bytes).await?;

        let image_url = format!("{}/journals/{}", UPLOADS_URL_PREFIX, stored_name);
        let inserted = sqlx::query(
            "INSERT INTO journal_images (journal_id, image_url, created_at) VALUES (?, ?, ?)",
        )
        .bind(journal_id)
        .bind(&image_url)
        .bind(format_timestamp(&now))
        .execute(&self.db)
        .await;

        let result = match inserted {
            Ok(result) => result,
            Err(e) => {
                // Don't leave an orphaned file behind
                if let Err(io) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), "Failed to remove upload: {}", io);
                }
                return Err(e.into());
            }
        };

        tracing::info!(journal_id, user_id, bytes = bytes.len(), "Stored journal image");

        Ok(JournalImage {
            id: result.last_insert_rowid(),
            journal_id,
            image_url,
            created_at: now,
        })
    }

    /// Images of a journal the viewer can see, oldest first
    pub async fn list(&self, journal_id: i64, viewer: Option<i64>) -> AppResult<Vec<JournalImage>> {
        self.journals.get_visible(journal_id, viewer).await?;

        let rows = sqlx::query(
            "SELECT id, journal_id, image_url, created_at FROM journal_images \
             WHERE journal_id = ? ORDER BY id ASC",
        )
        .bind(journal_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(JournalImage {
                    id: row.get("id"),
                    journal_id: row.get("journal_id"),
                    image_url: row.get("image_url"),
                    created_at: parse_timestamp(row.get("created_at"))?,
                })
            })
            .collect()
    }

    pub(crate) async fn list_urls(db: &SqlitePool, journal_id: i64) -> AppResult<Vec<String>> {
        let urls = sqlx::query_scalar(
            "SELECT image_url FROM journal_images WHERE journal_id = ? ORDER BY id ASC",
        )
        .bind(journal_id)
        .fetch_all(db)
        .await?;
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::test_pool, test_support};

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("beach.JPG").as_deref(), Some("jpg"));
        assert_eq!(image_extension("a.b.webp").as_deref(), Some("webp"));
        assert_eq!(image_extension("notes.txt"), None);
        assert_eq!(image_extension("noext"), None);
    }

    #[tokio::test]
    async fn test_author_uploads_image() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_pool().await;
        let author = test_support::insert_user(&db, "ayu@example.com", None).await;
        let journal = test_support::insert_journal(&db, author, false).await;
        let store = ImageStore::new(db.clone(), dir.path().to_path_buf());

        let image = store.save(journal, author, "sunrise.png", b"\x89PNG").await.unwrap();
        assert!(image.image_url.starts_with("/uploads/journals/journal_"));
        assert!(image.image_url.ends_with(".png"));

        let file_name = image.image_url.rsplit('/').next().unwrap();
        let on_disk = std::fs::read(dir.path().join("journals").join(file_name)).unwrap();
        assert_eq!(on_disk, b"\x89PNG");

        let listed = store.list(journal, Some(author)).await.unwrap();
        assert_eq!(listed, vec![image.clone()]);
        assert_eq!(
            ImageStore::list_urls(&db, journal).await.unwrap(),
            vec![image.image_url]
        );
    }

    #[tokio::test]
    async fn test_upload_rules() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_pool().await;
        let author = test_support::insert_user(&db, "ayu@example.com", None).await;
        let other = test_support::insert_user(&db, "budi@example.com", None).await;
        let journal = test_support::insert_journal(&db, author, true).await;
        let store = ImageStore::new(db, dir.path().to_path_buf());

        assert!(matches!(
            store.save(journal, other, "a.png", b"x").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            store.save(journal, author, "a.exe", b"x").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            store.save(journal, author, "a.png", b"").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            store.save(journal + 1, author, "a.png", b"x").await,
            Err(AppError::NotFound(_))
        ));
        assert!(!dir.path().join("journals").exists());
    }
}
