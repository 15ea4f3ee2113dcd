/// User accounts
///
/// Users register with an email and password and log in for an access
/// token. Rows created by another token issuer have no password hash and
/// cannot log in here. Accounts also carry the push device token.

pub mod password;

use crate::{
    auth::Role,
    db::{self, format_timestamp, parse_timestamp},
    error::{AppError, AppResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

/// Account record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub fcm_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Registration input
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub const MIN_PASSWORD_LEN: usize = 8;

impl NewAccount {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("invalid email".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

/// Account store
#[derive(Clone)]
pub struct AccountStore {
    db: SqlitePool,
}

impl AccountStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a member account with a hashed password
    pub async fn register(&self, input: NewAccount) -> AppResult<User> {
        input.validate()?;
        let name = input.name.trim().to_string();
        let email = input.email.trim().to_lowercase();

        if self.email_exists(&email).await? {
            return Err(AppError::Conflict("email already exists".to_string()));
        }

        let password_hash = password::hash_password(&input.password).await?;

        let now = db::now();
        let result = sqlx::query(
            "INSERT INTO users (name, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&name)
        .bind(&email)
        .bind(&password_hash)
        .bind(Role::Member.as_str())
        .bind(format_timestamp(&now))
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("email already exists".to_string())
            }
            e => AppError::Database(e),
        })?;

        let id = result.last_insert_rowid();
        tracing::info!(user_id = id, "Registered account");

        Ok(User {
            id,
            name,
            email,
            fcm_token: None,
            created_at: now,
        })
    }

    /// Check an email and password. Unknown emails and wrong passwords get
    /// the same error.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(User, Role)> {
        let invalid = || AppError::Authentication("invalid email or password".to_string());

        let row = sqlx::query(
            "SELECT id, name, email, fcm_token, role, password_hash, created_at \
             FROM users WHERE email = ?",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(invalid)?;

        let stored_hash: Option<String> = row.get("password_hash");
        let stored_hash = stored_hash.ok_or_else(invalid)?;
        if !password::verify_password(password, &stored_hash).await? {
            tracing::debug!(user_id = row.get::<i64, _>("id"), "Password mismatch");
            return Err(invalid());
        }

        let role: String = row.get("role");
        Ok((parse_user(&row)?, Role::from_claim(Some(&role))))
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = ?)")
            .bind(email)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: i64) -> AppResult<User> {
        let row = sqlx::query(
            "SELECT id, name, email, fcm_token, created_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        parse_user(&row)
    }

    /// Register the device token push notifications go to
    pub async fn save_push_token(&self, user_id: i64, token: &str) -> AppResult<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Validation("token is required".to_string()));
        }

        let result = sqlx::query("UPDATE users SET fcm_token = ? WHERE id = ?")
            .bind(token)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        tracing::debug!(user_id, "Saved push token");
        Ok(())
    }
}

fn parse_user(row: &SqliteRow) -> AppResult<User> {
    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        fcm_token: row.get("fcm_token"),
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}
