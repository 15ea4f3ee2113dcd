/// Configuration management for the Event Journal service
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub email: Option<EmailConfig>,
    pub push: PushConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Base URL of the web frontend, used to build links in emails
    pub frontend_url: String,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    /// Uploaded journal images, served under `/uploads`
    pub upload_dir: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for access tokens
    pub jwt_secret: String,
    /// Lifetime of tokens issued at login
    pub token_ttl_secs: i64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Push notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Firebase Cloud Messaging credentials; push is disabled when absent
    pub fcm: Option<FcmConfig>,
    /// Topic every client subscribes to for broadcasts
    pub broadcast_topic: String,
    pub timeout_secs: u64,
}

/// Firebase Cloud Messaging HTTP v1 settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmConfig {
    pub project_id: String,
    pub access_token: String,
    pub endpoint: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("EJ_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("EJ_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;
        let frontend_url = env::var("EJ_FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let version = env!("CARGO_PKG_VERSION").to_string();

        let database_path = env::var("EJ_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/event_journal.sqlite"));
        let max_connections = env::var("EJ_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let upload_dir = env::var("EJ_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        let jwt_secret = env::var("EJ_JWT_SECRET")
            .map_err(|_| AppError::Validation("JWT secret required".to_string()))?;
        let token_ttl_secs = env::var("EJ_TOKEN_TTL_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86400);

        let email = if let Ok(smtp_url) = env::var("EJ_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("EJ_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let fcm = if let Ok(project_id) = env::var("EJ_FCM_PROJECT_ID") {
            Some(FcmConfig {
                project_id,
                access_token: env::var("EJ_FCM_ACCESS_TOKEN").map_err(|_| {
                    AppError::Validation("FCM access token required".to_string())
                })?,
                endpoint: env::var("EJ_FCM_ENDPOINT")
                    .unwrap_or_else(|_| "https://fcm.googleapis.com".to_string())
                    .trim_end_matches('/')
                    .to_string(),
            })
        } else {
            None
        };
        let broadcast_topic =
            env::var("EJ_BROADCAST_TOPIC").unwrap_or_else(|_| "all-users".to_string());
        let push_timeout = env::var("EJ_PUSH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                frontend_url,
                version,
            },
            storage: StorageConfig {
                database_path,
                max_connections,
                upload_dir,
            },
            authentication: AuthConfig {
                jwt_secret,
                token_ttl_secs,
            },
            email,
            push: PushConfig {
                fcm,
                broadcast_topic,
                timeout_secs: push_timeout,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(AppError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.token_ttl_secs <= 0 {
            return Err(AppError::Validation(
                "Token lifetime must be positive".to_string(),
            ));
        }

        if self.push.broadcast_topic.is_empty() {
            return Err(AppError::Validation(
                "Broadcast topic cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Public URL of an event page on the frontend
    pub fn event_url(&self, event_id: i64) -> String {
        format!("{}/events/{}", self.service.frontend_url, event_id)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "127.0.0.1".to_string(),
            port: 0,
            frontend_url: "https://journal.test".to_string(),
            version: "test".to_string(),
        },
        storage: StorageConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            upload_dir: std::env::temp_dir().join("event-journal-test-uploads"),
        },
        authentication: AuthConfig {
            jwt_secret: "test-secret-that-is-at-least-32-characters".to_string(),
            token_ttl_secs: 3600,
        },
        email: None,
        push: PushConfig {
            fcm: None,
            broadcast_topic: "all-users".to_string(),
            timeout_secs: 5,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    }
}
