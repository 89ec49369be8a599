/// Configuration management for the job board
use crate::error::{BoardError, BoardResult};
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
    pub rate_limit: RateLimitConfig,
    pub background: BackgroundConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Base URL used for links in notification mails
    pub public_url: String,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub upload_directory: PathBuf,
    pub resume_upload_limit: usize,
    pub photo_upload_limit: usize,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    /// Emails that are registered with the admin role (comma-separated in env)
    pub admin_emails: Vec<String>,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub anonymous_rps: u32,
    pub authenticated_rps: u32,
    pub staff_rps: u32,
    pub burst_size: u32,
}

/// Background task intervals, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundConfig {
    pub enabled: bool,
    pub ban_expiry_interval: u64,
    /// How often the daily and weekly digest loops look for due alerts
    pub digest_check_interval: u64,
    pub health_check_interval: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl ServerConfig {
    /// Local development defaults; `from_env` overlays environment variables on top
    pub fn development() -> Self {
        let data_directory = PathBuf::from("./data");
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 8080,
                public_url: "http://localhost:8080".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            storage: StorageConfig {
                database: data_directory.join("jobboard.sqlite"),
                upload_directory: data_directory.join("uploads"),
                data_directory,
                resume_upload_limit: 5 * 1024 * 1024,
                photo_upload_limit: 2 * 1024 * 1024,
            },
            authentication: AuthConfig {
                jwt_secret: "development-secret-change-me-0123456789".to_string(),
                token_ttl_minutes: 60 * 12,
                admin_emails: Vec::new(),
            },
            email: None,
            rate_limit: RateLimitConfig {
                enabled: true,
                anonymous_rps: 10,
                authenticated_rps: 50,
                staff_rps: 200,
                burst_size: 50,
            },
            background: BackgroundConfig {
                enabled: true,
                ban_expiry_interval: 15 * 60,
                digest_check_interval: 60 * 60,
                health_check_interval: 5 * 60,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> BoardResult<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::development();

        if let Ok(hostname) = env::var("BOARD_HOSTNAME") {
            config.service.hostname = hostname;
        }
        config.service.port = env::var("BOARD_PORT")
            .unwrap_or_else(|_| config.service.port.to_string())
            .parse()
            .map_err(|_| BoardError::Validation("Invalid port number".to_string()))?;
        config.service.public_url = env::var("BOARD_PUBLIC_URL").unwrap_or_else(|_| {
            format!("http://{}:{}", config.service.hostname, config.service.port)
        });

        if let Ok(dir) = env::var("BOARD_DATA_DIRECTORY") {
            let data_directory = PathBuf::from(dir);
            config.storage.database = data_directory.join("jobboard.sqlite");
            config.storage.upload_directory = data_directory.join("uploads");
            config.storage.data_directory = data_directory;
        }
        if let Ok(path) = env::var("BOARD_DATABASE_PATH") {
            config.storage.database = PathBuf::from(path);
        }
        if let Ok(path) = env::var("BOARD_UPLOAD_DIRECTORY") {
            config.storage.upload_directory = PathBuf::from(path);
        }
        config.storage.resume_upload_limit = env::var("BOARD_RESUME_UPLOAD_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.storage.resume_upload_limit);
        config.storage.photo_upload_limit = env::var("BOARD_PHOTO_UPLOAD_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.storage.photo_upload_limit);

        config.authentication.jwt_secret = env::var("BOARD_JWT_SECRET")
            .map_err(|_| BoardError::Validation("JWT secret required".to_string()))?;
        config.authentication.token_ttl_minutes = env::var("BOARD_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.authentication.token_ttl_minutes);

        // Parse admin emails from comma-separated list
        config.authentication.admin_emails = env::var("BOARD_ADMIN_EMAILS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        config.email = if let Ok(smtp_url) = env::var("BOARD_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("BOARD_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", config.service.hostname)),
            })
        } else {
            None
        };

        config.rate_limit.enabled = env::var("BOARD_RATE_LIMITS_ENABLED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);
        config.rate_limit.anonymous_rps = env::var("BOARD_RATE_LIMIT_ANONYMOUS_RPS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.rate_limit.anonymous_rps);
        config.rate_limit.authenticated_rps = env::var("BOARD_RATE_LIMIT_AUTHENTICATED_RPS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.rate_limit.authenticated_rps);

        config.background.enabled = env::var("BOARD_BACKGROUND_JOBS_ENABLED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);
        config.background.digest_check_interval = env::var("BOARD_DIGEST_CHECK_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.background.digest_check_interval);

        config.logging.level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        config.logging.json = env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> BoardResult<()> {
        if self.service.hostname.is_empty() {
            return Err(BoardError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(BoardError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.token_ttl_minutes <= 0 {
            return Err(BoardError::Validation(
                "Token TTL must be positive".to_string(),
            ));
        }

        if self.background.ban_expiry_interval == 0
            || self.background.digest_check_interval == 0
            || self.background.health_check_interval == 0
        {
            return Err(BoardError::Validation(
                "Background intervals must be positive".to_string(),
            ));
        }

        if let Some(email) = &self.email {
            if !email.smtp_url.starts_with("smtp://") {
                return Err(BoardError::Validation(
                    "SMTP URL must start with smtp://".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.authentication
            .admin_emails
            .iter()
            .any(|e| e.eq_ignore_ascii_case(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_config_is_valid() {
        assert!(ServerConfig::development().validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut config = ServerConfig::development();
        config.authentication.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_admin_email_match_is_case_insensitive() {
        let mut config = ServerConfig::development();
        config.authentication.admin_emails = vec!["root@example.com".to_string()];
        assert!(config.is_admin_email("Root@Example.com"));
        assert!(!config.is_admin_email("someone@example.com"));
    }
}
