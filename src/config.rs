/// Configuration management for the Design Commons server
use crate::backup::BackupConfig;
use crate::error::{ApiError, ApiResult};
use rand::{distributions::Alphanumeric, Rng};
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
    pub invites: InviteConfig,
    pub rate_limit: RateLimitConfig,
    pub backup: BackupConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Externally visible base URL, used in invitation links
    pub public_url: Option<String>,
    /// Prebuilt frontend served for any non-API path
    pub static_dir: Option<PathBuf>,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON document per resource type
    pub data_directory: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Invitation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteConfig {
    /// Registration needs an invitation token (the very first account is exempt)
    pub required: bool,
    pub expiry_days: i64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub auth_requests_per_minute: u32,
    pub burst_size: u32,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("COMMONS_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("COMMONS_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("COMMONS_PUBLIC_URL").ok();
        let static_dir = env::var("COMMONS_STATIC_DIR").ok().map(PathBuf::from);
        let version =
            env::var("COMMONS_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("COMMONS_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();

        let jwt_secret = env::var("COMMONS_JWT_SECRET")
            .map_err(|_| ApiError::Validation("JWT secret required".to_string()))?;
        let session_ttl_hours = env_or("COMMONS_SESSION_TTL_HOURS", 24 * 7);

        let email = if let Ok(smtp_url) = env::var("COMMONS_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("COMMONS_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let log_format = match env::var("COMMONS_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                static_dir,
                version,
            },
            storage: StorageConfig { data_directory },
            authentication: AuthConfig {
                jwt_secret,
                session_ttl_hours,
            },
            email,
            invites: InviteConfig {
                required: env_or("COMMONS_INVITE_REQUIRED", false),
                expiry_days: env_or("COMMONS_INVITE_EXPIRY_DAYS", 7),
            },
            rate_limit: RateLimitConfig {
                enabled: env_or("COMMONS_RATE_LIMITS_ENABLED", true),
                requests_per_second: env_or("COMMONS_RATE_LIMIT_REQUESTS_PER_SECOND", 100),
                auth_requests_per_minute: env_or("COMMONS_RATE_LIMIT_AUTH_PER_MINUTE", 30),
                burst_size: env_or("COMMONS_RATE_LIMIT_BURST", 50),
            },
            backup: BackupConfig::from_env(),
            logging: LoggingConfig {
                level: env::var("COMMONS_LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),
                format: log_format,
            },
        })
    }

    /// Configuration for local runs and tests: random signing secret, no
    /// rate limits, no mail, no backups.
    pub fn ephemeral(data_directory: impl Into<PathBuf>) -> Self {
        let jwt_secret: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(48)
            .map(char::from)
            .collect();

        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 0,
                public_url: None,
                static_dir: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            storage: StorageConfig {
                data_directory: data_directory.into(),
            },
            authentication: AuthConfig {
                jwt_secret,
                session_ttl_hours: 24 * 7,
            },
            email: None,
            invites: InviteConfig {
                required: false,
                expiry_days: 7,
            },
            rate_limit: RateLimitConfig {
                enabled: false,
                requests_per_second: 100,
                auth_requests_per_minute: 30,
                burst_size: 50,
            },
            backup: BackupConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ApiError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.session_ttl_hours <= 0 {
            return Err(ApiError::Validation(
                "Session lifetime must be positive".to_string(),
            ));
        }

        if self.invites.expiry_days <= 0 {
            return Err(ApiError::Validation(
                "Invitation expiry must be at least one day".to_string(),
            ));
        }

        if self.backup.enabled && self.backup.interval_hours == 0 {
            return Err(ApiError::Validation(
                "Backup interval must be at least one hour".to_string(),
            ));
        }

        Ok(())
    }
}
