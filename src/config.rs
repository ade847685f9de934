//! Configuration management for Planeo.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `DATA_DIR` - Optional. Directory for the SQLite database. Defaults to `./data`.
//! - `JWT_SECRET` - Required unless `DEV_MODE` is on. Signing key for access and refresh tokens.
//! - `ACCESS_TOKEN_TTL_MINUTES` - Optional. Access token lifetime. Defaults to `60`.
//! - `REFRESH_TOKEN_TTL_DAYS` - Optional. Refresh token lifetime. Defaults to `30`.
//! - `DEV_MODE` - Optional. When `1`/`true`, requests without a token run as a local guest user.

use std::path::PathBuf;
use thiserror::Error;

/// Signing secret used when `DEV_MODE` is on and no secret is set.
const DEV_SECRET: &str = "planeo-dev-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Token signing configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for signing JWTs
    pub jwt_secret: String,

    /// Access token lifetime in minutes
    pub access_ttl_minutes: i64,

    /// Refresh token lifetime in days
    pub refresh_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_SECRET.to_string(),
            access_ttl_minutes: 60,
            refresh_ttl_days: 30,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Directory holding the SQLite database
    pub data_dir: PathBuf,

    /// When on, unauthenticated requests run as the local guest user
    pub dev_mode: bool,

    /// Token signing configuration
    pub auth: AuthConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `JWT_SECRET` is not set
    /// and `DEV_MODE` is off.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let dev_mode = std::env::var("DEV_MODE")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if dev_mode => DEV_SECRET.to_string(),
            Err(_) => return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string())),
        };

        let access_ttl_minutes = std::env::var("ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("ACCESS_TOKEN_TTL_MINUTES".to_string(), format!("{}", e))
            })?;

        let refresh_ttl_days = std::env::var("REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("REFRESH_TOKEN_TTL_DAYS".to_string(), format!("{}", e))
            })?;

        Ok(Self {
            host,
            port,
            data_dir,
            dev_mode,
            auth: AuthConfig {
                jwt_secret,
                access_ttl_minutes,
                refresh_ttl_days,
            },
        })
    }

    /// Path of the SQLite database file under `data_dir`.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("planeo.db")
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(data_dir: PathBuf, dev_mode: bool) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            data_dir,
            dev_mode,
            auth: AuthConfig::default(),
        }
    }
}
