// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;

use crate::error::AppError;

/// Interval between two session expiry checks.
pub const DEFAULT_SESSION_CHECK_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 15;

/// Where the exam catalog is loaded from at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    /// `GET /app-config` on the WordPress backend.
    Remote,
    /// The catalog compiled into the binary.
    Bundled,
}

impl CatalogSource {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(CatalogSource::Remote),
            "bundled" => Ok(CatalogSource::Bundled),
            other => Err(AppError::ConfigError(format!(
                "CATALOG_SOURCE must be 'remote' or 'bundled', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Base of the exam-app REST namespace, e.g. `https://site/wp-json/exam-app/v1`.
    pub wp_api_base: String,
    /// When set, token signatures are verified locally as well.
    pub jwt_secret: Option<String>,
    pub catalog_source: CatalogSource,
    pub session_check_interval_secs: u64,
    pub remote_timeout_secs: u64,
    pub bind_addr: SocketAddr,
    pub static_dir: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://exam_portal.db?mode=rwc".to_string());

        let wp_api_base = env::var("WP_API_BASE")
            .map_err(|_| AppError::ConfigError("WP_API_BASE must be set".to_string()))?;
        url::Url::parse(&wp_api_base)
            .map_err(|e| AppError::ConfigError(format!("WP_API_BASE is not a valid URL: {}", e)))?;

        let jwt_secret = env::var("JWT_SECRET").ok().filter(|s| !s.trim().is_empty());

        let catalog_source = match env::var("CATALOG_SOURCE") {
            Ok(value) => CatalogSource::parse(&value)?,
            Err(_) => CatalogSource::Remote,
        };

        let session_check_interval_secs = parse_u64(
            "SESSION_CHECK_INTERVAL_SECS",
            DEFAULT_SESSION_CHECK_INTERVAL_SECS,
        )?;
        let remote_timeout_secs = parse_u64("REMOTE_TIMEOUT_SECS", DEFAULT_REMOTE_TIMEOUT_SECS)?;

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::ConfigError(format!("BIND_ADDR is invalid: {}", e)))?;

        let static_dir = env::var("STATIC_DIR").ok();

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            wp_api_base: wp_api_base.trim_end_matches('/').to_string(),
            jwt_secret,
            catalog_source,
            session_check_interval_secs,
            remote_timeout_secs,
            bind_addr,
            static_dir,
            rust_log,
        })
    }
}

fn parse_u64(name: &str, default: u64) -> Result<u64, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| AppError::ConfigError(format!("{} is invalid: {}", name, e))),
        Err(_) => Ok(default),
    }
}
