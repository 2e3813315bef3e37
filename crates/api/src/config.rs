//! Configuration loaded from the environment
//!
//! All values are read once at startup; there is no reload. A bad value is a
//! [`ConfigError`] and the server refuses to start.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::auth::password::{DEFAULT_ITERATIONS, DEFAULT_MEMORY_KIB, DEFAULT_PARALLELISM};
use crate::routes::OPERATION_PATHS;

/// Shortest signing secret accepted (256 bits, the HS256 key size)
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Longest token lifetime accepted (ten years)
pub const MAX_JWT_EXPIRY_HOURS: i64 = 8760 * 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("JWT_SECRET must be at least 32 bytes")]
    WeakSecret,
    #[error("password hashing misconfigured: {0}")]
    Hashing(String),
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// PostgreSQL URL; `None` selects the in-memory store
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub playground_path: String,
    pub cors_allowed_origins: Vec<String>,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub hash_parallelism: u32,
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }

        let jwt_expiry_hours: i64 = parse_or(&get, "JWT_EXPIRY_HOURS", 24)?;
        if !(1..=MAX_JWT_EXPIRY_HOURS).contains(&jwt_expiry_hours) {
            return Err(ConfigError::Invalid {
                key: "JWT_EXPIRY_HOURS",
                value: jwt_expiry_hours.to_string(),
            });
        }

        let playground_path = get("PLAYGROUND_PATH").unwrap_or_else(|| "/".to_string());
        if !playground_path.starts_with('/') || OPERATION_PATHS.contains(&playground_path.as_str())
        {
            return Err(ConfigError::Invalid {
                key: "PLAYGROUND_PATH",
                value: playground_path,
            });
        }

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_or(&get, "REQUEST_TIMEOUT_SECS", 30)?;
        if request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_SECS",
                value: request_timeout_secs.to_string(),
            });
        }

        Ok(Self {
            host: parse_or(&get, "HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&get, "PORT", 8080)?,
            database_url: get("DATABASE_URL"),
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
            jwt_secret,
            jwt_expiry_hours,
            playground_path,
            cors_allowed_origins,
            request_timeout: Duration::from_secs(request_timeout_secs),
            max_body_bytes: parse_or(&get, "MAX_BODY_BYTES", 1024 * 1024)?,
            hash_memory_kib: parse_or(&get, "HASH_MEMORY_KIB", DEFAULT_MEMORY_KIB)?,
            hash_iterations: parse_or(&get, "HASH_ITERATIONS", DEFAULT_ITERATIONS)?,
            hash_parallelism: parse_or(&get, "HASH_PARALLELISM", DEFAULT_PARALLELISM)?,
        })
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address())
            .field("database_configured", &self.database_url.is_some())
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("playground_path", &self.playground_path)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("request_timeout", &self.request_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}
