//! Configuration management for the server.

use std::env;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Upper bound on pooled database connections
    pub max_db_connections: u32,
    /// Allowed CORS origin; any origin when unset
    pub cors_origin: Option<String>,
    /// Time budget for rebuilding one historical version
    pub replay_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?;

        let max_db_connections = match lookup("MAX_DB_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidMaxConnections)?,
            None => 10,
        };

        let cors_origin = lookup("CORS_ORIGIN").filter(|o| !o.is_empty() && o != "*");

        let replay_timeout_ms: u64 = match lookup("REPLAY_TIMEOUT_MS") {
            Some(raw) => raw
                .parse()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidReplayTimeout)?,
            None => 5000,
        };

        Ok(Self {
            host,
            port,
            database_url,
            max_db_connections,
            cors_origin,
            replay_timeout: Duration::from_millis(replay_timeout_ms),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("MAX_DB_CONNECTIONS must be a positive integer")]
    InvalidMaxConnections,

    #[error("REPLAY_TIMEOUT_MS must be a positive number of milliseconds")]
    InvalidReplayTimeout,
}
