//! Database connection pool management

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use crate::error::DatabaseError;

/// Type alias for the PostgreSQL connection pool
pub type DatabasePool = PgPool;

/// Configuration options for the database connection pool
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use infra_db::DatabaseConfig;
///
/// let config = DatabaseConfig::new("postgres://localhost/inventory")
///     .max_connections(20)
///     .lock_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout duration
    #[serde(with = "seconds")]
    pub connect_timeout: Duration,
    /// Maximum lifetime of a connection
    #[serde(with = "seconds")]
    pub max_lifetime: Duration,
    /// Idle timeout before closing a connection
    #[serde(with = "seconds")]
    pub idle_timeout: Duration,
    /// How long a posting waits for a row lock before giving up with a
    /// retriable conflict
    #[serde(with = "seconds")]
    pub lock_timeout: Duration,
}

impl DatabaseConfig {
    /// Creates a configuration with default pool settings for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(30 * 60), // 30 minutes
            idle_timeout: Duration::from_secs(10 * 60), // 10 minutes
            lock_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new("postgres://localhost/inventory")
    }
}

/// Durations are configured as whole or fractional seconds
mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Creates a database connection pool with the given configuration
///
/// Every connection gets the configured `lock_timeout`, so a posting stuck
/// behind another posting's row locks fails with SQLSTATE 55P03 instead of
/// waiting forever.
///
/// # Errors
///
/// Returns `DatabaseError::ConnectionFailed` if the URL is invalid or the
/// pool cannot be created
pub async fn create_pool(config: DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    info!(
        "Creating database pool with max_connections={}, min_connections={}, lock_timeout={:?}",
        config.max_connections, config.min_connections, config.lock_timeout
    );

    let options = PgConnectOptions::from_str(&config.url)
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?
        .options([("lock_timeout", format!("{}ms", config.lock_timeout.as_millis()))]);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    info!("Database pool created successfully");
    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = DatabaseConfig::new("postgres://test")
            .max_connections(50)
            .min_connections(10)
            .connect_timeout(Duration::from_secs(60))
            .lock_timeout(Duration::from_millis(500));

        assert_eq!(config.max_connections, 50);
        assert_eq!(config.min_connections, 10);
        assert_eq!(config.connect_timeout, Duration::from_secs(60));
        assert_eq!(config.lock_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: DatabaseConfig =
            serde_json::from_str(r#"{ "url": "postgres://db/stock", "lock_timeout": 1.5 }"#).unwrap();

        assert_eq!(config.url, "postgres://db/stock");
        assert_eq!(config.lock_timeout, Duration::from_millis(1500));
        assert_eq!(config.max_connections, 10);
    }
}
