//! Pool configuration and connection setup.

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::DbResult;
use crate::DbPool;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Database connection pool configuration.
#[derive(Clone)]
pub struct DbConfig {
    /// SQLite connection URL
    pub database_url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Connection acquisition timeout
    pub acquire_timeout_secs: u64,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("database_url", &self.database_url)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://vedit.db".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 10,
        }
    }
}

impl DbConfig {
    /// Load from `DATABASE_URL`, `DB_MAX_CONNECTIONS`, `DB_ACQUIRE_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),
            acquire_timeout_secs: std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.acquire_timeout_secs),
        }
    }

    /// Private in-memory database, used by tests and throwaway runs.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

/// Open the pool, creating the database file if needed, and apply migrations.
pub async fn connect(config: &DbConfig) -> DbResult<DbPool> {
    debug!(?config, "Connecting to database");

    let mut options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));

    if config.is_in_memory() {
        // Every connection to :memory: is its own database; keep exactly one alive
        pool_options = pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    } else {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool = pool_options.connect_with(options).await?;
    MIGRATOR.run(&pool).await?;

    info!(
        in_memory = config.is_in_memory(),
        max_connections = config.max_connections,
        "Database ready"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_detection() {
        assert!(DbConfig::in_memory().is_in_memory());
        assert!(!DbConfig::default().is_in_memory());
    }

    #[tokio::test]
    async fn test_connect_creates_file_and_migrates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vedit.db");
        let config = DbConfig {
            database_url: format!("sqlite://{}", path.display()),
            ..DbConfig::default()
        };

        let pool = connect(&config).await.unwrap();
        assert!(path.exists());

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        for table in ["overlays", "trimmed_videos", "video_qualities", "videos"] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
    }
}
