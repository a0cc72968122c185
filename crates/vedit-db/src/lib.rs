//! SQLite persistence for uploaded videos and the artifacts derived from them.

pub mod config;
pub mod error;
pub mod repo;

pub use config::{connect, DbConfig};
pub use error::{DbError, DbResult};
pub use repo::VideoRepository;

/// Connection pool type used across the workspace.
pub type DbPool = sqlx::SqlitePool;
