//! Application state.

use std::sync::Arc;

use vedit_db::{connect, DbConfig, VideoRepository};
use vedit_models::MediaLayout;
use vedit_queue::{JobBackend, QueueConfig, RedisJobBackend};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub repo: VideoRepository,
    pub jobs: Arc<dyn JobBackend>,
    pub layout: MediaLayout,
}

impl AppState {
    /// Build state from the environment: SQLite, Redis and the data dir.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let layout = MediaLayout::from_env();
        layout.ensure_dirs()?;

        let pool = connect(&DbConfig::from_env()).await?;
        let backend = RedisJobBackend::new(QueueConfig::from_env())?;

        Ok(Self::from_parts(
            config,
            VideoRepository::new(pool),
            Arc::new(backend),
            layout,
        ))
    }

    pub fn from_parts(
        config: ApiConfig,
        repo: VideoRepository,
        jobs: Arc<dyn JobBackend>,
        layout: MediaLayout,
    ) -> Self {
        Self {
            config,
            repo,
            jobs,
            layout,
        }
    }
}
