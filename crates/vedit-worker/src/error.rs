//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Infrastructure failures. A handler returning one of these leaves the
/// job in FAILURE state; domain problems are reported as error outcomes.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Bad input the client can fix; reported as an error outcome.
    #[error("{0}")]
    Rejected(String),

    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Job timed out after {0} seconds")]
    Timeout(u64),

    #[error("Media error: {0}")]
    Media(#[from] vedit_media::MediaError),

    #[error("Database error: {0}")]
    Db(#[from] vedit_db::DbError),

    #[error("Queue error: {0}")]
    Queue(#[from] vedit_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Message stored on the job record, including ffmpeg's stderr tail.
    pub fn status_message(&self) -> String {
        match self {
            WorkerError::Media(e) => e.detailed_message(),
            other => other.to_string(),
        }
    }
}
