//! Job definitions for status tracking.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Kind of transformation a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Upload,
    Trim,
    TextOverlay,
    ImageOverlay,
    VideoOverlay,
    Watermark,
    Quality,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Upload => "upload",
            JobKind::Trim => "trim",
            JobKind::TextOverlay => "text_overlay",
            JobKind::ImageOverlay => "image_overlay",
            JobKind::VideoOverlay => "video_overlay",
            JobKind::Watermark => "watermark",
            JobKind::Quality => "quality",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job lifecycle state as reported to clients.
///
/// A job that ran to the end is `Success` even when its outcome is an
/// error status; `Failure` means the worker itself hit an unexpected error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Job is waiting in queue
    #[default]
    Pending,
    /// A worker picked the job up
    Started,
    /// Handler returned an outcome
    Success,
    /// Handler raised an error
    Failure,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Started => "STARTED",
            JobState::Success => "SUCCESS",
            JobState::Failure => "FAILURE",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_ready(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result produced by a job handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// The artifact was produced and recorded.
    Completed {
        /// Path of the produced file
        file_path: String,
        /// Id of the inserted record, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        record_id: Option<i64>,
    },
    /// The job could not be carried out.
    Error { message: String },
}

impl JobOutcome {
    pub fn completed(file_path: impl Into<String>, record_id: Option<i64>) -> Self {
        Self::Completed {
            file_path: file_path.into(),
            record_id,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }
}

/// Status record kept for every submitted job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    /// Unique job ID
    pub job_id: JobId,
    /// What the job does
    pub kind: JobKind,
    /// Current state
    #[serde(default)]
    pub state: JobState,
    /// Handler outcome once the job is ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JobOutcome>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a pending record.
    pub fn new(job_id: JobId, kind: JobKind) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            kind,
            state: JobState::Pending,
            outcome: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the job as picked up by a worker.
    pub fn start(mut self) -> Self {
        self.state = JobState::Started;
        self.updated_at = Utc::now();
        self
    }

    /// Record the handler outcome.
    pub fn finish(mut self, outcome: JobOutcome) -> Self {
        self.state = JobState::Success;
        self.outcome = Some(outcome);
        self.updated_at = Utc::now();
        self
    }

    /// Record an unexpected handler error.
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.state = JobState::Failure;
        self.outcome = Some(JobOutcome::error(message));
        self.updated_at = Utc::now();
        self
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }
}
