//! Job status and result retrieval.

use std::path::PathBuf;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use vedit_models::{JobId, JobOutcome, JobRecord, JobState};

use crate::error::{ApiError, ApiResult};
use crate::handlers::file_response;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub status: JobState,
    /// Handler outcome once the job is ready, otherwise null
    pub result: Option<JobOutcome>,
}

/// GET /status/:job_id
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let record = load_record(&state, &job_id).await?;
    Ok(Json(JobStatusResponse {
        status: record.state,
        result: record.outcome,
    }))
}

/// GET /result/:job_id
///
/// Returns the produced file when the job completed, 202 while it is
/// pending or running, and 500 with the job's message when it failed.
pub async fn get_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let record = load_record(&state, &job_id).await?;
    if !record.is_ready() {
        return Err(ApiError::NotReady);
    }

    match record.outcome {
        Some(JobOutcome::Completed { file_path, .. }) => file_response(&PathBuf::from(file_path)).await,
        Some(JobOutcome::Error { message }) => Err(ApiError::JobFailed(message)),
        None => Err(ApiError::JobFailed(format!("Job ended in state {}", record.state))),
    }
}

async fn load_record(state: &AppState, job_id: &str) -> ApiResult<JobRecord> {
    if !is_valid_job_id(job_id) {
        return Err(ApiError::not_found("Job not found"));
    }
    state
        .jobs
        .status(&JobId::from_string(job_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))
}

/// Job ids are UUIDs; reject anything that could not be one before
/// touching Redis.
fn is_valid_job_id(id: &str) -> bool {
    (8..=64).contains(&id.len()) && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
