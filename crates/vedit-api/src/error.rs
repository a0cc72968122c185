//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    /// The job exists but has not finished yet.
    #[error("Job not ready")]
    NotReady,

    /// A job finished with an error outcome; the message is the job's.
    #[error("{0}")]
    JobFailed(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Db(#[from] vedit_db::DbError),

    #[error("Queue error: {0}")]
    Queue(#[from] vedit_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotReady => StatusCode::ACCEPTED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::JobFailed(_)
            | ApiError::Internal(_)
            | ApiError::Db(_)
            | ApiError::Queue(_)
            | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            ApiError::Internal(_) | ApiError::Db(_) | ApiError::Queue(_) | ApiError::Io(_)
        )
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{}: invalid value", field),
                })
            })
            .collect();
        messages.sort();
        Self::Validation(messages.join("; "))
    }
}

/// Body detail used when internal errors are hidden.
pub const INTERNAL_ERROR_DETAIL: &str = "An internal error occurred";

/// Response extension marking an internal error, so production
/// deployments can replace its detail.
#[derive(Debug, Clone, Copy)]
pub struct InternalErrorResponse;

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

/// `{"detail": ...}` response with the given status.
pub(crate) fn detail_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { detail: detail.into() })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if !self.is_internal() {
            return detail_response(status, self.to_string());
        }

        error!("Request failed: {}", self);
        let mut response = detail_response(status, self.to_string());
        response.extensions_mut().insert(InternalErrorResponse);
        response
    }
}
