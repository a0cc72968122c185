//! Editing endpoints. Each validates its body and enqueues one job.

use std::borrow::Cow;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::{Validate, ValidationError};

use vedit_models::{QualityPreset, VideoId};
use vedit_queue::{
    ImageOverlayJob, QualityJob, QueueJob, TextOverlayJob, TrimJob, VideoOverlayJob, WatermarkJob,
};

use crate::error::{ApiError, ApiResult};
use crate::handlers::extract::ValidatedJson;
use crate::metrics;
use crate::state::AppState;

/// Response for every job-submitting endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobResponse {
    pub job_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "trim_window"))]
pub struct TrimRequest {
    pub video_id: VideoId,
    #[validate(range(min = 0.0, message = "start_time must not be negative"))]
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "text_window"))]
pub struct TextOverlayRequest {
    pub video_id: VideoId,
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
    pub x: i64,
    pub y: i64,
    #[validate(range(min = 0.0, message = "start_time must not be negative"))]
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "image_window"))]
pub struct ImageOverlayRequest {
    pub video_id: VideoId,
    #[validate(length(min = 1, message = "image_name must not be empty"))]
    pub image_name: String,
    pub x: i64,
    pub y: i64,
    #[validate(range(min = 0.0, message = "start_time must not be negative"))]
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "video_window"))]
pub struct VideoOverlayRequest {
    pub video_id: VideoId,
    #[validate(length(min = 1, message = "video_name must not be empty"))]
    pub video_name: String,
    pub x: i64,
    pub y: i64,
    #[validate(range(min = 0.0, message = "start_time must not be negative"))]
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WatermarkRequest {
    pub video_id: VideoId,
    #[validate(length(min = 1, message = "image_name must not be empty"))]
    pub image_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QualityRequest {
    pub video_id: VideoId,
    pub quality: String,
}

fn check_window(start_time: f64, end_time: f64) -> Result<(), ValidationError> {
    if end_time > start_time {
        return Ok(());
    }
    let mut err = ValidationError::new("time_window");
    err.message = Some(Cow::from("end_time must be greater than start_time"));
    Err(err)
}

fn trim_window(req: &TrimRequest) -> Result<(), ValidationError> {
    check_window(req.start_time, req.end_time)
}

fn text_window(req: &TextOverlayRequest) -> Result<(), ValidationError> {
    check_window(req.start_time, req.end_time)
}

fn image_window(req: &ImageOverlayRequest) -> Result<(), ValidationError> {
    check_window(req.start_time, req.end_time)
}

fn video_window(req: &VideoOverlayRequest) -> Result<(), ValidationError> {
    check_window(req.start_time, req.end_time)
}

async fn submit(state: &AppState, job: QueueJob) -> ApiResult<Json<JobResponse>> {
    let kind = job.kind();
    let job_id = state.jobs.submit(job).await?;
    metrics::record_job_submitted(kind.as_str());
    info!(job_id = %job_id, kind = %kind, "Job submitted");
    Ok(Json(JobResponse {
        job_id: job_id.to_string(),
    }))
}

/// POST /trim/
pub async fn trim_video(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<TrimRequest>,
) -> ApiResult<Json<JobResponse>> {
    submit(&state, TrimJob::new(req.video_id, req.start_time, req.end_time).into()).await
}

/// POST /overlays/text
pub async fn add_text_overlay(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<TextOverlayRequest>,
) -> ApiResult<Json<JobResponse>> {
    let job = TextOverlayJob::new(req.video_id, req.text, req.x, req.y, req.start_time, req.end_time);
    submit(&state, job.into()).await
}

/// POST /overlays/image
pub async fn add_image_overlay(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ImageOverlayRequest>,
) -> ApiResult<Json<JobResponse>> {
    let job = ImageOverlayJob::new(
        req.video_id,
        req.image_name,
        req.x,
        req.y,
        req.start_time,
        req.end_time,
    );
    submit(&state, job.into()).await
}

/// POST /overlays/video
pub async fn add_video_overlay(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VideoOverlayRequest>,
) -> ApiResult<Json<JobResponse>> {
    let job = VideoOverlayJob::new(
        req.video_id,
        req.video_name,
        req.x,
        req.y,
        req.start_time,
        req.end_time,
    );
    submit(&state, job.into()).await
}

/// POST /watermark
pub async fn add_watermark(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<WatermarkRequest>,
) -> ApiResult<Json<JobResponse>> {
    submit(&state, WatermarkJob::new(req.video_id, req.image_name).into()).await
}

/// POST /quality
pub async fn generate_quality(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<QualityRequest>,
) -> ApiResult<Json<JobResponse>> {
    let quality: QualityPreset = req
        .quality
        .parse()
        .map_err(|e: vedit_models::QualityParseError| ApiError::bad_request(e.to_string()))?;
    submit(&state, QualityJob::new(req.video_id, quality).into()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_window_validation() {
        let ok = TrimRequest { video_id: 1, start_time: 0.0, end_time: 2.0 };
        assert!(ok.validate().is_ok());

        let inverted = TrimRequest { video_id: 1, start_time: 3.0, end_time: 2.0 };
        let err = ApiError::from(inverted.validate().unwrap_err());
        assert_eq!(err.to_string(), "end_time must be greater than start_time");

        let negative = TrimRequest { video_id: 1, start_time: -1.0, end_time: 2.0 };
        let err = ApiError::from(negative.validate().unwrap_err());
        assert!(err.to_string().contains("start_time must not be negative"));
    }

    #[test]
    fn test_empty_text_rejected() {
        let req = TextOverlayRequest {
            video_id: 1,
            text: String::new(),
            x: 0,
            y: 0,
            start_time: 0.0,
            end_time: 1.0,
        };
        let err = ApiError::from(req.validate().unwrap_err());
        assert_eq!(err.to_string(), "text must not be empty");
    }
}
