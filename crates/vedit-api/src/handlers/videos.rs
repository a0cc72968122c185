//! Video listings and rendition downloads.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use vedit_models::{QualityPreset, VideoDetail, VideoId};

use crate::error::{ApiError, ApiResult};
use crate::handlers::file_response;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ListVideosQuery {
    #[serde(default)]
    #[validate(range(min = 0, message = "skip must not be negative"))]
    pub skip: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 1000, message = "limit must be between 1 and 1000"))]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// GET /videos/
pub async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<ListVideosQuery>,
) -> ApiResult<Json<Vec<VideoDetail>>> {
    query.validate()?;
    let videos = state.repo.list_video_details(query.skip, query.limit).await?;
    Ok(Json(videos))
}

/// GET /videos/:video_id
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<VideoId>,
) -> ApiResult<Json<VideoDetail>> {
    state
        .repo
        .get_video_detail(video_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Video not found"))
}

/// GET /videos/:video_id/quality/:quality
///
/// Serves the latest rendition at that quality. Unknown labels are
/// "Quality not found" rather than a 400.
pub async fn get_quality_video(
    State(state): State<AppState>,
    Path((video_id, quality)): Path<(VideoId, String)>,
) -> ApiResult<Response> {
    state
        .repo
        .get_video(video_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    let rendition = match quality.parse::<QualityPreset>() {
        Ok(preset) => state.repo.find_quality(video_id, preset).await?,
        Err(_) => None,
    }
    .ok_or_else(|| ApiError::not_found("Quality not found"))?;

    file_response(&state.layout.qualities_dir().join(&rendition.filename)).await
}
