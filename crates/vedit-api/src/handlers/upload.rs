//! Video upload.

use std::path::Path;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use vedit_models::{is_safe_asset_name, MediaLayout};
use vedit_queue::UploadJob;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub job_id: String,
    /// Stored file name, `{uuid}_{original}`
    pub filename: String,
}

/// POST /upload/
///
/// Stores the multipart `file` field under the uploads directory and
/// enqueues a job that inspects it and records the video.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original = field
            .file_name()
            .and_then(original_name)
            .ok_or_else(|| ApiError::bad_request("Invalid file name"))?;
        let filename = MediaLayout::upload_name(&Uuid::new_v4().to_string(), &original);
        let path = state.layout.upload_path(&filename);

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to save uploaded file: {e}")))?;
        let mut written: u64 = 0;

        let copied = async {
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?
            {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<(), ApiError>(())
        }
        .await;

        if let Err(e) = copied {
            warn!(path = %path.display(), "Upload aborted: {}", e);
            tokio::fs::remove_file(&path).await.ok();
            return Err(match e {
                ApiError::Io(io) => ApiError::internal(format!("Failed to save uploaded file: {io}")),
                other => other,
            });
        }

        metrics::record_upload_bytes(written);
        info!(filename = %filename, bytes = written, "Stored upload");

        let job = UploadJob::new(filename.clone());
        let job_id = state.jobs.submit(job.into()).await?;
        metrics::record_job_submitted("upload");

        return Ok(Json(UploadResponse {
            job_id: job_id.to_string(),
            filename,
        }));
    }

    Err(ApiError::bad_request("No file provided"))
}

/// Final path component of a client-supplied file name.
fn original_name(name: &str) -> Option<String> {
    // Browsers on Windows may send a full path
    let name = name.rsplit(|c| c == '/' || c == '\\').next()?;
    let name = Path::new(name).file_name()?.to_str()?;
    is_safe_asset_name(name).then(|| name.to_string())
}
