//! One handler per job kind.
//!
//! Every handler follows the same sequence: look up the source record,
//! build the ffmpeg arguments, run them, inspect the output where a size or
//! duration is recorded, then insert the derived record.

mod overlay;
mod quality;
mod trim;
mod upload;
mod watermark;

#[cfg(test)]
pub(crate) mod testing;

use std::path::{Path, PathBuf};

use tracing::warn;
use vedit_models::{JobOutcome, Video, VideoId};
use vedit_queue::QueueJob;

use crate::context::ProcessingContext;
use crate::error::{WorkerError, WorkerResult};

/// Run a job to its outcome.
///
/// Rejected inputs (missing video, font or asset) come back as
/// `Ok(JobOutcome::Error)`. `Err` means ffmpeg, ffprobe or the database
/// failed and the job should be marked FAILURE.
pub async fn process_job(ctx: &ProcessingContext, job: &QueueJob) -> WorkerResult<JobOutcome> {
    let result = match job {
        QueueJob::Upload(j) => upload::handle(ctx, j).await,
        QueueJob::Trim(j) => trim::handle(ctx, j).await,
        QueueJob::TextOverlay(j) => overlay::handle_text(ctx, j).await,
        QueueJob::ImageOverlay(j) => overlay::handle_image(ctx, j).await,
        QueueJob::VideoOverlay(j) => overlay::handle_video(ctx, j).await,
        QueueJob::Watermark(j) => watermark::handle(ctx, j).await,
        QueueJob::Quality(j) => quality::handle(ctx, j).await,
    };

    match result {
        Err(WorkerError::Rejected(message)) => {
            warn!(job_id = %job.job_id(), kind = %job.kind(), "Job rejected: {}", message);
            Ok(JobOutcome::error(message))
        }
        other => other,
    }
}

async fn load_video(ctx: &ProcessingContext, video_id: VideoId) -> WorkerResult<Video> {
    ctx.repo
        .get_video(video_id)
        .await?
        .ok_or_else(|| WorkerError::rejected("Original video not found"))
}

/// Resolve an overlay asset, rejecting unsafe names and missing files.
/// `label` names the asset in the error, e.g. "Overlay image".
async fn load_asset(ctx: &ProcessingContext, name: &str, label: &str) -> WorkerResult<PathBuf> {
    let path = ctx
        .layout
        .asset_path(name)
        .ok_or_else(|| WorkerError::rejected("Invalid asset name"))?;
    if !tokio::fs::try_exists(&path).await? {
        return Err(WorkerError::rejected(format!(
            "{} not found at {}",
            label,
            path.display()
        )));
    }
    Ok(path)
}

async fn prepare_output(output: &Path) -> WorkerResult<()> {
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}
