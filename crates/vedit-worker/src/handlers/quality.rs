use vedit_media::quality_command;
use vedit_models::{JobKind, JobOutcome, NewVideoQuality};
use vedit_queue::QualityJob;

use super::{file_name, load_video, path_string, prepare_output};
use crate::context::ProcessingContext;
use crate::error::WorkerResult;
use crate::logging::JobLogger;

pub(super) async fn handle(ctx: &ProcessingContext, job: &QualityJob) -> WorkerResult<JobOutcome> {
    let logger = JobLogger::new(&job.job_id, JobKind::Quality);
    let video = load_video(ctx, job.video_id).await?;
    logger.log_start(&format!("{} at {}", video.filename, job.quality));

    let input = ctx.layout.upload_path(&video.filename);
    let output = ctx.layout.quality_path(job.quality, &video.filename);
    prepare_output(&output).await?;
    ctx.media.run(&quality_command(&input, &output, job.quality)).await?;

    let info = ctx.media.inspect(&output).await?;
    let rendition = ctx
        .repo
        .create_video_quality(&NewVideoQuality {
            original_video_id: video.id,
            quality: job.quality,
            filename: file_name(&output),
            size: info.size as f64,
        })
        .await?;

    logger.log_completion(&format!("{} rendition {}", job.quality, rendition.id));
    Ok(JobOutcome::completed(path_string(&output), Some(rendition.id)))
}
