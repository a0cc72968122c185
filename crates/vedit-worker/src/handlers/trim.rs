use vedit_media::trim_command;
use vedit_models::{JobKind, JobOutcome, NewTrimmedVideo};
use vedit_queue::TrimJob;

use super::{file_name, load_video, path_string, prepare_output};
use crate::context::ProcessingContext;
use crate::error::WorkerResult;
use crate::logging::JobLogger;

pub(super) async fn handle(ctx: &ProcessingContext, job: &TrimJob) -> WorkerResult<JobOutcome> {
    let logger = JobLogger::new(&job.job_id, JobKind::Trim);
    let video = load_video(ctx, job.video_id).await?;
    logger.log_start(&format!(
        "{} [{}s, {}s]",
        video.filename, job.start_time, job.end_time
    ));

    let input = ctx.layout.upload_path(&video.filename);
    let output = ctx.layout.trim_path(&video.filename);
    prepare_output(&output).await?;

    ctx.media
        .run(&trim_command(&input, &output, job.start_time, job.end_time))
        .await?;

    let info = ctx.media.inspect(&output).await?;
    let trimmed = ctx
        .repo
        .create_trimmed_video(&NewTrimmedVideo {
            original_video_id: video.id,
            filename: file_name(&output),
            duration: info.duration,
            size: info.size as f64,
        })
        .await?;

    logger.log_completion(&format!("trimmed video {}", trimmed.id));
    Ok(JobOutcome::completed(path_string(&output), Some(trimmed.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::process_job;
    use crate::handlers::testing::TestEnv;

    #[tokio::test]
    async fn test_trim_inserts_trimmed_video() {
        let env = TestEnv::new().await;
        let video = env.seed_video("id1_movie.mp4").await;

        let outcome = handle(&env.ctx, &TrimJob::new(video.id, 1.0, 4.5)).await.unwrap();
        assert!(outcome.is_completed());

        let detail = env.ctx.repo.get_video_detail(video.id).await.unwrap().unwrap();
        assert_eq!(detail.trimmed_videos.len(), 1);
        let trimmed = &detail.trimmed_videos[0];
        assert_eq!(trimmed.filename, "trimmed_id1_movie.mp4");
        assert_eq!(trimmed.original_video_id, video.id);
        assert!(trimmed.size > 0.0);

        let args = env.media.last_args().await;
        let joined = args.join(" ");
        assert!(joined.contains("-ss 1 -to 4.5 -c copy"));
        assert!(joined.ends_with("trims/trimmed_id1_movie.mp4"));
    }

    #[tokio::test]
    async fn test_trim_missing_video_is_error_outcome() {
        let env = TestEnv::new().await;

        let outcome = process_job(&env.ctx, &TrimJob::new(999, 0.0, 1.0).into()).await.unwrap();
        assert_eq!(outcome, JobOutcome::error("Original video not found"));
        assert!(env.media.last_args().await.is_empty());
    }

    #[tokio::test]
    async fn test_trim_ffmpeg_failure_propagates() {
        let env = TestEnv::failing().await;
        let video = env.seed_video("id2_movie.mp4").await;

        let result = process_job(&env.ctx, &TrimJob::new(video.id, 0.0, 1.0).into()).await;
        assert!(matches!(result, Err(crate::WorkerError::Media(_))));

        let detail = env.ctx.repo.get_video_detail(video.id).await.unwrap().unwrap();
        assert!(detail.trimmed_videos.is_empty());
    }
}
