use vedit_models::{is_safe_asset_name, JobOutcome, NewVideo};
use vedit_queue::UploadJob;

use super::path_string;
use crate::context::ProcessingContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

pub(super) async fn handle(ctx: &ProcessingContext, job: &UploadJob) -> WorkerResult<JobOutcome> {
    let logger = JobLogger::new(&job.job_id, vedit_models::JobKind::Upload);
    logger.log_start(&job.filename);

    if !is_safe_asset_name(&job.filename) {
        return Err(WorkerError::rejected("Invalid file name"));
    }
    let path = ctx.layout.upload_path(&job.filename);
    if !tokio::fs::try_exists(&path).await? {
        return Err(WorkerError::rejected("Uploaded file not found"));
    }

    let info = ctx.media.inspect(&path).await?;
    let video = ctx
        .repo
        .create_video(&NewVideo {
            filename: job.filename.clone(),
            duration: info.duration,
            size: info.size as f64,
        })
        .await?;

    logger.log_completion(&format!("video {} ({:.2}s)", video.id, video.duration));
    Ok(JobOutcome::completed(path_string(&path), Some(video.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::TestEnv;

    #[tokio::test]
    async fn test_upload_inserts_video() {
        let env = TestEnv::new().await;
        env.write_upload("abc_clip.mp4", b"0123456789");

        let job = UploadJob::new("abc_clip.mp4");
        let outcome = handle(&env.ctx, &job).await.unwrap();

        let JobOutcome::Completed { record_id, file_path } = outcome else {
            panic!("expected completed outcome");
        };
        let video = env.ctx.repo.get_video(record_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(video.filename, "abc_clip.mp4");
        assert_eq!(video.size, 10.0);
        assert_eq!(video.duration, env.media.duration);
        assert!(file_path.ends_with("uploads/abc_clip.mp4"));
    }

    #[tokio::test]
    async fn test_upload_missing_file_rejected() {
        let env = TestEnv::new().await;
        let job = UploadJob::new("nope.mp4");

        let err = tokio_test::assert_err!(handle(&env.ctx, &job).await);
        assert!(matches!(err, WorkerError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_upload_name_outside_uploads_rejected() {
        let env = TestEnv::new().await;
        env.write_font();
        let job = UploadJob::new("../fonts/NotoSans-Regular.ttf");

        let err = tokio_test::assert_err!(handle(&env.ctx, &job).await);
        assert_eq!(err.to_string(), "Invalid file name");
        assert!(env.ctx.repo.list_videos(0, 10).await.unwrap().is_empty());
    }
}
