use vedit_media::watermark_command;
use vedit_models::{JobKind, JobOutcome, NewOverlay};
use vedit_queue::WatermarkJob;

use super::{file_name, load_asset, load_video, path_string, prepare_output};
use crate::context::ProcessingContext;
use crate::error::WorkerResult;
use crate::logging::JobLogger;

pub(super) async fn handle(ctx: &ProcessingContext, job: &WatermarkJob) -> WorkerResult<JobOutcome> {
    let logger = JobLogger::new(&job.job_id, JobKind::Watermark);
    let video = load_video(ctx, job.video_id).await?;
    let image = load_asset(ctx, &job.image_name, "Watermark image").await?;
    logger.log_start(&format!("{} on {}", job.image_name, video.filename));

    let input = ctx.layout.upload_path(&video.filename);
    let output = ctx.layout.watermark_path(&video.filename);
    prepare_output(&output).await?;
    ctx.media.run(&watermark_command(&input, &image, &output)).await?;

    let overlay = ctx
        .repo
        .create_overlay(&NewOverlay::watermark(video.id, &job.image_name, file_name(&output)))
        .await?;

    logger.log_completion(&format!("watermark overlay {}", overlay.id));
    Ok(JobOutcome::completed(path_string(&output), Some(overlay.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::process_job;
    use crate::handlers::testing::TestEnv;
    use vedit_models::OverlayKind;

    #[tokio::test]
    async fn test_watermark_inserts_pinned_overlay() {
        let env = TestEnv::new().await;
        env.write_asset("mark.png");
        let video = env.seed_video("w1_clip.mp4").await;

        let outcome = handle(&env.ctx, &WatermarkJob::new(video.id, "mark.png")).await.unwrap();
        assert!(outcome.is_completed());

        let detail = env.ctx.repo.get_video_detail(video.id).await.unwrap().unwrap();
        let overlay = &detail.overlays[0];
        assert_eq!(overlay.overlay_type, OverlayKind::Watermark);
        assert_eq!((overlay.x, overlay.y), (0, 0));
        assert_eq!((overlay.start_time, overlay.end_time), (0.0, 0.0));
        assert_eq!(overlay.filename.as_deref(), Some("watermarked_w1_clip.mp4"));

        let args = env.media.last_args().await;
        assert!(args.contains(&"[1:v]scale=100:-1[ovrl]; [0:v][ovrl]overlay=W-w-10:10".to_string()));
    }

    #[tokio::test]
    async fn test_watermark_missing_image() {
        let env = TestEnv::new().await;
        let video = env.seed_video("w2_clip.mp4").await;

        let outcome = process_job(&env.ctx, &WatermarkJob::new(video.id, "mark.png").into())
            .await
            .unwrap();
        let JobOutcome::Error { message } = outcome else {
            panic!("expected error outcome");
        };
        assert!(message.starts_with("Watermark image not found at "));
        assert!(message.ends_with("mark.png"));
    }
}
