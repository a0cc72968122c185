//! Text, image and video overlays.

use std::path::PathBuf;

use vedit_media::{image_overlay_command, text_overlay_command, video_overlay_command, OverlayPlacement};
use vedit_models::{JobKind, JobOutcome, NewOverlay, OverlayKind, Video};
use vedit_queue::{ImageOverlayJob, TextOverlayJob, VideoOverlayJob};

use super::{file_name, load_asset, load_video, path_string, prepare_output};
use crate::context::ProcessingContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

pub(super) async fn handle_text(ctx: &ProcessingContext, job: &TextOverlayJob) -> WorkerResult<JobOutcome> {
    let logger = JobLogger::new(&job.job_id, JobKind::TextOverlay);
    let video = load_video(ctx, job.video_id).await?;

    let font = ctx.layout.font_file();
    if !tokio::fs::try_exists(font).await? {
        logger.log_error(&format!("font missing at {}", font.display()));
        return Err(WorkerError::rejected("Font file not found"));
    }
    logger.log_start(&video.filename);

    let input = ctx.layout.upload_path(&video.filename);
    let output = ctx.layout.text_overlay_path(&video.filename);
    let placement = OverlayPlacement {
        x: job.x,
        y: job.y,
        start_time: job.start_time,
        end_time: job.end_time,
    };
    prepare_output(&output).await?;
    ctx.media
        .run(&text_overlay_command(&input, &output, &job.text, font, &placement))
        .await?;

    record(ctx, &logger, &video, OverlayKind::Text, &job.text, placement, output).await
}

pub(super) async fn handle_image(ctx: &ProcessingContext, job: &ImageOverlayJob) -> WorkerResult<JobOutcome> {
    let logger = JobLogger::new(&job.job_id, JobKind::ImageOverlay);
    let video = load_video(ctx, job.video_id).await?;
    let image = load_asset(ctx, &job.image_name, "Overlay image").await?;
    logger.log_start(&format!("{} over {}", job.image_name, video.filename));

    let input = ctx.layout.upload_path(&video.filename);
    let output = ctx.layout.image_overlay_path(&video.filename);
    let placement = OverlayPlacement {
        x: job.x,
        y: job.y,
        start_time: job.start_time,
        end_time: job.end_time,
    };
    prepare_output(&output).await?;
    ctx.media
        .run(&image_overlay_command(&input, &image, &output, &placement))
        .await?;

    record(ctx, &logger, &video, OverlayKind::Image, &job.image_name, placement, output).await
}

pub(super) async fn handle_video(ctx: &ProcessingContext, job: &VideoOverlayJob) -> WorkerResult<JobOutcome> {
    let logger = JobLogger::new(&job.job_id, JobKind::VideoOverlay);
    let video = load_video(ctx, job.video_id).await?;
    let clip = load_asset(ctx, &job.video_name, "Overlay video").await?;
    logger.log_start(&format!("{} over {}", job.video_name, video.filename));

    let input = ctx.layout.upload_path(&video.filename);
    let output = ctx.layout.video_overlay_path(&video.filename);
    let placement = OverlayPlacement {
        x: job.x,
        y: job.y,
        start_time: job.start_time,
        end_time: job.end_time,
    };
    prepare_output(&output).await?;
    ctx.media
        .run(&video_overlay_command(&input, &clip, &output, &placement))
        .await?;

    record(ctx, &logger, &video, OverlayKind::Video, &job.video_name, placement, output).await
}

async fn record(
    ctx: &ProcessingContext,
    logger: &JobLogger,
    video: &Video,
    kind: OverlayKind,
    content: &str,
    placement: OverlayPlacement,
    output: PathBuf,
) -> WorkerResult<JobOutcome> {
    let overlay = ctx
        .repo
        .create_overlay(&NewOverlay {
            video_id: video.id,
            overlay_type: kind,
            content: content.to_string(),
            x: placement.x,
            y: placement.y,
            start_time: placement.start_time,
            end_time: placement.end_time,
            filename: Some(file_name(&output)),
        })
        .await?;

    logger.log_completion(&format!("{} overlay {}", kind, overlay.id));
    Ok(JobOutcome::completed(path_string(&output), Some(overlay.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::process_job;
    use crate::handlers::testing::TestEnv;

    #[tokio::test]
    async fn test_text_overlay_inserts_overlay() {
        let env = TestEnv::new().await;
        env.write_font();
        let video = env.seed_video("v1_talk.mp4").await;

        let job = TextOverlayJob::new(video.id, "Hello: world", 10, 20, 1.0, 3.0);
        let outcome = handle_text(&env.ctx, &job).await.unwrap();
        assert!(outcome.is_completed());

        let detail = env.ctx.repo.get_video_detail(video.id).await.unwrap().unwrap();
        let overlay = &detail.overlays[0];
        assert_eq!(overlay.overlay_type, OverlayKind::Text);
        assert_eq!(overlay.content, "Hello: world");
        assert_eq!((overlay.x, overlay.y), (10, 20));
        assert_eq!((overlay.start_time, overlay.end_time), (1.0, 3.0));
        assert_eq!(overlay.filename.as_deref(), Some("overlay_v1_talk.mp4"));

        let args = env.media.last_args().await;
        let filter = args.iter().position(|a| a == "-vf").map(|i| &args[i + 1]).unwrap();
        assert!(filter.starts_with(r"drawtext=text=Hello\\:\\\ world:x=10:y=20"));
        assert!(filter.ends_with("enable='between(t,1,3)'"));
    }

    #[tokio::test]
    async fn test_text_overlay_without_font() {
        let env = TestEnv::new().await;
        let video = env.seed_video("v2_talk.mp4").await;

        let job = TextOverlayJob::new(video.id, "Hi", 0, 0, 0.0, 1.0);
        let outcome = process_job(&env.ctx, &job.into()).await.unwrap();
        assert_eq!(outcome, JobOutcome::error("Font file not found"));
    }

    #[tokio::test]
    async fn test_image_overlay_inserts_overlay() {
        let env = TestEnv::new().await;
        env.write_asset("logo.png");
        let video = env.seed_video("v3_clip.mp4").await;

        let job = ImageOverlayJob::new(video.id, "logo.png", 5, 6, 0.0, 2.5);
        let outcome = handle_image(&env.ctx, &job).await.unwrap();
        assert!(outcome.is_completed());

        let detail = env.ctx.repo.get_video_detail(video.id).await.unwrap().unwrap();
        assert_eq!(detail.overlays[0].overlay_type, OverlayKind::Image);
        assert_eq!(detail.overlays[0].content, "logo.png");
        assert_eq!(detail.overlays[0].filename.as_deref(), Some("overlay_image_v3_clip.mp4"));

        let args = env.media.last_args().await;
        assert!(args.iter().any(|a| a.ends_with("overlays/logo.png")));
        assert!(args.contains(&"[1:v]scale=100:-1[ovrl]; [0:v][ovrl]overlay=5:6:enable='between(t,0,2.5)'".to_string()));
    }

    #[tokio::test]
    async fn test_image_overlay_missing_asset() {
        let env = TestEnv::new().await;
        let video = env.seed_video("v4_clip.mp4").await;

        let job = ImageOverlayJob::new(video.id, "absent.png", 0, 0, 0.0, 1.0);
        let outcome = process_job(&env.ctx, &job.into()).await.unwrap();
        let expected = format!(
            "Overlay image not found at {}",
            env.layout().overlays_dir().join("absent.png").display()
        );
        assert_eq!(outcome, JobOutcome::error(expected));
    }

    #[tokio::test]
    async fn test_video_overlay_rejects_traversal() {
        let env = TestEnv::new().await;
        let video = env.seed_video("v5_clip.mp4").await;

        let job = VideoOverlayJob::new(video.id, "../uploads/v5_clip.mp4", 0, 0, 0.0, 1.0);
        let outcome = process_job(&env.ctx, &job.into()).await.unwrap();
        assert_eq!(outcome, JobOutcome::error("Invalid asset name"));
        assert!(env.media.last_args().await.is_empty());
    }

    #[tokio::test]
    async fn test_video_overlay_inserts_overlay() {
        let env = TestEnv::new().await;
        env.write_asset("pip.mp4");
        let video = env.seed_video("v6_clip.mp4").await;

        let job = VideoOverlayJob::new(video.id, "pip.mp4", 40, 50, 2.0, 6.0);
        let outcome = handle_video(&env.ctx, &job).await.unwrap();

        let JobOutcome::Completed { file_path, .. } = outcome else {
            panic!("expected completed outcome");
        };
        assert!(file_path.ends_with("outputs/overlay_video_v6_clip.mp4"));
        let detail = env.ctx.repo.get_video_detail(video.id).await.unwrap().unwrap();
        assert_eq!(detail.overlays[0].overlay_type, OverlayKind::Video);
    }

    #[tokio::test]
    async fn test_overlay_missing_video() {
        let env = TestEnv::new().await;
        env.write_asset("logo.png");

        let job = ImageOverlayJob::new(42, "logo.png", 0, 0, 0.0, 1.0);
        let outcome = process_job(&env.ctx, &job.into()).await.unwrap();
        assert_eq!(outcome, JobOutcome::error("Original video not found"));
    }
}
