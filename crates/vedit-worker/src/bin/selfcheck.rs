//! Pre-flight checks for a worker host: directories, ffmpeg, font,
//! database and Redis.

use anyhow::Context;

use vedit_db::{connect, DbConfig, VideoRepository};
use vedit_models::MediaLayout;
use vedit_queue::JobQueue;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let layout = MediaLayout::from_env();
    println!("vedit-selfcheck: starting with data_dir={}", layout.root().display());

    layout
        .ensure_dirs()
        .with_context(|| format!("cannot create data directories under {}", layout.root().display()))?;

    let ffmpeg = vedit_media::check_ffmpeg().context("ffmpeg not available")?;
    let ffprobe = vedit_media::check_ffprobe().context("ffprobe not available")?;
    println!("vedit-selfcheck: ffmpeg={} ffprobe={}", ffmpeg.display(), ffprobe.display());

    if !layout.font_file().exists() {
        // Text overlay jobs will fail with "Font file not found"
        println!("vedit-selfcheck: warning: font file missing at {}", layout.font_file().display());
    }

    let repo = VideoRepository::new(connect(&DbConfig::from_env()).await.context("database unavailable")?);
    repo.ping().await.context("database ping failed")?;

    let queue = JobQueue::from_env().context("invalid REDIS_URL")?;
    queue.ping().await.context("redis ping failed")?;

    println!("vedit-selfcheck: ok");
    Ok(())
}
