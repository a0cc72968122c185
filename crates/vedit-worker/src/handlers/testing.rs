//! Test fixtures: a temp data dir, in-memory SQLite and a fake ffmpeg.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Mutex;

use vedit_db::{connect, DbConfig, VideoRepository};
use vedit_media::{FfmpegCommand, MediaError, MediaResult, MediaTool, VideoInfo};
use vedit_models::{MediaLayout, NewVideo, Video};

use crate::context::ProcessingContext;

/// Writes a small file at the command output instead of running ffmpeg.
pub(crate) struct FakeMedia {
    pub duration: f64,
    fail: bool,
    delay: Option<Duration>,
    commands: Mutex<Vec<Vec<String>>>,
}

impl FakeMedia {
    fn new(fail: bool) -> Self {
        Self {
            duration: 7.25,
            fail,
            delay: None,
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Arguments of the most recent ffmpeg run, empty if none ran.
    pub async fn last_args(&self) -> Vec<String> {
        self.commands.lock().await.last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl MediaTool for FakeMedia {
    async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.commands.lock().await.push(cmd.build_args());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some("Conversion failed!".to_string()),
                Some(1),
            ));
        }
        tokio::fs::write(cmd.output(), b"rendered output").await?;
        Ok(())
    }

    async fn inspect(&self, path: &Path) -> MediaResult<VideoInfo> {
        let size = tokio::fs::metadata(path).await?.len();
        Ok(VideoInfo {
            duration: self.duration,
            width: 1920,
            height: 1080,
            fps: 30.0,
            codec: "h264".to_string(),
            size,
            bitrate: 0,
        })
    }
}

pub(crate) struct TestEnv {
    pub ctx: ProcessingContext,
    pub media: Arc<FakeMedia>,
    _dir: TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_media(FakeMedia::new(false)).await
    }

    /// Environment whose ffmpeg runs always fail.
    pub async fn failing() -> Self {
        Self::with_media(FakeMedia::new(true)).await
    }

    /// Environment whose ffmpeg runs take `delay` before finishing.
    pub async fn slow(delay: Duration) -> Self {
        Self::with_media(FakeMedia {
            delay: Some(delay),
            ..FakeMedia::new(false)
        })
        .await
    }

    async fn with_media(media: FakeMedia) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = MediaLayout::new(dir.path());
        layout.ensure_dirs().unwrap();

        let pool = connect(&DbConfig::in_memory()).await.unwrap();
        let media = Arc::new(media);
        let ctx = ProcessingContext::new(layout, VideoRepository::new(pool), media.clone());

        Self {
            ctx,
            media,
            _dir: dir,
        }
    }

    pub fn layout(&self) -> &MediaLayout {
        &self.ctx.layout
    }

    pub fn write_upload(&self, filename: &str, contents: &[u8]) {
        std::fs::write(self.layout().upload_path(filename), contents).unwrap();
    }

    pub fn write_asset(&self, name: &str) {
        std::fs::write(self.layout().overlays_dir().join(name), b"asset").unwrap();
    }

    pub fn write_font(&self) {
        let font = self.layout().font_file();
        std::fs::create_dir_all(font.parent().unwrap()).unwrap();
        std::fs::write(font, b"font").unwrap();
    }

    /// Stored upload plus its video row.
    pub async fn seed_video(&self, filename: &str) -> Video {
        self.write_upload(filename, b"source video");
        self.ctx
            .repo
            .create_video(&NewVideo {
                filename: filename.to_string(),
                duration: 30.0,
                size: 12.0,
            })
            .await
            .unwrap()
    }
}
