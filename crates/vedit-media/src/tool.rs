//! The media seam the worker runs jobs through.

use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::inspect::{inspect_video, VideoInfo};

/// Runs ffmpeg commands and inspects their results.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Run a command to completion.
    async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()>;

    /// Read duration, size and stream details of a file.
    async fn inspect(&self, path: &Path) -> MediaResult<VideoInfo>;
}

/// [`MediaTool`] backed by the ffmpeg and ffprobe binaries.
#[derive(Clone, Default)]
pub struct FfmpegTool {
    runner: FfmpegRunner,
}

impl FfmpegTool {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    /// Tool whose ffmpeg runs are killed after `timeout_secs`.
    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self::new(FfmpegRunner::new().with_timeout(timeout_secs))
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let output = cmd.output().display().to_string();
        self.runner
            .run_with_progress(cmd, move |progress| {
                debug!(
                    output = %output,
                    out_time = %progress.out_time,
                    speed = progress.speed,
                    done = progress.is_complete,
                    "ffmpeg progress"
                );
            })
            .await
    }

    async fn inspect(&self, path: &Path) -> MediaResult<VideoInfo> {
        inspect_video(path).await
    }
}
