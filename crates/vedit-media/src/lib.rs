//! FFmpeg CLI wrapper for video editing.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - FFprobe metadata extraction
//! - Filter builders for trims, overlays, watermarks and renditions
//! - The [`MediaTool`] seam the worker runs jobs through

pub mod command;
pub mod error;
pub mod filters;
pub mod inspect;
pub mod progress;
pub mod tool;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use filters::{
    image_overlay_command, quality_command, text_overlay_command, trim_command,
    video_overlay_command, watermark_command, OverlayPlacement,
};
pub use inspect::{inspect_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use tool::{FfmpegTool, MediaTool};
