//! Overlay records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::VideoId;

/// What was composited onto the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Text,
    Image,
    Video,
    Watermark,
}

impl OverlayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlayKind::Text => "text",
            OverlayKind::Image => "image",
            OverlayKind::Video => "video",
            OverlayKind::Watermark => "watermark",
        }
    }
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OverlayKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OverlayKind::Text),
            "image" => Ok(OverlayKind::Image),
            "video" => Ok(OverlayKind::Video),
            "watermark" => Ok(OverlayKind::Watermark),
            other => Err(format!("unknown overlay type: {other}")),
        }
    }
}

/// A stored overlay operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Overlay {
    pub id: i64,
    pub video_id: VideoId,
    pub overlay_type: OverlayKind,
    /// Overlay text, or the asset name for image/video/watermark overlays
    pub content: String,
    pub x: i64,
    pub y: i64,
    pub start_time: f64,
    pub end_time: f64,
    /// Rendered output file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Insert payload for [`Overlay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewOverlay {
    pub video_id: VideoId,
    pub overlay_type: OverlayKind,
    pub content: String,
    pub x: i64,
    pub y: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub filename: Option<String>,
}

impl NewOverlay {
    /// Watermarks are pinned to the top-right corner for the whole clip.
    pub fn watermark(video_id: VideoId, image_name: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            video_id,
            overlay_type: OverlayKind::Watermark,
            content: image_name.into(),
            x: 0,
            y: 0,
            start_time: 0.0,
            end_time: 0.0,
            filename: Some(filename.into()),
        }
    }
}
