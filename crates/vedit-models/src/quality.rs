//! Quality renditions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::VideoId;

/// Supported output heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum QualityPreset {
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid quality specified")]
pub struct QualityParseError;

impl QualityPreset {
    pub const ALL: [QualityPreset; 3] = [QualityPreset::P1080, QualityPreset::P720, QualityPreset::P480];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::P1080 => "1080p",
            QualityPreset::P720 => "720p",
            QualityPreset::P480 => "480p",
        }
    }

    /// Output height in pixels.
    pub fn height(&self) -> u32 {
        match self {
            QualityPreset::P1080 => 1080,
            QualityPreset::P720 => 720,
            QualityPreset::P480 => 480,
        }
    }
}

impl FromStr for QualityPreset {
    type Err = QualityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityPreset::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or(QualityParseError)
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A re-encoded rendition of a source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoQuality {
    pub id: i64,
    pub original_video_id: VideoId,
    /// Quality label, e.g. "720p"
    pub quality: String,
    pub filename: String,
    pub size: f64,
}

/// Insert payload for [`VideoQuality`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewVideoQuality {
    pub original_video_id: VideoId,
    pub quality: QualityPreset,
    pub filename: String,
    pub size: f64,
}
