//! Video records and trimmed derivatives.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Overlay, VideoQuality};

/// Primary key of a stored video.
pub type VideoId = i64;

/// An uploaded source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Video {
    pub id: VideoId,
    /// Stored file name inside the uploads directory
    pub filename: String,
    /// Duration in seconds
    pub duration: f64,
    /// File size in bytes
    pub size: f64,
    pub upload_time: DateTime<Utc>,
}

/// Insert payload for [`Video`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewVideo {
    pub filename: String,
    pub duration: f64,
    pub size: f64,
}

/// A trimmed copy of a source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrimmedVideo {
    pub id: i64,
    pub original_video_id: VideoId,
    pub filename: String,
    pub duration: f64,
    pub size: f64,
    pub upload_time: DateTime<Utc>,
}

/// Insert payload for [`TrimmedVideo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewTrimmedVideo {
    pub original_video_id: VideoId,
    pub filename: String,
    pub duration: f64,
    pub size: f64,
}

/// A video together with every artifact derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoDetail {
    #[serde(flatten)]
    pub video: Video,
    #[serde(default)]
    pub trimmed_videos: Vec<TrimmedVideo>,
    #[serde(default)]
    pub overlays: Vec<Overlay>,
    #[serde(default)]
    pub qualities: Vec<VideoQuality>,
}

impl VideoDetail {
    /// Wrap a video with no derived artifacts yet.
    pub fn new(video: Video) -> Self {
        Self {
            video,
            trimmed_videos: Vec::new(),
            overlays: Vec::new(),
            qualities: Vec::new(),
        }
    }

    /// Find the rendition recorded for a quality label.
    pub fn quality(&self, label: &str) -> Option<&VideoQuality> {
        self.qualities.iter().find(|q| q.quality == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_video() -> Video {
        Video {
            id: 7,
            filename: "abc_clip.mp4".to_string(),
            duration: 12.5,
            size: 1024.0,
            upload_time: Utc::now(),
        }
    }

    #[test]
    fn test_detail_serializes_flat() {
        let detail = VideoDetail::new(sample_video());
        let value = serde_json::to_value(&detail).unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["filename"], "abc_clip.mp4");
        assert_eq!(value["trimmed_videos"], serde_json::json!([]));
        assert_eq!(value["overlays"], serde_json::json!([]));
        assert_eq!(value["qualities"], serde_json::json!([]));
    }

    #[test]
    fn test_quality_lookup() {
        let mut detail = VideoDetail::new(sample_video());
        detail.qualities.push(VideoQuality {
            id: 1,
            original_video_id: 7,
            quality: "720p".to_string(),
            filename: "720p_abc_clip.mp4".to_string(),
            size: 512.0,
        });

        assert!(detail.quality("720p").is_some());
        assert!(detail.quality("1080p").is_none());
    }
}
