//! Job types for the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vedit_models::{JobId, JobKind, QualityPreset, VideoId};

/// Job to inspect an uploaded file and record it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadJob {
    pub job_id: JobId,
    /// Stored file name (`{uuid}_{original}`) inside the uploads directory
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

impl UploadJob {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            filename: filename.into(),
            created_at: Utc::now(),
        }
    }
}

/// Job to cut a time window out of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimJob {
    pub job_id: JobId,
    pub video_id: VideoId,
    pub start_time: f64,
    pub end_time: f64,
    pub created_at: DateTime<Utc>,
}

impl TrimJob {
    pub fn new(video_id: VideoId, start_time: f64, end_time: f64) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            start_time,
            end_time,
            created_at: Utc::now(),
        }
    }
}

/// Job to draw text over a video for a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlayJob {
    pub job_id: JobId,
    pub video_id: VideoId,
    pub text: String,
    pub x: i64,
    pub y: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub created_at: DateTime<Utc>,
}

impl TextOverlayJob {
    pub fn new(video_id: VideoId, text: impl Into<String>, x: i64, y: i64, start_time: f64, end_time: f64) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            text: text.into(),
            x,
            y,
            start_time,
            end_time,
            created_at: Utc::now(),
        }
    }
}

/// Job to composite an image asset over a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOverlayJob {
    pub job_id: JobId,
    pub video_id: VideoId,
    /// File name inside the overlays directory
    pub image_name: String,
    pub x: i64,
    pub y: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub created_at: DateTime<Utc>,
}

impl ImageOverlayJob {
    pub fn new(
        video_id: VideoId,
        image_name: impl Into<String>,
        x: i64,
        y: i64,
        start_time: f64,
        end_time: f64,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            image_name: image_name.into(),
            x,
            y,
            start_time,
            end_time,
            created_at: Utc::now(),
        }
    }
}

/// Job to composite a video asset over a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoOverlayJob {
    pub job_id: JobId,
    pub video_id: VideoId,
    /// File name inside the overlays directory
    pub video_name: String,
    pub x: i64,
    pub y: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub created_at: DateTime<Utc>,
}

impl VideoOverlayJob {
    pub fn new(
        video_id: VideoId,
        video_name: impl Into<String>,
        x: i64,
        y: i64,
        start_time: f64,
        end_time: f64,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            video_name: video_name.into(),
            x,
            y,
            start_time,
            end_time,
            created_at: Utc::now(),
        }
    }
}

/// Job to stamp a watermark in the top-right corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkJob {
    pub job_id: JobId,
    pub video_id: VideoId,
    pub image_name: String,
    pub created_at: DateTime<Utc>,
}

impl WatermarkJob {
    pub fn new(video_id: VideoId, image_name: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            image_name: image_name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Job to render a lower-resolution copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityJob {
    pub job_id: JobId,
    pub video_id: VideoId,
    pub quality: QualityPreset,
    pub created_at: DateTime<Utc>,
}

impl QualityJob {
    pub fn new(video_id: VideoId, quality: QualityPreset) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            quality,
            created_at: Utc::now(),
        }
    }
}

/// Generic job wrapper for queue storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueJob {
    Upload(UploadJob),
    Trim(TrimJob),
    TextOverlay(TextOverlayJob),
    ImageOverlay(ImageOverlayJob),
    VideoOverlay(VideoOverlayJob),
    Watermark(WatermarkJob),
    Quality(QualityJob),
}

impl QueueJob {
    pub fn job_id(&self) -> &JobId {
        match self {
            QueueJob::Upload(j) => &j.job_id,
            QueueJob::Trim(j) => &j.job_id,
            QueueJob::TextOverlay(j) => &j.job_id,
            QueueJob::ImageOverlay(j) => &j.job_id,
            QueueJob::VideoOverlay(j) => &j.job_id,
            QueueJob::Watermark(j) => &j.job_id,
            QueueJob::Quality(j) => &j.job_id,
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            QueueJob::Upload(_) => JobKind::Upload,
            QueueJob::Trim(_) => JobKind::Trim,
            QueueJob::TextOverlay(_) => JobKind::TextOverlay,
            QueueJob::ImageOverlay(_) => JobKind::ImageOverlay,
            QueueJob::VideoOverlay(_) => JobKind::VideoOverlay,
            QueueJob::Watermark(_) => JobKind::Watermark,
            QueueJob::Quality(_) => JobKind::Quality,
        }
    }

    /// Source video, for every job except uploads.
    pub fn video_id(&self) -> Option<VideoId> {
        match self {
            QueueJob::Upload(_) => None,
            QueueJob::Trim(j) => Some(j.video_id),
            QueueJob::TextOverlay(j) => Some(j.video_id),
            QueueJob::ImageOverlay(j) => Some(j.video_id),
            QueueJob::VideoOverlay(j) => Some(j.video_id),
            QueueJob::Watermark(j) => Some(j.video_id),
            QueueJob::Quality(j) => Some(j.video_id),
        }
    }
}

impl From<UploadJob> for QueueJob {
    fn from(job: UploadJob) -> Self {
        QueueJob::Upload(job)
    }
}

impl From<TrimJob> for QueueJob {
    fn from(job: TrimJob) -> Self {
        QueueJob::Trim(job)
    }
}

impl From<TextOverlayJob> for QueueJob {
    fn from(job: TextOverlayJob) -> Self {
        QueueJob::TextOverlay(job)
    }
}

impl From<ImageOverlayJob> for QueueJob {
    fn from(job: ImageOverlayJob) -> Self {
        QueueJob::ImageOverlay(job)
    }
}

impl From<VideoOverlayJob> for QueueJob {
    fn from(job: VideoOverlayJob) -> Self {
        QueueJob::VideoOverlay(job)
    }
}

impl From<WatermarkJob> for QueueJob {
    fn from(job: WatermarkJob) -> Self {
        QueueJob::Watermark(job)
    }
}

impl From<QualityJob> for QueueJob {
    fn from(job: QualityJob) -> Self {
        QueueJob::Quality(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_job_tagged_wire_format() {
        let job: QueueJob = QualityJob::new(3, QualityPreset::P720).into();
        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(value["type"], "quality");
        assert_eq!(value["video_id"], 3);
        assert_eq!(value["quality"], "720p");
        assert_eq!(value["job_id"], job.job_id().as_str());
    }

    #[test]
    fn queue_job_text_overlay_decodes() {
        let job: QueueJob = TextOverlayJob::new(9, "Hello", 5, 6, 0.5, 2.0).into();
        let json = serde_json::to_string(&job).unwrap();
        let decoded: QueueJob = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, job);
        assert_eq!(decoded.kind(), JobKind::TextOverlay);
        assert_eq!(decoded.video_id(), Some(9));
    }

    #[test]
    fn upload_job_has_no_video() {
        let job: QueueJob = UploadJob::new("a_b.mp4").into();
        assert_eq!(job.kind(), JobKind::Upload);
        assert_eq!(job.video_id(), None);
    }

    #[test]
    fn unknown_quality_rejected_on_decode() {
        let json = r#"{"type":"quality","job_id":"x","video_id":1,"quality":"4k","created_at":"2024-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<QueueJob>(json).is_err());
    }
}
