//! Shared dependencies of the job handlers.

use std::sync::Arc;

use vedit_db::VideoRepository;
use vedit_media::MediaTool;
use vedit_models::MediaLayout;

/// Everything a handler needs: where files live, where records go, and
/// how to run ffmpeg.
#[derive(Clone)]
pub struct ProcessingContext {
    pub layout: MediaLayout,
    pub repo: VideoRepository,
    pub media: Arc<dyn MediaTool>,
}

impl ProcessingContext {
    pub fn new(layout: MediaLayout, repo: VideoRepository, media: Arc<dyn MediaTool>) -> Self {
        Self { layout, repo, media }
    }
}
