//! On-disk directory layout shared by the API and the worker.

use std::path::{Path, PathBuf};

use crate::QualityPreset;

const UPLOADS_DIR: &str = "uploads";
const TRIMS_DIR: &str = "trims";
const OUTPUTS_DIR: &str = "outputs";
const OVERLAYS_DIR: &str = "overlays";
const QUALITIES_DIR: &str = "qualities";
const DEFAULT_FONT: &str = "fonts/NotoSans-Regular.ttf";

/// Where uploaded files, rendered outputs and overlay assets live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLayout {
    root: PathBuf,
    font_file: PathBuf,
}

impl MediaLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let font_file = root.join(DEFAULT_FONT);
        Self { root, font_file }
    }

    /// Load from `VEDIT_DATA_DIR` (default: current directory) and
    /// `VEDIT_FONT_FILE`.
    pub fn from_env() -> Self {
        let root = std::env::var("VEDIT_DATA_DIR").unwrap_or_else(|_| ".".to_string());
        let layout = Self::new(root);
        match std::env::var("VEDIT_FONT_FILE") {
            Ok(font) if !font.is_empty() => layout.with_font_file(font),
            _ => layout,
        }
    }

    pub fn with_font_file(mut self, font_file: impl Into<PathBuf>) -> Self {
        self.font_file = font_file.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    pub fn trims_dir(&self) -> PathBuf {
        self.root.join(TRIMS_DIR)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join(OUTPUTS_DIR)
    }

    pub fn overlays_dir(&self) -> PathBuf {
        self.root.join(OVERLAYS_DIR)
    }

    pub fn qualities_dir(&self) -> PathBuf {
        self.root.join(QUALITIES_DIR)
    }

    pub fn font_file(&self) -> &Path {
        &self.font_file
    }

    /// Create every directory the jobs write into.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.uploads_dir(),
            self.trims_dir(),
            self.outputs_dir(),
            self.overlays_dir(),
            self.qualities_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Stored name for a freshly uploaded file.
    pub fn upload_name(upload_id: &str, original: &str) -> String {
        format!("{upload_id}_{original}")
    }

    pub fn upload_path(&self, filename: &str) -> PathBuf {
        self.uploads_dir().join(filename)
    }

    pub fn trim_path(&self, filename: &str) -> PathBuf {
        self.trims_dir().join(format!("trimmed_{filename}"))
    }

    pub fn text_overlay_path(&self, filename: &str) -> PathBuf {
        self.outputs_dir().join(format!("overlay_{filename}"))
    }

    pub fn image_overlay_path(&self, filename: &str) -> PathBuf {
        self.outputs_dir().join(format!("overlay_image_{filename}"))
    }

    pub fn video_overlay_path(&self, filename: &str) -> PathBuf {
        self.outputs_dir().join(format!("overlay_video_{filename}"))
    }

    pub fn watermark_path(&self, filename: &str) -> PathBuf {
        self.outputs_dir().join(format!("watermarked_{filename}"))
    }

    pub fn quality_path(&self, quality: QualityPreset, filename: &str) -> PathBuf {
        self.qualities_dir().join(format!("{quality}_{filename}"))
    }

    /// Overlay asset path, or `None` if the name could escape the overlays dir.
    pub fn asset_path(&self, name: &str) -> Option<PathBuf> {
        is_safe_asset_name(name).then(|| self.overlays_dir().join(name))
    }
}

/// A bare file name with no path components.
pub fn is_safe_asset_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
