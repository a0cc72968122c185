//! Shared data models for the vedit backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video records and the artifacts derived from them
//! - Job identifiers, states and outcomes
//! - Quality presets and overlay kinds
//! - The on-disk media directory layout shared by API and worker

pub mod job;
pub mod layout;
pub mod overlay;
pub mod quality;
pub mod video;

// Re-export common types
pub use job::{JobId, JobKind, JobOutcome, JobRecord, JobState};
pub use layout::{is_safe_asset_name, MediaLayout};
pub use overlay::{NewOverlay, Overlay, OverlayKind};
pub use quality::{NewVideoQuality, QualityParseError, QualityPreset, VideoQuality};
pub use video::{NewTrimmedVideo, NewVideo, TrimmedVideo, Video, VideoDetail, VideoId};
