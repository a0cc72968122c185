//! Redis Streams job queue and job status tracking.
//!
//! This crate provides:
//! - Job payloads for every editing operation
//! - Enqueue/consume/ack over a Redis Stream consumer group
//! - Job status records with a TTL in Redis
//! - The [`JobBackend`] seam used by the API, with Redis and in-memory implementations

pub mod backend;
pub mod error;
pub mod job;
pub mod queue;
pub mod status;

pub use backend::{JobBackend, MemoryJobBackend, RedisJobBackend};
pub use error::{QueueError, QueueResult};
pub use job::{
    ImageOverlayJob, QualityJob, QueueJob, TextOverlayJob, TrimJob, UploadJob, VideoOverlayJob,
    WatermarkJob,
};
pub use queue::{JobQueue, QueueConfig};
pub use status::{JobStatusStore, JobStatusWriter, JOB_STATUS_TTL_SECS};
