//! Video editing worker.
//!
//! This crate provides:
//! - Job executor consuming the Redis stream with bounded concurrency
//! - One handler per job kind (upload, trim, overlays, watermark, quality)
//! - Job status bookkeeping and structured job logging
//! - Graceful shutdown

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod logging;
pub mod metrics;

pub use config::WorkerConfig;
pub use context::ProcessingContext;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use handlers::process_job;
pub use logging::JobLogger;
