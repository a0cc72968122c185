//! Axum HTTP API server.
//!
//! This crate provides:
//! - Upload and editing endpoints that enqueue jobs
//! - Video listings and rendition downloads backed by SQLite
//! - Job status and result retrieval
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
