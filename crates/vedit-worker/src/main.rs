//! Video editing worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vedit_db::{connect, DbConfig, VideoRepository};
use vedit_media::{FfmpegTool, MediaTool};
use vedit_models::MediaLayout;
use vedit_queue::{JobQueue, JobStatusStore, QueueConfig};
use vedit_worker::{metrics, JobExecutor, ProcessingContext, WorkerConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting vedit-worker");

    if let Err(e) = run().await {
        error!("Worker error: {:#}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

async fn run() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env();
    config.validate()?;
    info!("Worker config: {:?}", config);

    if let Some(port) = config.metrics_port {
        metrics::init_metrics(port)?;
        info!("Metrics exporter listening on port {}", port);
    }

    let layout = MediaLayout::from_env();
    layout.ensure_dirs()?;

    let db_config = DbConfig::from_env();
    info!("Database: {:?}", db_config);
    let repo = VideoRepository::new(connect(&db_config).await?);

    let queue_config = QueueConfig::from_env();
    let status = JobStatusStore::from_config(&queue_config)?;
    let queue = JobQueue::new(queue_config)?;

    let media: Arc<dyn MediaTool> = match config.ffmpeg_timeout {
        Some(timeout) => Arc::new(FfmpegTool::with_timeout(timeout.as_secs())),
        None => Arc::new(FfmpegTool::default()),
    };
    let ctx = ProcessingContext::new(layout, repo, media);

    let executor = Arc::new(JobExecutor::new(config, queue, status, ctx));

    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_executor.shutdown();
        }
    });

    executor.run().await?;
    Ok(())
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vedit=info,sqlx=warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
