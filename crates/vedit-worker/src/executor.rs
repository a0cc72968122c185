//! Job executor.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use vedit_models::{JobOutcome, JobRecord};
use vedit_queue::{JobQueue, JobStatusStore, JobStatusWriter, QueueError, QueueJob};

use crate::config::WorkerConfig;
use crate::context::ProcessingContext;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::process_job;
use crate::logging::JobLogger;
use crate::metrics;

/// Jobs read from the stream per XREADGROUP call, at most.
const MAX_BATCH: usize = 5;

/// How long one XREADGROUP call blocks.
const BLOCK_MS: u64 = 1000;

/// Job executor that processes jobs from the queue.
pub struct JobExecutor {
    config: WorkerConfig,
    dispatcher: Dispatcher,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

/// Stream message ids this worker is processing right now.
#[derive(Clone, Default)]
struct InFlight(Arc<Mutex<HashSet<String>>>);

impl InFlight {
    /// False if the message is already running here.
    fn insert(&self, message_id: &str) -> bool {
        self.lock().insert(message_id.to_string())
    }

    fn remove(&self, message_id: &str) {
        self.lock().remove(message_id);
    }

    fn contains(&self, message_id: &str) -> bool {
        self.lock().contains(message_id)
    }

    fn snapshot(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Spawns job tasks and acknowledges their messages.
#[derive(Clone)]
struct Dispatcher {
    runner: JobRunner,
    queue: Arc<JobQueue>,
    in_flight: InFlight,
}

impl Dispatcher {
    fn spawn(&self, permit: OwnedSemaphorePermit, message_id: String, job: QueueJob) {
        if !self.in_flight.insert(&message_id) {
            debug!("Message {} is already running on this worker", message_id);
            return;
        }

        let this = self.clone();
        tokio::spawn(async move {
            let _permit = permit;
            this.runner.execute(&job).await;

            // Failed jobs are not retried
            if let Err(e) = this.queue.ack(&message_id).await {
                error!("Failed to ack message {}: {}", message_id, e);
            }
            this.in_flight.remove(&message_id);
        });
    }
}

/// Runs one job and writes its status transitions.
#[derive(Clone)]
struct JobRunner {
    ctx: Arc<ProcessingContext>,
    status: Arc<dyn JobStatusWriter>,
    job_timeout: Duration,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(
        config: WorkerConfig,
        queue: JobQueue,
        status: JobStatusStore,
        ctx: ProcessingContext,
    ) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        let runner = JobRunner {
            ctx: Arc::new(ctx),
            status: Arc::new(status),
            job_timeout: config.job_timeout,
        };
        let dispatcher = Dispatcher {
            runner,
            queue: Arc::new(queue),
            in_flight: InFlight::default(),
        };

        Self {
            config,
            dispatcher,
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor. Returns once [`JobExecutor::shutdown`] is called
    /// and in-flight jobs have drained (or the shutdown timeout expired).
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.dispatcher.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();
        let claim_task = tokio::spawn(self.claim_loop());
        let heartbeat_task = tokio::spawn(self.heartbeat_loop());

        while !*shutdown_rx.borrow() {
            tokio::select! {
                _ = shutdown_rx.changed() => {}
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }
        info!("Shutdown signal received, stopping executor");

        claim_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!(
                "In-flight jobs still running after {:?}; they will be reclaimed by another worker",
                self.config.shutdown_timeout
            );
        }
        heartbeat_task.abort();

        info!("Job executor stopped");
        Ok(())
    }

    /// Periodically take over jobs left pending by crashed workers.
    fn claim_loop(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let dispatcher = self.dispatcher.clone();
        let semaphore = Arc::clone(&self.job_semaphore);
        let consumer_name = self.consumer_name.clone();
        let claim_interval = self.config.claim_interval;
        let min_idle_ms = self.config.claim_min_idle.as_millis() as u64;
        let mut shutdown_rx = self.shutdown.subscribe();

        async move {
            let mut interval = tokio::time::interval(claim_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        let claimed = dispatcher
                            .queue
                            .claim_pending(&consumer_name, min_idle_ms, MAX_BATCH)
                            .await;
                        match claimed {
                            Ok(jobs) => {
                                let jobs: Vec<_> = jobs
                                    .into_iter()
                                    .filter(|(message_id, _)| !dispatcher.in_flight.contains(message_id))
                                    .collect();
                                if jobs.is_empty() {
                                    continue;
                                }
                                info!("Claimed {} pending jobs", jobs.len());
                                metrics::record_jobs_claimed(jobs.len());
                                for (message_id, job) in jobs {
                                    let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                                        return;
                                    };
                                    dispatcher.spawn(permit, message_id, job);
                                }
                            }
                            Err(e) => warn!("Failed to claim pending jobs: {}", e),
                        }
                    }
                }
            }
        }
    }

    /// Keep this worker's in-flight messages from looking abandoned.
    fn heartbeat_loop(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let queue = Arc::clone(&self.dispatcher.queue);
        let in_flight = self.dispatcher.in_flight.clone();
        let consumer_name = self.consumer_name.clone();
        let every = self.config.job_heartbeat_interval;

        async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let message_ids = in_flight.snapshot();
                if message_ids.is_empty() {
                    continue;
                }
                if let Err(e) = queue.touch(&consumer_name, message_ids).await {
                    warn!("Failed to refresh in-flight jobs: {}", e);
                }
            }
        }
    }

    /// Consume and dispatch up to the number of free job slots.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .dispatcher
            .queue
            .consume(&self.consumer_name, BLOCK_MS, available.min(MAX_BATCH))
            .await?;

        if jobs.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", jobs.len());

        for (message_id, job) in jobs {
            let permit = Arc::clone(&self.job_semaphore)
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;
            self.dispatcher.spawn(permit, message_id, job);
        }

        Ok(())
    }

    async fn wait_for_jobs(&self) {
        while self.job_semaphore.available_permits() < self.config.max_concurrent_jobs {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown. Safe to call before or during [`JobExecutor::run`].
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

impl JobRunner {
    /// Run one job and record its final state.
    async fn execute(&self, job: &QueueJob) {
        let logger = JobLogger::new(job.job_id(), job.kind());
        let span = logger.create_span();

        async {
            let kind = job.kind();
            self.mark_started(job).await;
            metrics::record_job_started(kind.as_str());
            let started = Instant::now();

            let result = match tokio::time::timeout(self.job_timeout, process_job(&self.ctx, job)).await {
                Ok(result) => result,
                Err(_) => Err(WorkerError::Timeout(self.job_timeout.as_secs())),
            };
            let elapsed = started.elapsed().as_secs_f64();

            let stored = match result {
                Ok(outcome) => {
                    metrics::record_job_completed(kind.as_str(), outcome_label(&outcome), elapsed);
                    match &outcome {
                        JobOutcome::Completed { file_path, .. } => logger.log_completion(file_path),
                        JobOutcome::Error { message } => logger.log_warning(message),
                    }
                    self.status.finish(job.job_id(), outcome).await
                }
                Err(e) => {
                    metrics::record_job_failed(kind.as_str(), elapsed);
                    let message = e.status_message();
                    logger.log_error(&message);
                    self.status.fail(job.job_id(), message).await
                }
            };
            if let Err(e) = stored {
                error!("Failed to store final status: {}", e);
            }
        }
        .instrument(span)
        .await
    }

    /// A missing record means it expired or the job was queued without
    /// one; start a fresh record so the result is still visible.
    async fn mark_started(&self, job: &QueueJob) {
        match self.status.mark_started(job.job_id()).await {
            Ok(_) => {}
            Err(QueueError::JobNotFound(_)) => {
                let record = JobRecord::new(job.job_id().clone(), job.kind()).start();
                if let Err(e) = self.status.put(&record).await {
                    warn!("Failed to create status record: {}", e);
                }
            }
            Err(e) => warn!("Failed to mark job started: {}", e),
        }
    }
}

fn outcome_label(outcome: &JobOutcome) -> &'static str {
    match outcome {
        JobOutcome::Completed { .. } => "completed",
        JobOutcome::Error { .. } => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::TestEnv;
    use vedit_models::{JobId, JobKind, JobState};
    use vedit_queue::{JobBackend, MemoryJobBackend, TrimJob, UploadJob};

    fn runner(env: &TestEnv, backend: &Arc<MemoryJobBackend>, timeout: Duration) -> JobRunner {
        JobRunner {
            ctx: Arc::new(env.ctx.clone()),
            status: backend.clone(),
            job_timeout: timeout,
        }
    }

    async fn record(backend: &MemoryJobBackend, job_id: &JobId) -> JobRecord {
        backend.status(job_id).await.unwrap().unwrap()
    }

    #[test]
    fn test_outcome_label() {
        assert_eq!(outcome_label(&JobOutcome::completed("a.mp4", None)), "completed");
        assert_eq!(outcome_label(&JobOutcome::error("Original video not found")), "error");
    }

    #[test]
    fn test_in_flight_set() {
        let in_flight = InFlight::default();
        assert!(in_flight.insert("1-0"));
        assert!(!in_flight.insert("1-0"));
        assert!(in_flight.contains("1-0"));
        assert_eq!(in_flight.snapshot(), vec!["1-0".to_string()]);

        in_flight.remove("1-0");
        assert!(!in_flight.contains("1-0"));
        assert!(in_flight.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_completed_job_ends_in_success() {
        let env = TestEnv::new().await;
        let video = env.seed_video("v1_clip.mp4").await;
        let backend = Arc::new(MemoryJobBackend::new());
        let job: QueueJob = TrimJob::new(video.id, 0.0, 2.0).into();
        backend.submit(job.clone()).await.unwrap();

        runner(&env, &backend, Duration::from_secs(30)).execute(&job).await;

        let record = record(&backend, job.job_id()).await;
        assert_eq!(record.state, JobState::Success);
        assert!(record.outcome.unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_rejected_job_ends_in_success_with_error_outcome() {
        let env = TestEnv::new().await;
        let backend = Arc::new(MemoryJobBackend::new());
        let job: QueueJob = TrimJob::new(404, 0.0, 2.0).into();
        backend.submit(job.clone()).await.unwrap();

        runner(&env, &backend, Duration::from_secs(30)).execute(&job).await;

        let record = record(&backend, job.job_id()).await;
        assert_eq!(record.state, JobState::Success);
        assert_eq!(record.outcome, Some(JobOutcome::error("Original video not found")));
    }

    #[tokio::test]
    async fn test_media_failure_ends_in_failure_with_stderr() {
        let env = TestEnv::failing().await;
        let video = env.seed_video("v1_clip.mp4").await;
        let backend = Arc::new(MemoryJobBackend::new());
        let job: QueueJob = TrimJob::new(video.id, 0.0, 2.0).into();
        backend.submit(job.clone()).await.unwrap();

        runner(&env, &backend, Duration::from_secs(30)).execute(&job).await;

        let record = record(&backend, job.job_id()).await;
        assert_eq!(record.state, JobState::Failure);
        let Some(JobOutcome::Error { message }) = record.outcome else {
            panic!("expected an error outcome, got {:?}", record.outcome);
        };
        assert!(message.ends_with("Conversion failed!"), "{message}");
    }

    #[tokio::test]
    async fn test_timeout_ends_in_failure() {
        let env = TestEnv::slow(Duration::from_secs(30)).await;
        let video = env.seed_video("v1_clip.mp4").await;
        let backend = Arc::new(MemoryJobBackend::new());
        let job: QueueJob = TrimJob::new(video.id, 0.0, 2.0).into();
        backend.submit(job.clone()).await.unwrap();

        runner(&env, &backend, Duration::from_secs(1)).execute(&job).await;

        let record = record(&backend, job.job_id()).await;
        assert_eq!(record.state, JobState::Failure);
        assert_eq!(record.outcome, Some(JobOutcome::error("Job timed out after 1 seconds")));
    }

    #[tokio::test]
    async fn test_missing_status_record_is_recreated() {
        let env = TestEnv::new().await;
        env.write_upload("u1_clip.mp4", b"video bytes");
        let backend = Arc::new(MemoryJobBackend::new());
        let job: QueueJob = UploadJob::new("u1_clip.mp4").into();
        assert!(backend.status(job.job_id()).await.unwrap().is_none());

        runner(&env, &backend, Duration::from_secs(30)).execute(&job).await;

        let record = record(&backend, job.job_id()).await;
        assert_eq!(record.kind, JobKind::Upload);
        assert_eq!(record.state, JobState::Success);
        assert!(record.outcome.unwrap().is_completed());
    }
}
