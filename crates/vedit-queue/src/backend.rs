//! Job submission and status lookup as seen by the API.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use vedit_models::{JobId, JobOutcome, JobRecord};

use crate::error::{QueueError, QueueResult};
use crate::job::QueueJob;
use crate::queue::{JobQueue, QueueConfig};
use crate::status::{JobStatusStore, JobStatusWriter};

/// Where the API hands jobs off and reads their status back.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Record the job as PENDING and queue it for a worker.
    async fn submit(&self, job: QueueJob) -> QueueResult<JobId>;

    /// Current status record, or `None` for unknown or expired jobs.
    async fn status(&self, job_id: &JobId) -> QueueResult<Option<JobRecord>>;

    /// Check the backend is reachable.
    async fn ping(&self) -> QueueResult<()>;
}

/// Redis stream queue plus Redis status keys.
#[derive(Clone)]
pub struct RedisJobBackend {
    queue: Arc<JobQueue>,
    status: JobStatusStore,
}

impl RedisJobBackend {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let status = JobStatusStore::from_config(&config)?;
        let queue = Arc::new(JobQueue::new(config)?);
        Ok(Self { queue, status })
    }
}

#[async_trait]
impl JobBackend for RedisJobBackend {
    async fn submit(&self, job: QueueJob) -> QueueResult<JobId> {
        let job_id = job.job_id().clone();
        self.status
            .put(&JobRecord::new(job_id.clone(), job.kind()))
            .await?;

        if let Err(e) = self.queue.enqueue(&job).await {
            warn!(job_id = %job_id, error = %e, "Enqueue failed, marking job as failed");
            self.status.fail(&job_id, e.to_string()).await.ok();
            return Err(e);
        }

        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> QueueResult<Option<JobRecord>> {
        self.status.get(job_id).await
    }

    async fn ping(&self) -> QueueResult<()> {
        self.queue.ping().await
    }
}

/// In-process backend: jobs are recorded but never executed.
///
/// Tests drive status transitions through [`MemoryJobBackend::update`].
#[derive(Default)]
pub struct MemoryJobBackend {
    records: Mutex<HashMap<JobId, JobRecord>>,
    submitted: Mutex<Vec<QueueJob>>,
}

impl MemoryJobBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs submitted so far, oldest first.
    pub async fn submitted(&self) -> Vec<QueueJob> {
        self.submitted.lock().await.clone()
    }

    /// Insert or replace a status record.
    pub async fn put(&self, record: JobRecord) {
        self.records.lock().await.insert(record.job_id.clone(), record);
    }

    /// Apply a transition to an existing record.
    pub async fn update(
        &self,
        job_id: &JobId,
        transition: impl FnOnce(JobRecord) -> JobRecord + Send,
    ) -> Option<JobRecord> {
        let mut records = self.records.lock().await;
        let record = records.remove(job_id)?;
        let updated = transition(record);
        records.insert(job_id.clone(), updated.clone());
        Some(updated)
    }
}

#[async_trait]
impl JobBackend for MemoryJobBackend {
    async fn submit(&self, job: QueueJob) -> QueueResult<JobId> {
        let job_id = job.job_id().clone();
        self.put(JobRecord::new(job_id.clone(), job.kind())).await;
        self.submitted.lock().await.push(job);
        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> QueueResult<Option<JobRecord>> {
        Ok(self.records.lock().await.get(job_id).cloned())
    }

    async fn ping(&self) -> QueueResult<()> {
        Ok(())
    }
}

#[async_trait]
impl JobStatusWriter for MemoryJobBackend {
    async fn put(&self, record: &JobRecord) -> QueueResult<()> {
        MemoryJobBackend::put(self, record.clone()).await;
        Ok(())
    }

    async fn mark_started(&self, job_id: &JobId) -> QueueResult<JobRecord> {
        self.transition(job_id, JobRecord::start).await
    }

    async fn finish(&self, job_id: &JobId, outcome: JobOutcome) -> QueueResult<JobRecord> {
        self.transition(job_id, |record| record.finish(outcome)).await
    }

    async fn fail(&self, job_id: &JobId, message: String) -> QueueResult<JobRecord> {
        self.transition(job_id, |record| record.fail(message)).await
    }
}

impl MemoryJobBackend {
    async fn transition(
        &self,
        job_id: &JobId,
        transition: impl FnOnce(JobRecord) -> JobRecord + Send,
    ) -> QueueResult<JobRecord> {
        self.update(job_id, transition)
            .await
            .ok_or_else(|| QueueError::job_not_found(job_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::TrimJob;
    use vedit_models::{JobKind, JobOutcome, JobState};

    #[tokio::test]
    async fn test_memory_backend_submit_records_pending() {
        let backend = MemoryJobBackend::new();
        let job: QueueJob = TrimJob::new(1, 0.0, 1.0).into();
        let job_id = backend.submit(job.clone()).await.unwrap();

        let record = backend.status(&job_id).await.unwrap().unwrap();
        assert_eq!(record.state, JobState::Pending);
        assert_eq!(record.kind, JobKind::Trim);
        assert_eq!(backend.submitted().await, vec![job]);
    }

    #[tokio::test]
    async fn test_memory_backend_update() {
        let backend = MemoryJobBackend::new();
        let job_id = backend.submit(TrimJob::new(1, 0.0, 1.0).into()).await.unwrap();

        let updated = backend
            .update(&job_id, |r| r.start().finish(JobOutcome::error("Original video not found")))
            .await
            .unwrap();
        assert_eq!(updated.state, JobState::Success);

        assert!(backend.update(&JobId::new(), JobRecord::start).await.is_none());
        assert!(backend.status(&JobId::new()).await.unwrap().is_none());
        tokio_test::assert_ok!(backend.ping().await);
    }

    #[tokio::test]
    async fn test_memory_backend_status_writer() {
        let backend = MemoryJobBackend::new();
        let job_id = backend.submit(TrimJob::new(1, 0.0, 1.0).into()).await.unwrap();

        let started = JobStatusWriter::mark_started(&backend, &job_id).await.unwrap();
        assert_eq!(started.state, JobState::Started);
        let failed = JobStatusWriter::fail(&backend, &job_id, "boom".to_string()).await.unwrap();
        assert_eq!(failed.state, JobState::Failure);

        let missing = JobStatusWriter::mark_started(&backend, &JobId::new()).await;
        assert!(matches!(missing, Err(QueueError::JobNotFound(_))));
    }
}
