//! Job status records kept in Redis.

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use vedit_models::{JobId, JobOutcome, JobRecord};

use crate::error::{QueueError, QueueResult};
use crate::queue::QueueConfig;

/// Job status records expire one day after their last update.
pub const JOB_STATUS_TTL_SECS: u64 = 24 * 60 * 60;

/// Reads and writes [`JobRecord`]s under `{prefix}:{job_id}`.
#[derive(Clone)]
pub struct JobStatusStore {
    client: redis::Client,
    prefix: String,
    ttl_secs: u64,
}

impl JobStatusStore {
    pub fn new(client: redis::Client, prefix: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            client,
            prefix: prefix.into(),
            ttl_secs,
        }
    }

    /// Store using the Redis URL, key prefix and TTL of a queue config.
    pub fn from_config(config: &QueueConfig) -> QueueResult<Self> {
        Ok(Self::new(
            redis::Client::open(config.redis_url.as_str())?,
            config.status_prefix.clone(),
            config.status_ttl_secs,
        ))
    }

    pub fn key(&self, job_id: &JobId) -> String {
        format!("{}:{}", self.prefix, job_id)
    }

    /// Store a record, refreshing its TTL.
    pub async fn put(&self, record: &JobRecord) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(record)?;
        conn.set_ex::<_, _, ()>(self.key(&record.job_id), payload, self.ttl_secs)
            .await?;
        debug!(job_id = %record.job_id, state = %record.state, "Stored job status");
        Ok(())
    }

    pub async fn get(&self, job_id: &JobId) -> QueueResult<Option<JobRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(self.key(job_id)).await?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(QueueError::from))
            .transpose()
    }

    /// Move a record to STARTED.
    pub async fn mark_started(&self, job_id: &JobId) -> QueueResult<JobRecord> {
        self.update(job_id, JobRecord::start).await
    }

    /// Move a record to SUCCESS with the handler outcome.
    pub async fn finish(&self, job_id: &JobId, outcome: JobOutcome) -> QueueResult<JobRecord> {
        self.update(job_id, |record| record.finish(outcome)).await
    }

    /// Move a record to FAILURE with an error message.
    pub async fn fail(&self, job_id: &JobId, message: impl Into<String>) -> QueueResult<JobRecord> {
        let message = message.into();
        self.update(job_id, |record| record.fail(message)).await
    }

    async fn update(
        &self,
        job_id: &JobId,
        transition: impl FnOnce(JobRecord) -> JobRecord,
    ) -> QueueResult<JobRecord> {
        let record = self
            .get(job_id)
            .await?
            .ok_or_else(|| QueueError::job_not_found(job_id.to_string()))?;
        let updated = transition(record);
        self.put(&updated).await?;
        Ok(updated)
    }
}

/// Status transitions a worker writes while running a job.
#[async_trait]
pub trait JobStatusWriter: Send + Sync {
    /// Insert or replace a record.
    async fn put(&self, record: &JobRecord) -> QueueResult<()>;

    /// Move a record to STARTED; `JobNotFound` if there is none.
    async fn mark_started(&self, job_id: &JobId) -> QueueResult<JobRecord>;

    async fn finish(&self, job_id: &JobId, outcome: JobOutcome) -> QueueResult<JobRecord>;

    async fn fail(&self, job_id: &JobId, message: String) -> QueueResult<JobRecord>;
}

#[async_trait]
impl JobStatusWriter for JobStatusStore {
    async fn put(&self, record: &JobRecord) -> QueueResult<()> {
        JobStatusStore::put(self, record).await
    }

    async fn mark_started(&self, job_id: &JobId) -> QueueResult<JobRecord> {
        JobStatusStore::mark_started(self, job_id).await
    }

    async fn finish(&self, job_id: &JobId, outcome: JobOutcome) -> QueueResult<JobRecord> {
        JobStatusStore::finish(self, job_id, outcome).await
    }

    async fn fail(&self, job_id: &JobId, message: String) -> QueueResult<JobRecord> {
        JobStatusStore::fail(self, job_id, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vedit_models::{JobKind, JobState};

    fn store() -> JobStatusStore {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = redis::Client::open(url).unwrap();
        JobStatusStore::new(client, "vedit:test:job", 60)
    }

    #[test]
    fn test_key_layout() {
        let job_id = JobId::from_string("abc-123");
        assert_eq!(store().key(&job_id), "vedit:test:job:abc-123");
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at REDIS_URL"]
    async fn test_status_lifecycle() {
        let store = store();
        let job_id = JobId::new();

        assert!(store.get(&job_id).await.unwrap().is_none());
        store.put(&JobRecord::new(job_id.clone(), JobKind::Trim)).await.unwrap();

        let started = store.mark_started(&job_id).await.unwrap();
        assert_eq!(started.state, JobState::Started);

        let done = store
            .finish(&job_id, JobOutcome::completed("trims/trimmed_a.mp4", Some(1)))
            .await
            .unwrap();
        assert_eq!(done.state, JobState::Success);

        let fetched = store.get(&job_id).await.unwrap().unwrap();
        assert_eq!(fetched.outcome, done.outcome);
    }
}
