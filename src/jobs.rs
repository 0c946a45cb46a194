//! Running merge jobs: cancellation handles and admission control.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mergeforged_common::{Error, JobId, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct JobEntry {
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
}

/// Thread-safe registry of running merges.
///
/// Each job holds one admission permit for as long as its [`JobGuard`] lives.
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<DashMap<JobId, JobEntry>>,
    permits: Arc<Semaphore>,
    limit: usize,
}

impl JobRegistry {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            permits: Arc::new(Semaphore::new(max_concurrent)),
            limit: max_concurrent,
        }
    }

    /// Register a new job, failing with `JobLimitReached` when the registry is full.
    pub fn register(&self) -> Result<JobGuard> {
        let permit = self
            .permits
            .clone()
            .try_acquire_owned()
            .map_err(|_| Error::JobLimitReached { limit: self.limit })?;
        Ok(self.insert(permit))
    }

    /// Register a new job, waiting for a free slot.
    pub async fn register_wait(&self) -> Result<JobGuard> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::internal("job registry closed"))?;
        Ok(self.insert(permit))
    }

    fn insert(&self, permit: OwnedSemaphorePermit) -> JobGuard {
        let id = JobId::new();
        let cancel = CancellationToken::new();
        self.jobs.insert(
            id,
            JobEntry {
                cancel: cancel.clone(),
                started_at: Utc::now(),
            },
        );
        tracing::info!(job_id = %id, running = self.jobs.len(), "Registered merge job");

        JobGuard {
            id,
            cancel,
            jobs: Arc::clone(&self.jobs),
            _permit: permit,
        }
    }

    /// Cancel a running job. Its active ffmpeg process is killed.
    pub fn cancel(&self, id: &JobId) -> Result<()> {
        match self.jobs.get(id) {
            Some(entry) => {
                entry.cancel.cancel();
                tracing::info!(job_id = %id, "Cancellation requested");
                Ok(())
            }
            None => Err(Error::not_found(format!("job {id}"))),
        }
    }

    /// Cancel every running job.
    pub fn cancel_all(&self) {
        for entry in self.jobs.iter() {
            entry.cancel.cancel();
        }
    }

    /// Whether `id` has been cancelled. Unknown jobs are not cancelled.
    pub fn is_cancelled(&self, id: &JobId) -> bool {
        self.jobs
            .get(id)
            .map(|entry| entry.cancel.is_cancelled())
            .unwrap_or(false)
    }

    pub fn is_running(&self, id: &JobId) -> bool {
        self.jobs.contains_key(id)
    }

    pub fn running(&self) -> usize {
        self.jobs.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// When `id` was registered.
    pub fn started_at(&self, id: &JobId) -> Option<DateTime<Utc>> {
        self.jobs.get(id).map(|entry| entry.started_at)
    }
}

/// A registered job. Dropping it unregisters the job and frees its slot.
pub struct JobGuard {
    id: JobId,
    cancel: CancellationToken,
    jobs: Arc<DashMap<JobId, JobEntry>>,
    _permit: OwnedSemaphorePermit,
}

impl JobGuard {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// The job's cancellation token, to hand to the merge engine.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if let Some((_, entry)) = self.jobs.remove(&self.id) {
            tracing::debug!(
                job_id = %self.id,
                duration_secs = (Utc::now() - entry.started_at).num_seconds(),
                "Unregistered merge job"
            );
        }
    }
}

impl std::fmt::Debug for JobGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobGuard")
            .field("id", &self.id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
