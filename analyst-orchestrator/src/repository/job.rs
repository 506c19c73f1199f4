//! Job Repository
//!
//! In-memory job map shared between request handlers and background runs.
//! Every read and write goes through one mutex, which is never held across
//! an `.await`.

use analyst_core::domain::event::JobEvent;
use analyst_core::domain::job::{AnalysisRequest, Job, JobStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use uuid::Uuid;

/// Repository error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job {0} already finished with status {1}")]
    AlreadyTerminal(Uuid, JobStatus),
}

/// Cloneable handle to the job map
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<Mutex<HashMap<Uuid, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Job>> {
        // A panicking writer cannot leave a job half-updated, so keep serving.
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new pending job under a fresh id
    pub fn create(&self, request: AnalysisRequest) -> Job {
        let mut jobs = self.lock();

        let mut id = Uuid::new_v4();
        while jobs.contains_key(&id) {
            id = Uuid::new_v4();
        }

        let job = Job::pending(id, request);
        jobs.insert(id, job.clone());
        job
    }

    /// Snapshot of a job
    pub fn find_by_id(&self, id: Uuid) -> Option<Job> {
        self.lock().get(&id).cloned()
    }

    /// Append an event to a job's log
    ///
    /// Returns `false` without touching anything when the job is unknown.
    pub fn append_event(&self, id: Uuid, data: impl Into<String>) -> bool {
        match self.lock().get_mut(&id) {
            Some(job) => {
                job.events.push(JobEvent::now(data));
                true
            }
            None => false,
        }
    }

    /// Move a pending job to `COMPLETE`
    pub fn complete(&self, id: Uuid, result: String) -> Result<(), StoreError> {
        self.finish(id, JobStatus::Complete, result)
    }

    /// Move a pending job to `ERROR`
    pub fn fail(&self, id: Uuid, message: String) -> Result<(), StoreError> {
        self.finish(id, JobStatus::Error, message)
    }

    fn finish(&self, id: Uuid, status: JobStatus, result: String) -> Result<(), StoreError> {
        let mut jobs = self.lock();
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if job.status.is_terminal() {
            return Err(StoreError::AlreadyTerminal(id, job.status));
        }

        job.status = status;
        job.result = Some(result);
        job.completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Number of tracked jobs
    pub fn count(&self) -> usize {
        self.lock().len()
    }
}
