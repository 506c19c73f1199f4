//! Job Service
//!
//! Tracks analysis jobs from submission to a terminal status. Submissions
//! return at once; the crew runs on a background task that is the only
//! writer of its job's status and result.

use analyst_core::domain::job::{AnalysisRequest, Job, JobStatus};
use analyst_core::dto::job::AnalyzeRequest;
use analyst_core::dto::webhook::WebhookPayload;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::repository::JobStore;
use crate::service::crew::{CrewError, CrewRunner, EventLog};
use crate::service::notify::Notifier;

pub const DEFAULT_MAX_PARALLEL_JOBS: usize = 4;

/// Service error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    ValidationError(String),
    NotFound(Uuid),
}

/// Owns the job map and launches crew runs
#[derive(Clone)]
pub struct JobTracker {
    store: JobStore,
    runner: Arc<dyn CrewRunner>,
    notifier: Arc<dyn Notifier>,
    permits: Arc<Semaphore>,
    job_timeout: Option<Duration>,
}

impl JobTracker {
    pub fn new(store: JobStore, runner: Arc<dyn CrewRunner>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            runner,
            notifier,
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_PARALLEL_JOBS)),
            job_timeout: None,
        }
    }

    /// Caps how many crew runs execute at once; extra jobs wait as `PENDING`
    pub fn with_max_parallel_jobs(mut self, max: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    /// Abandons crew runs that exceed `timeout`
    pub fn with_job_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Accept a request and start the analysis in the background
    ///
    /// Returns the new job id without waiting for the crew.
    pub fn submit(&self, req: AnalyzeRequest) -> Result<Uuid, JobError> {
        let request = req.validate().map_err(|msg| {
            warn!("Rejected analyze request: {}", msg);
            JobError::ValidationError(msg)
        })?;

        let job = self.store.create(request.clone());
        info!(
            "Job created with ID {} for company {} and url {:?}",
            job.id, request.company, request.url
        );

        let tracker = self.clone();
        let job_id = job.id;
        tokio::spawn(async move {
            tracker.run_analysis(job_id, request).await;
        });

        debug!("Analysis task started for job {}", job_id);
        Ok(job_id)
    }

    /// Snapshot of a job
    pub fn get_status(&self, job_id: Uuid) -> Result<Job, JobError> {
        self.store
            .find_by_id(job_id)
            .ok_or(JobError::NotFound(job_id))
    }

    /// Best-effort append to a job's event log
    pub fn append_event(&self, job_id: Uuid, data: impl Into<String>) {
        let data = data.into();
        if self.store.append_event(job_id, data.as_str()) {
            debug!("Event appended to job {}: {}", job_id, data);
        } else {
            debug!("Dropping event for unknown job {}", job_id);
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    async fn run_analysis(&self, job_id: Uuid, request: AnalysisRequest) {
        let permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.record_failure(job_id, "worker pool is shut down".to_string());
                return;
            }
        };

        debug!(
            "Starting analysis for job {} with company {} and url {:?}",
            job_id, request.company, request.url
        );

        let outcome = self.invoke_crew(job_id, &request).await;
        // The webhook call must not occupy a crew slot.
        drop(permit);

        let payload = match outcome {
            Ok(result) => {
                match self.store.complete(job_id, result.clone()) {
                    Ok(()) => info!("Analysis complete for job {}", job_id),
                    Err(e) => warn!("Could not record result: {}", e),
                }
                WebhookPayload::new(job_id, &request, JobStatus::Complete, Some(result))
            }
            Err(message) => {
                self.record_failure(job_id, message.clone());
                WebhookPayload::new(job_id, &request, JobStatus::Error, Some(message))
            }
        };

        if let Err(e) = self.notifier.notify(&payload).await {
            warn!("Failed to notify webhook for job {}: {}", job_id, e);
        }
    }

    /// Run the crew on its own task so a panic inside it still ends the job
    async fn invoke_crew(&self, job_id: Uuid, request: &AnalysisRequest) -> Result<String, String> {
        let runner = self.runner.clone();
        let events = EventLog::new(self.store.clone(), job_id);
        let inputs = request.clone();

        let mut handle =
            tokio::spawn(async move { runner.kickoff(job_id, &inputs, events).await });

        let joined = match self.job_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    return Err(CrewError::TimedOut(limit).to_string());
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) if e.is_panic() => Err("crew run panicked".to_string()),
            Err(e) => Err(format!("crew run was aborted: {}", e)),
        }
    }

    fn record_failure(&self, job_id: Uuid, message: String) {
        if let Err(e) = self.store.fail(job_id, message.clone()) {
            warn!("Could not record failure: {}", e);
        }
        self.append_event(job_id, format!("An error occurred: {}", message));
        error!(
            "An error occurred during analysis for job {}: {}",
            job_id, message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::notify::{NoopNotifier, NotifyError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Runner whose outcome is picked from the company name, optionally
    /// held back until `release` is notified
    struct ScriptedRunner {
        release: Option<Arc<Notify>>,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedRunner {
        fn immediate() -> Self {
            Self {
                release: None,
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        fn gated(release: Arc<Notify>) -> Self {
            Self {
                release: Some(release),
                ..Self::immediate()
            }
        }
    }

    #[async_trait]
    impl CrewRunner for ScriptedRunner {
        async fn kickoff(
            &self,
            _job_id: Uuid,
            request: &AnalysisRequest,
            events: EventLog,
        ) -> Result<String, CrewError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if let Some(release) = &self.release {
                release.notified().await;
            }
            self.running.fetch_sub(1, Ordering::SeqCst);

            match request.company.as_str() {
                "fail" => Err(CrewError::Status {
                    status: 500,
                    body: "model overloaded".to_string(),
                }),
                "panic" => panic!("crew blew up"),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok("never".to_string())
                }
                "chatty" => {
                    events.append("E1");
                    events.append("E2");
                    Ok("done".to_string())
                }
                company => Ok(format!("{{\"company\": \"{}\"}}", company)),
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<WebhookPayload>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, payload: &WebhookPayload) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push(payload.clone());
            if self.fail {
                return Err(NotifyError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    /// Notifier that never returns until `release` is notified
    struct StalledNotifier {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl Notifier for StalledNotifier {
        async fn notify(&self, _payload: &WebhookPayload) -> Result<(), NotifyError> {
            self.release.notified().await;
            Ok(())
        }
    }

    fn tracker(runner: ScriptedRunner) -> JobTracker {
        JobTracker::new(JobStore::new(), Arc::new(runner), Arc::new(NoopNotifier))
    }

    async fn wait_terminal(tracker: &JobTracker, id: Uuid) -> Job {
        for _ in 0..500 {
            let job = tracker.get_status(id).unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never finished", id);
    }

    #[tokio::test]
    async fn test_submit_returns_pending_job() {
        let release = Arc::new(Notify::new());
        let tracker = tracker(ScriptedRunner::gated(release.clone()));

        let id = tracker.submit(AnalyzeRequest::new("Acme", None)).unwrap();

        let job = tracker.get_status(id).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.result.is_none());
        assert!(job.events.is_empty());

        release.notify_one();
        assert_eq!(wait_terminal(&tracker, id).await.status, JobStatus::Complete);
    }

    #[tokio::test]
    async fn test_submit_rejects_missing_company() {
        let tracker = tracker(ScriptedRunner::immediate());

        let err = tracker.submit(AnalyzeRequest::default()).unwrap_err();
        assert_eq!(
            err,
            JobError::ValidationError("Company name is required".to_string())
        );
        assert!(tracker.submit(AnalyzeRequest::new("", None)).is_err());
        assert_eq!(tracker.store().count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_job_not_found() {
        let tracker = tracker(ScriptedRunner::immediate());
        let id = Uuid::new_v4();
        assert_eq!(tracker.get_status(id).unwrap_err(), JobError::NotFound(id));
    }

    #[tokio::test]
    async fn test_success_sets_complete() {
        let tracker = tracker(ScriptedRunner::immediate());
        let id = tracker.submit(AnalyzeRequest::new("Acme", None)).unwrap();

        let job = wait_terminal(&tracker, id).await;
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.result.as_deref(), Some("{\"company\": \"Acme\"}"));
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_failure_sets_error_and_logs_event() {
        let tracker = tracker(ScriptedRunner::immediate());
        let id = tracker.submit(AnalyzeRequest::new("fail", None)).unwrap();

        let job = wait_terminal(&tracker, id).await;
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.result.as_deref().unwrap().contains("model overloaded"));
        assert_eq!(job.events.len(), 1);
        assert!(job.events[0].data.starts_with("An error occurred:"));
        assert!(job.events[0].data.contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_runner_panic_is_contained() {
        let tracker = tracker(ScriptedRunner::immediate());
        let id = tracker.submit(AnalyzeRequest::new("panic", None)).unwrap();

        let job = wait_terminal(&tracker, id).await;
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.result.as_deref(), Some("crew run panicked"));

        // The tracker keeps serving after a panicking run.
        let next = tracker.submit(AnalyzeRequest::new("Acme", None)).unwrap();
        assert_eq!(wait_terminal(&tracker, next).await.status, JobStatus::Complete);
    }

    #[tokio::test]
    async fn test_timeout_fails_job() {
        let tracker = tracker(ScriptedRunner::immediate())
            .with_job_timeout(Some(Duration::from_millis(50)));
        let id = tracker.submit(AnalyzeRequest::new("slow", None)).unwrap();

        let job = wait_terminal(&tracker, id).await;
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.result.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_runner_events_keep_order() {
        let tracker = tracker(ScriptedRunner::immediate());
        let id = tracker.submit(AnalyzeRequest::new("chatty", None)).unwrap();

        let job = wait_terminal(&tracker, id).await;
        let data: Vec<_> = job.events.iter().map(|e| e.data.as_str()).collect();
        assert_eq!(data, vec!["E1", "E2"]);
    }

    #[tokio::test]
    async fn test_jobs_keep_their_own_outcome() {
        let tracker = tracker(ScriptedRunner::immediate());
        let ok = tracker.submit(AnalyzeRequest::new("Acme", None)).unwrap();
        let bad = tracker.submit(AnalyzeRequest::new("fail", None)).unwrap();
        assert_ne!(ok, bad);

        let ok_job = wait_terminal(&tracker, ok).await;
        let bad_job = wait_terminal(&tracker, bad).await;

        assert_eq!(ok_job.status, JobStatus::Complete);
        assert_eq!(ok_job.result.as_deref(), Some("{\"company\": \"Acme\"}"));
        assert!(ok_job.events.is_empty());
        assert_eq!(bad_job.status, JobStatus::Error);
        assert!(bad_job.result.as_deref().unwrap().contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_terminal_reads_are_stable() {
        let tracker = tracker(ScriptedRunner::immediate());
        let id = tracker.submit(AnalyzeRequest::new("Acme", None)).unwrap();

        let first = wait_terminal(&tracker, id).await;
        for _ in 0..5 {
            let again = tracker.get_status(id).unwrap();
            assert_eq!(again.status, first.status);
            assert_eq!(again.result, first.result);
        }
    }

    #[tokio::test]
    async fn test_parallel_runs_are_capped() {
        let release = Arc::new(Notify::new());
        let runner = Arc::new(ScriptedRunner::gated(release.clone()));
        let tracker = JobTracker::new(JobStore::new(), runner.clone(), Arc::new(NoopNotifier))
            .with_max_parallel_jobs(2);

        let ids: Vec<_> = (0..4)
            .map(|i| {
                tracker
                    .submit(AnalyzeRequest::new(format!("Co{}", i), None))
                    .unwrap()
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runner.running.load(Ordering::SeqCst), 2);

        for id in ids {
            while tracker.get_status(id).unwrap().status == JobStatus::Pending {
                release.notify_one();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
        assert_eq!(runner.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_notifier_receives_final_payload() {
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let tracker = JobTracker::new(
            JobStore::new(),
            Arc::new(ScriptedRunner::immediate()),
            notifier.clone(),
        );

        let ok = tracker.submit(AnalyzeRequest::new("Acme", None)).unwrap();
        let bad = tracker.submit(AnalyzeRequest::new("fail", None)).unwrap();
        wait_terminal(&tracker, ok).await;
        wait_terminal(&tracker, bad).await;

        // Notification runs after the status is recorded.
        for _ in 0..100 {
            if notifier.seen.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let seen = notifier.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let ok_payload = seen.iter().find(|p| p.job_id == ok).unwrap();
        assert_eq!(ok_payload.status, JobStatus::Complete);
        let bad_payload = seen.iter().find(|p| p.job_id == bad).unwrap();
        assert_eq!(bad_payload.status, JobStatus::Error);

        // A failing webhook leaves the job state alone.
        assert_eq!(tracker.get_status(ok).unwrap().status, JobStatus::Complete);
    }

    #[tokio::test]
    async fn test_slow_webhook_frees_crew_slot() {
        let release = Arc::new(Notify::new());
        let tracker = JobTracker::new(
            JobStore::new(),
            Arc::new(ScriptedRunner::immediate()),
            Arc::new(StalledNotifier {
                release: release.clone(),
            }),
        )
        .with_max_parallel_jobs(1);

        let first = tracker.submit(AnalyzeRequest::new("Acme", None)).unwrap();
        let second = tracker.submit(AnalyzeRequest::new("Globex", None)).unwrap();

        // The first job's webhook is still pending while the second one runs.
        assert_eq!(wait_terminal(&tracker, first).await.status, JobStatus::Complete);
        assert_eq!(wait_terminal(&tracker, second).await.status, JobStatus::Complete);

        release.notify_waiters();
    }

    #[tokio::test]
    async fn test_append_event_unknown_job_is_silent() {
        let tracker = tracker(ScriptedRunner::immediate());
        tracker.append_event(Uuid::new_v4(), "nobody listens");
        assert_eq!(tracker.store().count(), 0);
    }
}
