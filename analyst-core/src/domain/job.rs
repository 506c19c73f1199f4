//! Job domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::event::JobEvent;

/// Analysis job record
///
/// Created as `Pending` when a request is accepted and moved exactly once
/// to a terminal status by the background task that owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub result: Option<String>,
    pub events: Vec<JobEvent>,
    pub request: AnalysisRequest,
    pub requested_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Job {
    /// Creates a new pending job with an empty result and event log
    pub fn pending(id: Uuid, request: AnalysisRequest) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            result: None,
            events: Vec::new(),
            request,
            requested_at: chrono::Utc::now(),
            completed_at: None,
        }
    }
}

/// Job execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Complete,
    Error,
}

impl JobStatus {
    /// Whether no further transition can happen from this status
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Complete => "COMPLETE",
            JobStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated inputs of an analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub company: String,
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_value(JobStatus::Pending).unwrap(),
            serde_json::json!("PENDING")
        );
        assert_eq!(
            serde_json::from_str::<JobStatus>("\"ERROR\"").unwrap(),
            JobStatus::Error
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(JobStatus::Complete.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }

    #[test]
    fn test_pending_job_is_empty() {
        let job = Job::pending(
            Uuid::new_v4(),
            AnalysisRequest {
                company: "Acme".to_string(),
                url: None,
            },
        );
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.result.is_none());
        assert!(job.events.is_empty());
        assert!(job.completed_at.is_none());
    }
}
