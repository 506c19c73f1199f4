//! Job DTOs for the HTTP API

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::event::JobEvent;
use crate::domain::job::{AnalysisRequest, Job, JobStatus};

pub const COMPANY_REQUIRED: &str = "Company name is required";
pub const MAX_COMPANY_LEN: usize = 256;
pub const MAX_URL_LEN: usize = 2048;

/// Body of `POST /api/analyze`
///
/// Both fields are optional on the wire so that a missing company is
/// reported as a validation failure rather than a decoding one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl AnalyzeRequest {
    pub fn new(company: impl Into<String>, url: Option<String>) -> Self {
        Self {
            company: Some(company.into()),
            url,
        }
    }

    /// Checks the request and turns it into runner inputs
    pub fn validate(self) -> Result<AnalysisRequest, String> {
        let company = self
            .company
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| COMPANY_REQUIRED.to_string())?;

        let url = self
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        if company.chars().count() > MAX_COMPANY_LEN {
            return Err(format!(
                "Company name is too long (max: {} chars)",
                MAX_COMPANY_LEN
            ));
        }

        if url.as_ref().is_some_and(|u| u.chars().count() > MAX_URL_LEN) {
            return Err(format!("URL is too long (max: {} chars)", MAX_URL_LEN));
        }

        Ok(AnalysisRequest { company, url })
    }
}

/// Body of a `202 Accepted` answer to `POST /api/analyze`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub job_id: Uuid,
}

/// Body of `GET /api/status/{job_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub result: serde_json::Value,
    pub events: Vec<JobEvent>,
}

impl JobStatusResponse {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            result: parse_result(job.result.as_deref()),
            events: job.events.clone(),
        }
    }

    /// The result as display text, whatever shape it was decoded into
    pub fn result_text(&self) -> Option<String> {
        match &self.result {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => serde_json::to_string_pretty(other).ok(),
        }
    }
}

/// Decodes a runner result as JSON when it is well-formed, else keeps the text
fn parse_result(result: Option<&str>) -> serde_json::Value {
    match result {
        None | Some("") => serde_json::Value::Null,
        Some(text) => serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::Value::String(text.to_string())),
    }
}
