//! Webhook DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{AnalysisRequest, JobStatus};

/// Final job payload delivered to the downstream webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub job_id: Uuid,
    pub company: String,
    pub url: Option<String>,
    pub status: JobStatus,
    pub result: Option<String>,
}

impl WebhookPayload {
    pub fn new(
        job_id: Uuid,
        request: &AnalysisRequest,
        status: JobStatus,
        result: Option<String>,
    ) -> Self {
        Self {
            job_id,
            company: request.company.clone(),
            url: request.url.clone(),
            status,
            result,
        }
    }
}
