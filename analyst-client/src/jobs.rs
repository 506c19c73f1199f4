//! Job-related API endpoints

use analyst_core::dto::job::{AnalyzeRequest, AnalyzeResponse, JobStatusResponse};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::{ClientError, Result};
use crate::{AnalystClient, decode};

impl AnalystClient {
    /// Submit a company for analysis
    ///
    /// # Returns
    /// The id of the background job
    pub async fn analyze(&self, company: &str, url: Option<&str>) -> Result<Uuid> {
        let req = AnalyzeRequest::new(company, url.map(str::to_string));
        let response = self
            .client
            .post(self.endpoint("/api/analyze"))
            .json(&req)
            .send()
            .await?;

        let accepted: AnalyzeResponse = decode(response).await?;
        Ok(accepted.job_id)
    }

    /// Get a job's current status, result and events
    pub async fn get_status(&self, job_id: Uuid) -> Result<JobStatusResponse> {
        let response = self
            .client
            .get(self.endpoint(&format!("/api/status/{}", job_id)))
            .send()
            .await?;

        decode(response).await
    }

    /// Poll a job until it is `COMPLETE` or `ERROR`
    ///
    /// # Arguments
    /// * `job_id` - The job to watch
    /// * `poll_interval` - Delay between polls
    /// * `timeout` - Give up after this long; `None` waits indefinitely
    pub async fn wait_for_completion(
        &self,
        job_id: Uuid,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<JobStatusResponse> {
        let started = Instant::now();

        loop {
            let status = self.get_status(job_id).await?;
            if status.status.is_terminal() {
                return Ok(status);
            }

            if timeout.is_some_and(|limit| started.elapsed() >= limit) {
                return Err(ClientError::TimedOut(job_id));
            }

            tracing::debug!("Job {} still {}, polling again", job_id, status.status);
            tokio::time::sleep(poll_interval).await;
        }
    }
}
