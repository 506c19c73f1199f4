//! Notification service
//!
//! Best-effort delivery of a finished job to a downstream webhook
//! (an automation workflow in the usual deployment).

use analyst_core::dto::webhook::WebhookPayload;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure to deliver a notification
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Downstream sink for finished jobs
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, payload: &WebhookPayload) -> Result<(), NotifyError>;
}

/// Notifier used when no webhook is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, payload: &WebhookPayload) -> Result<(), NotifyError> {
        tracing::debug!("No webhook configured, skipping notification for job {}", payload.job_id);
        Ok(())
    }
}

/// Posts the job payload as JSON to a webhook URL
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, payload: &WebhookPayload) -> Result<(), NotifyError> {
        tracing::debug!("Sending results for job {} to {}", payload.job_id, self.url);

        let response = self.client.post(&self.url).json(payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
