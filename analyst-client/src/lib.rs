//! Analyst HTTP Client
//!
//! Typed access to the orchestrator's job API: submit a company, poll the
//! job, or block until the crew's report is in.
//!
//! ```no_run
//! use analyst_client::AnalystClient;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> analyst_client::Result<()> {
//!     let client = AnalystClient::new("http://localhost:3001");
//!
//!     let job_id = client.analyze("Acme Corp", Some("https://acme.test")).await?;
//!     let report = client
//!         .wait_for_completion(job_id, Duration::from_secs(5), None)
//!         .await?;
//!
//!     println!("{}: {:?}", report.status, report.result_text());
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;

pub use error::{ClientError, Result};

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

/// Client for one orchestrator instance
#[derive(Debug, Clone)]
pub struct AnalystClient {
    base_url: String,
    client: Client,
}

impl AnalystClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Use a preconfigured reqwest client (timeouts, proxies, TLS)
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Decode a JSON body, turning non-2xx answers into `ClientError::ApiError`
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::api_error(status.as_u16(), body));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        assert_eq!(
            AnalystClient::new("http://localhost:3001//").base_url(),
            "http://localhost:3001"
        );
        assert_eq!(
            AnalystClient::new("http://localhost:3001").endpoint("/api/status/x"),
            "http://localhost:3001/api/status/x"
        );
    }
}
