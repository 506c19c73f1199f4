//! Job event types

use serde::{Deserialize, Serialize};

/// A timestamped diagnostic entry in a job's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub data: String,
}

impl JobEvent {
    /// Creates an event stamped with the current time
    pub fn now(data: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            data: data.into(),
        }
    }
}
