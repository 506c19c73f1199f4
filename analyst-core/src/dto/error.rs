//! Error body DTO

use serde::{Deserialize, Serialize};

/// Body returned with every 4xx/5xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
