//! Job API Handlers
//!
//! Submission and polling endpoints for analysis jobs.

use analyst_core::dto::job::{AnalyzeRequest, AnalyzeResponse, JobStatusResponse};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// POST /api/analyze
/// Accept an analysis request and start it in the background
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AnalyzeResponse>)> {
    let Json(req) = body?;
    tracing::debug!("Received analyze request: {:?}", req);

    let job_id = state.tracker.submit(req)?;

    Ok((StatusCode::ACCEPTED, Json(AnalyzeResponse { job_id })))
}

/// GET /api/status/{job_id}
/// Poll a job's status, result and event log
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    tracing::debug!("Status request received for job {}", job_id);

    // Ids are always issued as UUIDs, so anything else cannot exist.
    let id = Uuid::parse_str(&job_id).map_err(|_| {
        tracing::warn!("Job with ID {} not found", job_id);
        ApiError::NotFound("Job not found".to_string())
    })?;

    let job = state.tracker.get_status(id)?;
    tracing::debug!("Returning status for job {}: {}", id, job.status);

    Ok(Json(JobStatusResponse::from_job(&job)))
}
