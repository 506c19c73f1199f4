//! Core domain types
//!
//! These types describe an analysis job as the orchestrator tracks it.
//! They are owned by the orchestrator and handed out as snapshots.

pub mod event;
pub mod job;
