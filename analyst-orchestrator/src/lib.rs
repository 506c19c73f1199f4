//! Analyst Orchestrator
//!
//! HTTP front for the company research crew. A request starts a crew run in
//! the background and returns a job id; callers poll that id for the status,
//! the final report and the run's event log.

pub mod api;
pub mod config;
pub mod repository;
pub mod service;
