//! Data Transfer Objects
//!
//! Bodies exchanged over the orchestrator's HTTP API and sent to the
//! downstream webhook.

pub mod error;
pub mod job;
pub mod webhook;
