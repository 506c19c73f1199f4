//! Repository Module
//!
//! State storage for the orchestrator.

pub mod job;

pub use job::{JobStore, StoreError};
