//! Analyst Core
//!
//! Core types shared by the analysis orchestrator, its HTTP client and the CLI.
//!
//! This crate contains:
//! - Domain types: the tracked analysis job and its event log
//! - DTOs: request and response bodies of the HTTP API

pub mod domain;
pub mod dto;
