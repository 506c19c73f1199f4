//! Service Module
//!
//! Business logic layer for the orchestrator.
//! The job tracker drives the crew runner and the notifier through traits
//! so that either side can be swapped or mocked.

pub mod crew;
pub mod job;
pub mod notify;

// Re-export for convenience
pub use crew::{CommandCrewRunner, CrewError, CrewRunner, EventLog, HttpCrewRunner};
pub use job::{JobError, JobTracker};
pub use notify::{NoopNotifier, Notifier, NotifyError, WebhookNotifier};

use anyhow::Context;
use std::sync::Arc;

use crate::config::{Config, CrewBackend};
use crate::repository::JobStore;

/// Wire a job tracker from configuration
pub fn tracker_from_config(config: &Config) -> anyhow::Result<JobTracker> {
    let runner: Arc<dyn CrewRunner> = match &config.crew {
        CrewBackend::Http { kickoff_url } => Arc::new(HttpCrewRunner::new(kickoff_url.clone())),
        CrewBackend::Command {
            program,
            args,
            workdir,
        } => {
            let runner = CommandCrewRunner::new(program.clone(), args.clone());
            match workdir {
                Some(dir) => Arc::new(runner.with_workdir(dir)),
                None => Arc::new(runner),
            }
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.webhook_url {
        Some(url) => Arc::new(
            WebhookNotifier::new(url.clone(), config.webhook_timeout)
                .context("Failed to build webhook client")?,
        ),
        None => Arc::new(NoopNotifier),
    };

    Ok(JobTracker::new(JobStore::new(), runner, notifier)
        .with_max_parallel_jobs(config.max_parallel_jobs)
        .with_job_timeout(config.job_timeout))
}
