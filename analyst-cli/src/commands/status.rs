//! Status command handler

use analyst_client::AnalystClient;
use analyst_core::domain::event::JobEvent;
use analyst_core::domain::job::JobStatus;
use analyst_core::dto::job::JobStatusResponse;
use anyhow::{Result, bail};
use colored::*;
use uuid::Uuid;

use crate::config::Config;

/// Fetch and display a job
pub async fn handle_status(config: &Config, job_id: Uuid) -> Result<()> {
    let client = AnalystClient::new(&config.orchestrator_url);

    let job = match client.get_status(job_id).await {
        Ok(job) => job,
        Err(e) if e.is_not_found() => bail!("Job {} not found", job_id),
        Err(e) => return Err(e.into()),
    };

    print_job_details(&job);

    Ok(())
}

/// Print status, result and event log of a job
pub fn print_job_details(job: &JobStatusResponse) {
    println!("{}", "Job Details:".bold());
    println!("  ID:     {}", job.job_id.to_string().cyan());
    println!("  Status: {}", colorize_status(job.status));

    if !job.events.is_empty() {
        println!("\n{}", "Events:".bold());
        println!("{}", "─".repeat(80).dimmed());
        for event in &job.events {
            print_event(event);
        }
        println!("{}", "─".repeat(80).dimmed());
    }

    match (job.status, job.result_text()) {
        (JobStatus::Error, Some(message)) => {
            println!("\n{}", "Error:".bold());
            println!("{}", message.red());
        }
        (_, Some(report)) => {
            println!("\n{}", "Result:".bold());
            println!("{}", report);
        }
        (_, None) => {}
    }
}

fn print_event(event: &JobEvent) {
    println!(
        "{} {}",
        event
            .timestamp
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed(),
        event.data
    );
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> ColoredString {
    match status {
        JobStatus::Pending => status.as_str().yellow(),
        JobStatus::Complete => status.as_str().green(),
        JobStatus::Error => status.as_str().red(),
    }
}
