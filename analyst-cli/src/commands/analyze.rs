//! Analyze command handler

use analyst_client::AnalystClient;
use anyhow::{Context, Result};
use colored::*;
use std::time::Duration;

use crate::commands::status::print_job_details;
use crate::config::Config;

/// Submit a company and optionally wait for the report
pub async fn handle_analyze(
    config: &Config,
    company: &str,
    url: Option<&str>,
    wait: bool,
    interval: u64,
) -> Result<()> {
    let client = AnalystClient::new(&config.orchestrator_url);

    let job_id = client
        .analyze(company, url)
        .await
        .context("Failed to submit analysis")?;

    println!("{}", "✓ Analysis submitted".green().bold());
    println!("  Job ID: {}", job_id.to_string().cyan());

    if !wait {
        println!(
            "{}",
            format!("  Check progress with: analyst status {}", job_id).dimmed()
        );
        return Ok(());
    }

    println!("{}", "Waiting for the crew to finish...".dimmed());
    let job = client
        .wait_for_completion(job_id, Duration::from_secs(interval.max(1)), None)
        .await
        .context("Failed while waiting for the job")?;

    println!();
    print_job_details(&job);

    Ok(())
}
