//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod analyze;
mod status;

use anyhow::Result;
use clap::Subcommand;
use uuid::Uuid;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start a research run for a company
    Analyze {
        /// Company to research
        company: String,

        /// Company website used as a reference source
        #[arg(long)]
        url: Option<String>,

        /// Wait for the job to finish and print the report
        #[arg(short, long)]
        wait: bool,

        /// Seconds between status polls when waiting
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
    /// Show a job's status, result and events
    Status {
        /// Job ID
        job_id: Uuid,
    },
}

/// Handle a CLI command
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Analyze {
            company,
            url,
            wait,
            interval,
        } => analyze::handle_analyze(config, &company, url.as_deref(), wait, interval).await,
        Commands::Status { job_id } => status::handle_status(config, job_id).await,
    }
}
