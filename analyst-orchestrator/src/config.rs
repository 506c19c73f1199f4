//! Orchestrator configuration
//!
//! Defines the bind address, the crew backend, webhook delivery and the
//! limits applied to background runs.

use std::path::PathBuf;
use std::time::Duration;

use crate::service::job::DEFAULT_MAX_PARALLEL_JOBS;

/// How the crew is reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrewBackend {
    /// Spawn a local program per job
    Command {
        program: String,
        args: Vec<String>,
        workdir: Option<PathBuf>,
    },
    /// POST to a kickoff endpoint per job
    Http { kickoff_url: String },
}

impl CrewBackend {
    /// Splits a command line such as `python3 main.py` into program and args
    pub fn command(command_line: &str) -> Self {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        Self::Command {
            program,
            args: parts.collect(),
            workdir: None,
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API listens on
    pub bind_addr: String,

    /// Crew backend used for every job
    pub crew: CrewBackend,

    /// Webhook receiving finished jobs; none disables notification
    pub webhook_url: Option<String>,

    /// Request timeout for webhook delivery
    pub webhook_timeout: Duration,

    /// Maximum time a crew run may take; none waits indefinitely
    pub job_timeout: Option<Duration>,

    /// Max crew runs executing at once
    pub max_parallel_jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".to_string(),
            crew: CrewBackend::command("python3 main.py"),
            webhook_url: None,
            webhook_timeout: Duration::from_secs(10),
            job_timeout: None,
            max_parallel_jobs: DEFAULT_MAX_PARALLEL_JOBS,
        }
    }
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - ORCHESTRATOR_BIND_ADDR (default: 0.0.0.0:3001)
    /// - CREW_KICKOFF_URL (selects the HTTP backend when set)
    /// - CREW_COMMAND (default: "python3 main.py")
    /// - CREW_WORKDIR
    /// - WEBHOOK_URL
    /// - WEBHOOK_TIMEOUT (seconds, default: 10)
    /// - JOB_TIMEOUT (seconds, default: none)
    /// - MAX_PARALLEL_JOBS (default: 4)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let seconds = |key: &str| -> anyhow::Result<Option<Duration>> {
            get(key)
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .map(Duration::from_secs)
                        .map_err(|_| anyhow::anyhow!("{} must be a number of seconds, got '{}'", key, v))
                })
                .transpose()
        };

        let crew = match get("CREW_KICKOFF_URL") {
            Some(kickoff_url) => CrewBackend::Http { kickoff_url },
            None => {
                let mut crew = get("CREW_COMMAND")
                    .map(|c| CrewBackend::command(&c))
                    .unwrap_or(defaults.crew);
                if let (CrewBackend::Command { workdir, .. }, Some(dir)) =
                    (&mut crew, get("CREW_WORKDIR"))
                {
                    *workdir = Some(PathBuf::from(dir));
                }
                crew
            }
        };

        let max_parallel_jobs = match get("MAX_PARALLEL_JOBS") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!("MAX_PARALLEL_JOBS must be a number, got '{}'", v))?,
            None => defaults.max_parallel_jobs,
        };

        Ok(Self {
            bind_addr: get("ORCHESTRATOR_BIND_ADDR").unwrap_or(defaults.bind_addr),
            crew,
            webhook_url: get("WEBHOOK_URL"),
            webhook_timeout: seconds("WEBHOOK_TIMEOUT")?.unwrap_or(defaults.webhook_timeout),
            job_timeout: seconds("JOB_TIMEOUT")?,
            max_parallel_jobs,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        match &self.crew {
            CrewBackend::Command { program, .. } if program.is_empty() => {
                anyhow::bail!("crew command cannot be empty");
            }
            CrewBackend::Http { kickoff_url } if !is_http_url(kickoff_url) => {
                anyhow::bail!("crew kickoff url must start with http:// or https://");
            }
            _ => {}
        }

        if let Some(url) = &self.webhook_url {
            if !is_http_url(url) {
                anyhow::bail!("webhook url must start with http:// or https://");
            }
        }

        if self.job_timeout.is_some_and(|t| t.is_zero()) {
            anyhow::bail!("job_timeout must be greater than 0");
        }

        if self.max_parallel_jobs == 0 {
            anyhow::bail!("max_parallel_jobs must be greater than 0");
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
