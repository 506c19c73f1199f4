//! Crew runner service
//!
//! The multi-agent crew is an external black box: it takes a company name
//! and an optional reference URL and eventually answers with report text.
//! Two adapters are provided:
//! - `CommandCrewRunner` launches the crew as a child process
//! - `HttpCrewRunner` calls a crew kickoff endpoint over HTTP

use analyst_core::domain::job::AnalysisRequest;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use crate::repository::JobStore;

/// Failure of a crew run
#[derive(Debug, Error)]
pub enum CrewError {
    #[error("failed to start crew command '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("crew I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("crew exited with {}: {stderr}", describe_exit(.code))]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("crew request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("crew endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("crew run timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Handle a crew run uses to report progress into its own job's event log
#[derive(Debug, Clone)]
pub struct EventLog {
    store: JobStore,
    job_id: Uuid,
}

impl EventLog {
    pub fn new(store: JobStore, job_id: Uuid) -> Self {
        Self { store, job_id }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn append(&self, data: impl Into<String>) {
        let data = data.into();
        if self.store.append_event(self.job_id, data.as_str()) {
            debug!("Event appended to job {}: {}", self.job_id, data);
        }
    }
}

/// Runs the research crew for one job
#[async_trait]
pub trait CrewRunner: Send + Sync {
    /// Kicks off the crew and waits for its final text
    ///
    /// # Arguments
    /// * `job_id` - The job this run belongs to
    /// * `request` - Company and reference URL
    /// * `events` - The job's event log
    async fn kickoff(
        &self,
        job_id: Uuid,
        request: &AnalysisRequest,
        events: EventLog,
    ) -> Result<String, CrewError>;
}

// =============================================================================
// Child process
// =============================================================================

/// Stdin answers for the crew's company and url prompts
fn stdin_lines(request: &AnalysisRequest) -> String {
    let one_line = |s: &str| s.replace(['\r', '\n'], " ");
    format!(
        "{}\n{}\n",
        one_line(&request.company),
        one_line(request.url.as_deref().unwrap_or(""))
    )
}

/// Runs the crew as a child process
///
/// Inputs go in on stdin as two lines, the company then the url (empty when
/// absent), which is what an interactive crew script prompts for. They are
/// also set as `CREW_COMPANY`, `CREW_URL` and `CREW_JOB_ID`. Standard output
/// is the result; each stderr line becomes a job event.
#[derive(Debug, Clone)]
pub struct CommandCrewRunner {
    program: String,
    args: Vec<String>,
    workdir: Option<PathBuf>,
}

impl CommandCrewRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            workdir: None,
        }
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }
}

#[async_trait]
impl CrewRunner for CommandCrewRunner {
    async fn kickoff(
        &self,
        job_id: Uuid,
        request: &AnalysisRequest,
        events: EventLog,
    ) -> Result<String, CrewError> {
        info!("Launching crew command '{}' for job {}", self.program, job_id);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("CREW_JOB_ID", job_id.to_string())
            .env("CREW_COMPANY", &request.company)
            .env("CREW_URL", request.url.as_deref().unwrap_or(""))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| CrewError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let input = stdin_lines(request);
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Feed stdin alongside the readers; a crew that prints before reading
        // would otherwise fill its pipe and stall both sides.
        let write_stdin = async {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(input.as_bytes()).await {
                    // The crew may exit without reading its stdin.
                    Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            Ok::<_, std::io::Error>(())
        };

        let read_stdout = async {
            let mut out = String::new();
            if let Some(mut stdout) = stdout {
                stdout.read_to_string(&mut out).await?;
            }
            Ok::<_, std::io::Error>(out)
        };

        let forward_stderr = async {
            let mut collected = Vec::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Some(line) = lines.next_line().await? {
                    let line = line.trim();
                    if !line.is_empty() {
                        events.append(line);
                        collected.push(line.to_string());
                    }
                }
            }
            Ok::<_, std::io::Error>(collected.join("\n"))
        };

        let ((), stdout, stderr) = tokio::try_join!(write_stdin, read_stdout, forward_stderr)?;
        let status = child.wait().await?;

        if !status.success() {
            return Err(CrewError::NonZeroExit {
                code: status.code(),
                stderr,
            });
        }

        debug!("Crew command finished for job {}", job_id);
        Ok(stdout.trim_end().to_string())
    }
}

// =============================================================================
// HTTP endpoint
// =============================================================================

fn crew_inputs(job_id: Uuid, request: &AnalysisRequest) -> serde_json::Value {
    serde_json::json!({
        "company": request.company,
        "url": request.url,
        "job_id": job_id,
    })
}

/// Runs the crew through an HTTP kickoff endpoint
#[derive(Debug, Clone)]
pub struct HttpCrewRunner {
    kickoff_url: String,
    client: reqwest::Client,
}

impl HttpCrewRunner {
    pub fn new(kickoff_url: impl Into<String>) -> Self {
        Self::with_client(kickoff_url, reqwest::Client::new())
    }

    pub fn with_client(kickoff_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            kickoff_url: kickoff_url.into(),
            client,
        }
    }
}

#[async_trait]
impl CrewRunner for HttpCrewRunner {
    async fn kickoff(
        &self,
        job_id: Uuid,
        request: &AnalysisRequest,
        _events: EventLog,
    ) -> Result<String, CrewError> {
        info!("Calling crew endpoint {} for job {}", self.kickoff_url, job_id);

        let response = self
            .client
            .post(&self.kickoff_url)
            .json(&crew_inputs(job_id, request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CrewError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            company: "Acme".to_string(),
            url: Some("https://acme.test".to_string()),
        }
    }

    fn event_log() -> (JobStore, EventLog) {
        let store = JobStore::new();
        let job = store.create(request());
        let log = EventLog::new(store.clone(), job.id);
        (store, log)
    }

    fn sh(script: &str) -> CommandCrewRunner {
        CommandCrewRunner::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_command_runner_returns_stdout() {
        let (_store, log) = event_log();
        let runner = sh(r#"printf 'report for %s at %s\n' "$CREW_COMPANY" "$CREW_URL""#);

        let out = runner
            .kickoff(log.job_id(), &request(), log)
            .await
            .unwrap();
        assert_eq!(out, "report for Acme at https://acme.test");
    }

    #[tokio::test]
    async fn test_command_runner_answers_company_and_url_prompts() {
        let (_store, log) = event_log();

        // Two blocking line reads, like a script calling input() twice.
        let runner = sh(r#"read company; read url; printf '%s|%s' "$company" "$url""#);
        let out = runner
            .kickoff(log.job_id(), &request(), log)
            .await
            .unwrap();
        assert_eq!(out, "Acme|https://acme.test");
    }

    #[tokio::test]
    async fn test_command_runner_prompts_without_url() {
        let (_store, log) = event_log();
        let req = AnalysisRequest {
            company: "Acme\nCorp".to_string(),
            url: None,
        };

        let runner = sh(r#"read company; read url; printf '%s|%s' "$company" "$url""#);
        let out = runner.kickoff(log.job_id(), &req, log).await.unwrap();
        assert_eq!(out, "Acme Corp|");
    }

    #[tokio::test]
    async fn test_command_runner_output_before_reading_stdin() {
        let (_store, log) = event_log();
        let req = AnalysisRequest {
            company: "A".repeat(100_000),
            url: None,
        };

        // Fills the stdout pipe before touching stdin.
        let runner = sh("head -c 200000 /dev/zero | tr '\\0' x; cat >/dev/null");
        let out = tokio::time::timeout(
            Duration::from_secs(10),
            runner.kickoff(log.job_id(), &req, log),
        )
        .await
        .expect("crew run stalled on a full pipe")
        .unwrap();
        assert_eq!(out.len(), 200_000);
    }

    #[tokio::test]
    async fn test_command_runner_failure_reports_stderr() {
        let (store, log) = event_log();
        let job_id = log.job_id();

        let err = sh("echo 'rate limit hit' >&2; exit 3")
            .kickoff(job_id, &request(), log)
            .await
            .unwrap_err();

        match &err {
            CrewError::NonZeroExit { code, stderr } => {
                assert_eq!(*code, Some(3));
                assert_eq!(stderr, "rate limit hit");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("status 3"));

        let events = store.find_by_id(job_id).unwrap().events;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "rate limit hit");
    }

    #[tokio::test]
    async fn test_command_runner_missing_program() {
        let (_store, log) = event_log();
        let runner = CommandCrewRunner::new("/nonexistent/crew-binary", Vec::new());

        let err = runner
            .kickoff(log.job_id(), &request(), log)
            .await
            .unwrap_err();
        assert!(matches!(err, CrewError::Spawn { .. }));
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/kickoff", addr)
    }

    #[tokio::test]
    async fn test_http_runner_returns_body() {
        let app = Router::new().route(
            "/kickoff",
            post(|Json(body): Json<serde_json::Value>| async move {
                format!("analysis of {}", body["company"].as_str().unwrap_or("?"))
            }),
        );
        let url = serve(app).await;
        let (_store, log) = event_log();

        let out = HttpCrewRunner::new(url)
            .kickoff(log.job_id(), &request(), log)
            .await
            .unwrap();
        assert_eq!(out, "analysis of Acme");
    }

    #[tokio::test]
    async fn test_http_runner_error_status() {
        let app = Router::new().route(
            "/kickoff",
            post(|| async { (StatusCode::BAD_GATEWAY, "llm unavailable") }),
        );
        let url = serve(app).await;
        let (_store, log) = event_log();

        let err = HttpCrewRunner::new(url)
            .kickoff(log.job_id(), &request(), log)
            .await
            .unwrap_err();
        match err {
            CrewError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "llm unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_timeout_message() {
        let err = CrewError::TimedOut(Duration::from_secs(90));
        assert_eq!(err.to_string(), "crew run timed out after 90s");
    }
}
