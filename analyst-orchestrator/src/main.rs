use anyhow::Context;
use analyst_orchestrator::{api, config::Config, service};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Settings may come from a local .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "analyst_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Analyst Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    tracing::info!(
        "Crew backend: {:?}, webhook: {:?}, job timeout: {:?}, max parallel jobs: {}",
        config.crew,
        config.webhook_url,
        config.job_timeout,
        config.max_parallel_jobs
    );

    let tracker = service::tracker_from_config(&config)?;

    // Build router with all API endpoints
    let app = api::create_router(tracker);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
