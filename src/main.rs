use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use nlip_agents::agents::{CoordinatorAgent, WorkerAgent};
use nlip_agents::api::agent_router;
use nlip_agents::config::{Cli, Command, CoordinatorArgs, SendArgs, WorkerArgs};
use nlip_agents::domain::message::Message;
use nlip_agents::domain::ports::{Endpoint, Transport};
use nlip_agents::infrastructure::{HttpTransport, NwsWeatherClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Coordinator(args) => run_coordinator(args).await,
        Command::Worker(args) => run_worker(args).await,
        Command::Send(args) => send(args).await,
    }
}

async fn run_coordinator(args: CoordinatorArgs) -> Result<()> {
    let policy = args.policy();
    tracing::info!(
        worker = %args.worker_endpoint,
        llm = args.reasoner.uses_llm(),
        timeout_secs = policy.timeout.as_secs(),
        max_retries = policy.max_retries,
        max_subtasks = policy.max_subtasks,
        max_concurrency = policy.max_concurrency,
        "Starting coordinator agent"
    );

    let reasoner = args
        .reasoner
        .build()
        .context("Failed to build reasoning client")?;
    let agent = CoordinatorAgent::new(
        "coordinator",
        Endpoint::new(args.worker_endpoint.clone()),
        Arc::new(HttpTransport::new()),
        reasoner,
    )
    .with_policy(policy);

    serve(args.bind, agent_router(Arc::new(agent))).await
}

async fn run_worker(args: WorkerArgs) -> Result<()> {
    tracing::info!(
        nws = %args.nws_base_url,
        nws_timeout_secs = args.nws_timeout_secs,
        concurrency = args.worker_concurrency,
        llm = args.reasoner.uses_llm(),
        "Starting weather worker agent"
    );

    let weather = NwsWeatherClient::new(
        args.nws_base_url.clone(),
        &args.nws_user_agent,
        args.nws_timeout(),
    )
    .context("Failed to build weather client")?;
    let reasoner = args
        .reasoner
        .build()
        .context("Failed to build reasoning client")?;
    let agent = WorkerAgent::new("weather-worker", Arc::new(weather), reasoner)
        .with_max_concurrency(args.worker_concurrency as usize);

    serve(args.bind, agent_router(Arc::new(agent))).await
}

async fn serve(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn send(args: SendArgs) -> Result<()> {
    let mut request = Message::english(args.query())
        .context("Query must not be empty")?
        .with_metadata("correlation_id", Uuid::new_v4().to_string());
    if let Some(session_id) = &args.session_id {
        request = request.with_metadata("session_id", session_id.clone());
    }

    let reply = HttpTransport::new()
        .send(
            &Endpoint::new(args.endpoint.clone()),
            &request,
            Duration::from_secs(args.timeout_secs),
        )
        .await
        .with_context(|| format!("No reply from {}", args.endpoint))?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&reply)?
    } else {
        serde_json::to_string(&reply)?
    };
    println!("{}", output);
    Ok(())
}
