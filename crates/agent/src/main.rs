//! Node Pool Monitor - GKE node pool utilization poller
//!
//! Walks every cluster and node pool of the configured projects, computes
//! how full each autoscaled pool is, and pushes the result to New Relic.
//! Runs a single cycle by default, or polls on an interval in daemon mode.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use nodepool_lib::{
    emitter::{LoggingSink, MetricSink, NewRelicSink},
    gcp::{AccessTokenProvider, ComputeClient, GkeClient},
    health::{components, HealthRegistry},
    http, PollError, PollOrchestrator, RetryPolicy, StructuredLogger,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

use config::{AgentConfig, ConfigError, EnvSettings};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Parser)]
#[command(
    name = "nodepool-monitor",
    version,
    about = "Report GKE node pool utilization to New Relic"
)]
struct Cli {
    /// Run a single poll cycle even when POLL_INTERVAL_SECS is set
    #[arg(long)]
    once: bool,

    /// Log gauges instead of sending them to New Relic
    #[arg(long)]
    dry_run: bool,

    #[arg(long, value_enum, default_value = "json")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}

/// Health component an aborted cycle is charged to
fn failed_component(err: &PollError, sink_endpoint: Option<&str>) -> &'static str {
    match err {
        PollError::Status { service, .. } if *service == "newrelic" => components::METRICS_SINK,
        PollError::Transport { url, .. } if Some(url.as_str()) == sink_endpoint => {
            components::METRICS_SINK
        }
        _ => components::POLLER,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    // An empty project list is a clean exit whatever else is set
    let project_ids = EnvSettings::load_project_ids().context("failed to read GCP_PROJECT_IDS")?;
    if project_ids.is_empty() {
        println!("{}", ConfigError::NoProjectIds);
        warn!(event = "no_projects", "{}", ConfigError::NoProjectIds);
        return Ok(());
    }

    let settings = EnvSettings::load().context("failed to read configuration")?;
    let config = AgentConfig::from_settings(settings, cli.dry_run)?;

    let logger = StructuredLogger::new(&config.region);
    logger.log_startup(AGENT_VERSION, &config.project_ids);

    let client = http::build_client()?;
    let tokens = Arc::new(match &config.access_token {
        Some(token) => AccessTokenProvider::fixed(token.clone()),
        None => AccessTokenProvider::metadata_server(client.clone()),
    });

    let (sink, sink_endpoint): (Arc<dyn MetricSink>, Option<String>) =
        match (&config.api_key, cli.dry_run) {
            (Some(api_key), false) => {
                let sink = NewRelicSink::with_endpoint(
                    client.clone(),
                    &config.metric_api_url,
                    api_key.clone(),
                )?;
                let endpoint = sink.endpoint().to_string();
                (Arc::new(sink) as Arc<dyn MetricSink>, Some(endpoint))
            }
            _ => {
                info!(event = "dry_run", "Dry run: gauges will be logged, not sent");
                (Arc::new(LoggingSink) as Arc<dyn MetricSink>, None)
            }
        };

    let retry = RetryPolicy::new(config.retry_attempts, config.retry_delay);
    let mut orchestrator = PollOrchestrator::from_clients(
        Arc::new(GkeClient::new(client.clone(), tokens.clone())),
        Arc::new(ComputeClient::new(client, tokens)),
        sink,
        retry,
        &config.region,
    );

    let interval = match config.poll_interval {
        Some(interval) if !cli.once => interval,
        _ => {
            let summary = orchestrator.run(&config.project_ids).await?;
            info!(
                projects = summary.projects,
                clusters = summary.clusters,
                node_pools = summary.node_pools,
                "Poll cycle finished"
            );
            return Ok(());
        }
    };

    // Daemon mode
    let health_registry = HealthRegistry::new();
    health_registry.register(components::POLLER).await;
    health_registry.register(components::METRICS_SINK).await;

    let app_state = Arc::new(api::AppState::new(health_registry.clone()));
    let listener = api::bind(config.api_port).await?;
    let mut api_handle = tokio::spawn(api::serve(listener, app_state));

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match orchestrator.run(&config.project_ids).await {
                    Ok(summary) => health_registry.record_success(summary.node_pools).await,
                    Err(e) => {
                        let component = failed_component(&e, sink_endpoint.as_deref());
                        error!(
                            component,
                            error = %e,
                            "Poll cycle failed, will retry next interval"
                        );
                        health_registry.record_failure(component, &e.to_string()).await;
                    }
                }
            }
            served = &mut api_handle => {
                let err = match served {
                    Ok(Ok(())) => anyhow::anyhow!("API server stopped unexpectedly"),
                    Ok(Err(e)) => e,
                    Err(e) => anyhow::Error::new(e).context("API server task failed"),
                };
                error!(error = %err, "API server exited, shutting down");
                return Err(err);
            }
            signal = &mut shutdown => {
                signal?;
                logger.log_shutdown("SIGINT received");
                break;
            }
        }
    }

    api_handle.abort();
    Ok(())
}
