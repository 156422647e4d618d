use anyhow::Result;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};
use tracing_subscriber::fmt::format::FmtSpan;

use agentrank_oracle::config::AgentRankConfig;
use agentrank_oracle::kv::MemoryKv;
use agentrank_oracle::{AppState, build_router};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first - this validates payment addresses and URLs
    let config = Arc::new(AgentRankConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Please check AGENTRANK_* environment variables.");
        e
    })?);

    init_logging(&config)?;

    info!("Starting AgentRank trust-scoring oracle");
    info!(
        "Payment gate: facilitator={}, price=$0.01 USDC, networks=Base+Solana",
        config.payment.facilitator_url
    );
    info!(
        "Rate limit: {}/hour per IP, {} bypass entries",
        config.rate_limit.hourly_limit,
        config.rate_limit.bypass_ips.len()
    );

    // No external KV binding in the standalone build; graph, rate counters
    // and the reputation cache live in process.
    warn!("Using in-process KV store - seed '{}' before scoring", config.graph.graph_key);
    let kv = Arc::new(MemoryKv::new());

    let state = AppState::new(config.clone(), kv)?;
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {bind_addr}: {e}"))?;

    info!("AgentRank oracle listening on {bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize tracing from the logging configuration.
fn init_logging(config: &AgentRankConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {e}"))?;

    Ok(())
}
