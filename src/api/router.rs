//! Route table and unpaid endpoints
//!
//! Endpoints:
//!   OPTIONS *        -> 204 preflight (middleware)
//!   GET /            -> content-negotiated service info (JSON) or landing page (HTML)
//!   GET /health      -> graph reachability probe
//!   POST /v1/score   -> paid scoring (see score.rs)
//!   anything else    -> 404 / 405 JSON envelopes

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde_json::json;

use crate::api::AppState;
use crate::api::error::ApiError;
use crate::api::middleware::cors_middleware;
use crate::api::score::score_entity;
use crate::payment::{EVM_NETWORK, PRICE_CURRENCY, PRICE_DISPLAY, SOLANA_NETWORK};
use crate::trust::assemble::{TIER_CUTOFFS, TOP_TIER};

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/health", get(health))
        .route("/v1/score", post(score_entity))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// JSON is returned only when the client explicitly prefers it and does not
/// also accept HTML; browsers get the landing page.
async fn landing(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let accept = headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if accept.contains("application/json") && !accept.contains("text/html") {
        Json(info_document(&state)).into_response()
    } else {
        Html(landing_html(&state)).into_response()
    }
}

fn info_document(state: &AppState) -> serde_json::Value {
    let tiers: Vec<serde_json::Value> = TIER_CUTOFFS
        .iter()
        .map(|(cutoff, label)| json!({ "tier": label, "below": cutoff }))
        .chain(std::iter::once(json!({ "tier": TOP_TIER, "below": 1.0 })))
        .collect();

    json!({
        "service": "AgentRank Oracle",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Paid trust scoring for software agents in the shared knowledge graph",
        "pricing": {
            "amount": PRICE_DISPLAY,
            "currency": PRICE_CURRENCY,
            "networks": [EVM_NETWORK, SOLANA_NETWORK],
            "protocol": "x402",
        },
        "endpoints": {
            "score": { "method": "POST", "path": "/v1/score", "paid": true },
            "health": { "method": "GET", "path": "/health", "paid": false },
        },
        "tiers": tiers,
        "data_source": state.config.graph.graph_key,
        "author": "AgentRank",
    })
}

fn landing_html(state: &AppState) -> String {
    let base_url = &state.config.server.base_url;
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>AgentRank Oracle</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta property="og:title" content="AgentRank Oracle">
<meta property="og:description" content="Trust scores for software agents. {PRICE_DISPLAY} {PRICE_CURRENCY} per query over x402.">
<meta property="og:type" content="website">
<meta property="og:url" content="{base_url}">
</head>
<body>
<h1>AgentRank Oracle</h1>
<p>Composite trust scores for agents in the shared knowledge graph.</p>
<p>POST <code>/v1/score</code> with <code>{{"entity": "name"}}</code> and an x402
payment of {PRICE_DISPLAY} {PRICE_CURRENCY} (Base or Solana).</p>
</body>
</html>
"#
    )
}

/// Health probe: reachable graph with entity/relation counts, or degraded.
async fn health(State(state): State<AppState>) -> Response {
    match state.graph.snapshot().await {
        Ok(snapshot) => Json(json!({
            "status": "healthy",
            "graph": {
                "entities": snapshot.entities.len(),
                "relations": snapshot.relations.len(),
            },
            "timestamp": Utc::now().to_rfc3339(),
        }))
        .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "error": e.to_string(),
                "timestamp": Utc::now().to_rfc3339(),
            })),
        )
            .into_response(),
    }
}
