//! Paid scoring endpoint
//!
//! `POST /v1/score` runs the full pipeline: rate limit, payment gate, body
//! parse, graph load, context screening, reputation, composite score and
//! envelope assembly. The payment gate runs before body parsing; settlement
//! strictly precedes any side-effectful response.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::ApiError;
use crate::api::middleware::client_ip;
use crate::api::AppState;
use crate::payment::{self, PaymentGateError, build_requirements};
use crate::trust::assemble::{RankInfo, Recommendation, TrustNetwork};
use crate::trust::composite::{ComponentBreakdown, RawSignals, composite_score};
use crate::trust::screener::SafetyReport;
use crate::trust::{rank_of, recommendation_for, tier_for, trust_network};

/// Composite score for an entity the graph does not know (clean context).
pub const UNKNOWN_ENTITY_SCORE: f64 = 0.05;

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub entity: Option<String>,
    pub context: Option<String>,
}

/// Payment echo attached to every successful response.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentEcho {
    pub amount: &'static str,
    pub currency: &'static str,
    pub payer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub entity: String,
    pub found: bool,
    pub trust_score: f64,
    pub tier: &'static str,
    pub recommendation: Recommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ComponentBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals: Option<RawSignals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<RankInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_network: Option<TrustNetwork>,
    pub safety: Option<SafetyReport>,
    pub payment: PaymentEcho,
}

/// URL echoed in the requirement document's resource block.
fn request_url(state: &AppState, headers: &HeaderMap) -> String {
    match headers.get("host").and_then(|v| v.to_str().ok()) {
        Some(host) => format!("https://{host}/v1/score"),
        None => format!(
            "{}/v1/score",
            state.config.server.base_url.trim_end_matches('/')
        ),
    }
}

pub async fn score_entity(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let ip = client_ip(&headers);
    if !state.rate_limiter.check(&ip).await {
        return Err(ApiError::RateLimited);
    }

    let payer = payment::collect_payment(&headers, &state.facilitator, &state.config.payment)
        .await
        .map_err(|e| match e {
            PaymentGateError::Missing => ApiError::PaymentMissing(Box::new(build_requirements(
                &state.config.payment,
                &request_url(&state, &headers),
            ))),
            PaymentGateError::Rejected(reason) => ApiError::PaymentInvalid(reason),
        })?;

    let request: ScoreRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))?;
    let name = request
        .entity
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("entity is required".to_string()))?
        .to_string();

    let snapshot = state
        .graph
        .snapshot()
        .await
        .map_err(|e| ApiError::GraphUnavailable(e.to_string()))?;

    let safety = request
        .context
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(crate::trust::screen);

    let reputation = state.reputation.reputation(&snapshot).await;
    let now = Utc::now();

    let response = match snapshot.find_entity(&name) {
        Some(entity) => {
            let (score, breakdown, signals) =
                composite_score(entity, &snapshot, &reputation, safety.as_ref(), now);
            info!(
                entity = %name,
                score = score,
                payer = ?payer,
                "Scored entity"
            );
            ScoreResponse {
                entity: name.clone(),
                found: true,
                trust_score: score,
                tier: tier_for(score),
                recommendation: recommendation_for(score, safety.as_ref()),
                rank: rank_of(&name, &reputation, &snapshot),
                trust_network: Some(trust_network(&name, &snapshot)),
                breakdown: Some(breakdown),
                signals: Some(signals),
                safety,
                payment: payment_echo(payer),
            }
        }
        None => {
            let malicious = safety.as_ref().is_some_and(|s| s.is_malicious());
            let score = if malicious { 0.0 } else { UNKNOWN_ENTITY_SCORE };
            info!(entity = %name, malicious = malicious, "Scored unknown entity");
            ScoreResponse {
                entity: name,
                found: false,
                trust_score: score,
                tier: tier_for(score),
                recommendation: recommendation_for(score, safety.as_ref()),
                breakdown: None,
                signals: None,
                rank: None,
                trust_network: None,
                safety,
                payment: payment_echo(payer),
            }
        }
    };

    let mut http_response = (StatusCode::OK, Json(response)).into_response();
    http_response
        .headers_mut()
        .insert("X-Payment-Confirmed", HeaderValue::from_static("true"));
    Ok(http_response)
}

fn payment_echo(payer: Option<String>) -> PaymentEcho {
    PaymentEcho {
        amount: payment::PRICE_DISPLAY,
        currency: payment::PRICE_CURRENCY,
        payer,
    }
}
