//! Facilitator client
//!
//! Two-phase settlement against the remote x402 facilitator: `/verify`
//! checks the signed payment intent, `/settle` executes it on-chain. Verify
//! strictly precedes settle; the caller only serves the paid response after
//! settle has succeeded.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::payment::requirements::PaymentOption;

/// Facilitator bodies are surfaced in 402 reasons; never beyond this length.
pub const REASON_TRUNCATION: usize = 200;

/// Body for both `/verify` and `/settle`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorRequest {
    pub x402_version: u64,
    pub payment_payload: Value,
    pub payment_requirements: PaymentOption,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutcome {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub payer: Option<String>,
    #[serde(default)]
    pub invalid_reason: Option<String>,
}

/// Failure modes of the two-phase protocol, each carrying the reason the
/// 402 envelope reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacilitatorError {
    /// `/verify` returned non-2xx; carries the truncated body.
    VerifyRejected(String),
    /// `/verify` returned 2xx with `isValid=false`; carries its reason.
    Invalid(String),
    /// `/settle` returned non-2xx; carries the truncated body.
    SettleRejected(String),
    /// Decode or transport failure anywhere in the exchange.
    Transport(String),
}

impl fmt::Display for FacilitatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacilitatorError::VerifyRejected(body) => write!(f, "Verify: {body}"),
            FacilitatorError::Invalid(reason) => write!(f, "{reason}"),
            FacilitatorError::SettleRejected(body) => write!(f, "Settle: {body}"),
            FacilitatorError::Transport(msg) => write!(f, "payment_error: {msg}"),
        }
    }
}

/// Truncate a facilitator body for inclusion in an error reason.
pub fn truncate_reason(body: &str) -> String {
    if body.len() <= REASON_TRUNCATION {
        return body.to_string();
    }
    let mut cut = REASON_TRUNCATION;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    body[..cut].to_string()
}

#[derive(Clone)]
pub struct FacilitatorClient {
    client: Client,
    base_url: String,
}

impl FacilitatorClient {
    /// Build the client once at startup. The timeout bounds each facilitator
    /// call and must stay well under the requirement's `maxTimeoutSeconds`.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        Url::parse(base_url).context("invalid facilitator base URL")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("AgentRankOracle/0.1")
            .build()
            .context("failed to build facilitator HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Phase one: cryptographic verification of the payment intent.
    pub async fn verify(
        &self,
        request: &FacilitatorRequest,
    ) -> Result<VerifyOutcome, FacilitatorError> {
        let (status, body) = self.post("verify", request).await?;
        if !status.is_success() {
            return Err(FacilitatorError::VerifyRejected(truncate_reason(&body)));
        }

        let outcome: VerifyOutcome = serde_json::from_str(&body)
            .map_err(|e| FacilitatorError::Transport(format!("verify response: {e}")))?;
        if !outcome.is_valid {
            return Err(FacilitatorError::Invalid(
                outcome
                    .invalid_reason
                    .unwrap_or_else(|| "payment verification failed".to_string()),
            ));
        }
        Ok(outcome)
    }

    /// Phase two: on-chain settlement of a verified payment. The returned
    /// envelope is opaque to this service.
    pub async fn settle(&self, request: &FacilitatorRequest) -> Result<Value, FacilitatorError> {
        let (status, body) = self.post("settle", request).await?;
        if !status.is_success() {
            return Err(FacilitatorError::SettleRejected(truncate_reason(&body)));
        }
        serde_json::from_str(&body)
            .map_err(|e| FacilitatorError::Transport(format!("settle response: {e}")))
    }

    async fn post(
        &self,
        endpoint: &str,
        request: &FacilitatorRequest,
    ) -> Result<(reqwest::StatusCode, String), FacilitatorError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| FacilitatorError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FacilitatorError::Transport(e.to_string()))?;
        Ok((status, body))
    }
}
