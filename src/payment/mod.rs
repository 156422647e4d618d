//! Payment gate
//!
//! Builds the requirement document for unpaid requests and runs presented
//! proofs through the facilitator's verify-then-settle protocol. Settlement
//! strictly precedes the scoring body: if settle fails the request fails
//! with 402, never with a partial result.

pub mod facilitator;
pub mod proof;
pub mod requirements;

pub use facilitator::{
    FacilitatorClient, FacilitatorError, FacilitatorRequest, VerifyOutcome, truncate_reason,
};
pub use proof::{DecodedProof, ProofKind, decode_proof};
pub use requirements::{
    EVM_NETWORK, MAX_TIMEOUT_SECONDS, PRICE_ATOMIC, PRICE_CURRENCY, PRICE_DISPLAY, PaymentOption,
    RequirementsDoc, SOLANA_NETWORK, X402_VERSION, build_requirements, payment_options,
};

use axum::http::HeaderMap;
use tracing::{debug, info};

use crate::config::PaymentConfig;

/// Headers a proof may arrive in, in precedence order.
pub const PROOF_HEADERS: [&str; 2] = ["payment-signature", "x-payment"];

/// Why a request was not paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentGateError {
    /// No proof presented; answer with the requirement document.
    Missing,
    /// Proof presented but not accepted; carries the reason.
    Rejected(String),
}

/// The presented proof header value, if any.
pub fn proof_header(headers: &HeaderMap) -> Option<&str> {
    PROOF_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
}

/// Run the full gate: decode, classify, select the matching requirement,
/// verify, settle. Returns the payer identity from the verify response.
pub async fn collect_payment(
    headers: &HeaderMap,
    facilitator: &FacilitatorClient,
    config: &PaymentConfig,
) -> Result<Option<String>, PaymentGateError> {
    let Some(header) = proof_header(headers) else {
        return Err(PaymentGateError::Missing);
    };

    let decoded = decode_proof(header)
        .map_err(|e| PaymentGateError::Rejected(format!("payment_error: {e}")))?;

    let options = payment_options(config);
    let kind = decoded.kind();
    let wanted_network = match kind {
        ProofKind::Evm => EVM_NETWORK,
        ProofKind::Solana => SOLANA_NETWORK,
    };
    // No shape match falls back to the first offered requirement.
    let selected = options
        .iter()
        .find(|o| o.network == wanted_network)
        .or_else(|| options.first())
        .cloned()
        .ok_or_else(|| PaymentGateError::Rejected("payment_error: no payment options".into()))?;
    debug!(kind = ?kind, network = %selected.network, "Classified payment proof");

    let request = FacilitatorRequest {
        x402_version: decoded.x402_version,
        payment_payload: decoded.raw,
        payment_requirements: selected,
    };

    let verified = facilitator
        .verify(&request)
        .await
        .map_err(|e| PaymentGateError::Rejected(e.to_string()))?;
    facilitator
        .settle(&request)
        .await
        .map_err(|e| PaymentGateError::Rejected(e.to_string()))?;

    info!(payer = ?verified.payer, "Payment verified and settled");
    Ok(verified.payer)
}
