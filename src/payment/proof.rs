//! Payment proof decoding
//!
//! The proof is opaque beyond a shape discriminant: a base64-wrapped JSON
//! record whose payload tells an EVM authorization apart from a Solana
//! transaction. Cryptographic validation is the facilitator's job.

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofKind {
    Evm,
    Solana,
}

#[derive(Debug, Clone)]
pub struct DecodedProof {
    pub x402_version: u64,
    pub payload: Value,
    /// The full decoded record, forwarded verbatim to the facilitator.
    pub raw: Value,
}

impl DecodedProof {
    /// Shape discriminant: a `payload.transaction` without a
    /// `payload.authorization` is a Solana proof, everything else is EVM.
    pub fn kind(&self) -> ProofKind {
        let has_transaction = !self.payload["transaction"].is_null();
        let has_authorization = !self.payload["authorization"].is_null();
        if has_transaction && !has_authorization {
            ProofKind::Solana
        } else {
            ProofKind::Evm
        }
    }
}

/// Decode a presented payment header into its JSON record.
pub fn decode_proof(header_value: &str) -> Result<DecodedProof> {
    let bytes = BASE64
        .decode(header_value.trim())
        .context("payment proof is not valid base64")?;
    let raw: Value =
        serde_json::from_slice(&bytes).context("payment proof is not valid JSON")?;

    let x402_version = raw["x402Version"]
        .as_u64()
        .ok_or_else(|| anyhow!("payment proof is missing x402Version"))?;
    let payload = raw
        .get("payload")
        .cloned()
        .ok_or_else(|| anyhow!("payment proof is missing payload"))?;

    Ok(DecodedProof {
        x402_version,
        payload,
        raw,
    })
}
