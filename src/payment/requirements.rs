//! Payment requirement document
//!
//! The 402 body advertising the two accepted payment options. Shapes follow
//! the x402 v2 wire format: camelCase fields, amounts as integer strings in
//! the asset's base units.

use serde::Serialize;
use serde_json::{Value, json};

use crate::config::PaymentConfig;

pub const X402_VERSION: u32 = 2;
/// Price per query in 6-decimal USDC base units ($0.01).
pub const PRICE_ATOMIC: &str = "10000";
/// Human-readable price echoed on successful responses.
pub const PRICE_DISPLAY: &str = "0.01";
pub const PRICE_CURRENCY: &str = "USDC";
pub const USDC_DECIMALS: u32 = 6;

pub const PAYMENT_SCHEME: &str = "exact";
pub const EVM_NETWORK: &str = "eip155:8453";
pub const SOLANA_NETWORK: &str = "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp";
/// USDC contract on Base.
pub const EVM_USDC_ASSET: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
/// USDC mint on Solana mainnet.
pub const SOLANA_USDC_ASSET: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
/// Upper bound a presented payment may take to settle.
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

const SERVICE_DESCRIPTION: &str =
    "Trust score for a named agent in the knowledge graph, with component breakdown, \
     rank and trust neighborhood";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    pub scheme: String,
    pub network: String,
    pub amount: String,
    pub asset: String,
    pub pay_to: String,
    pub max_timeout_seconds: u64,
    pub extra: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    pub url: String,
    pub description: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsDoc {
    pub x402_version: u32,
    pub accepts: Vec<PaymentOption>,
    pub resource: ResourceInfo,
    pub description: String,
    pub extensions: Value,
}

/// The two mutually exclusive options offered to the client, EVM first.
pub fn payment_options(config: &PaymentConfig) -> Vec<PaymentOption> {
    vec![
        PaymentOption {
            scheme: PAYMENT_SCHEME.to_string(),
            network: EVM_NETWORK.to_string(),
            amount: PRICE_ATOMIC.to_string(),
            asset: EVM_USDC_ASSET.to_string(),
            pay_to: config.evm_pay_to.clone(),
            max_timeout_seconds: MAX_TIMEOUT_SECONDS,
            extra: json!({ "name": "USD Coin", "version": "2" }),
        },
        PaymentOption {
            scheme: PAYMENT_SCHEME.to_string(),
            network: SOLANA_NETWORK.to_string(),
            amount: PRICE_ATOMIC.to_string(),
            asset: SOLANA_USDC_ASSET.to_string(),
            pay_to: config.solana_pay_to.clone(),
            max_timeout_seconds: MAX_TIMEOUT_SECONDS,
            extra: json!({
                "feePayer": config.solana_fee_payer,
                "decimals": USDC_DECIMALS,
            }),
        },
    ]
}

/// Full requirement document for an unpaid request. `resource_url` echoes
/// the request URL.
pub fn build_requirements(config: &PaymentConfig, resource_url: &str) -> RequirementsDoc {
    RequirementsDoc {
        x402_version: X402_VERSION,
        accepts: payment_options(config),
        resource: ResourceInfo {
            url: resource_url.to_string(),
            description: SERVICE_DESCRIPTION.to_string(),
            mime_type: "application/json".to_string(),
        },
        description: SERVICE_DESCRIPTION.to_string(),
        extensions: json!({
            "bazaar": {
                "info": {
                    "input": { "entity": "Orac", "context": "optional free-text context" },
                    "output": {
                        "entity": "Orac",
                        "found": true,
                        "trust_score": 0.8123,
                        "tier": "established",
                        "recommendation": "PROCEED"
                    }
                },
                "schema": {
                    "type": "object",
                    "required": ["entity"],
                    "properties": {
                        "entity": { "type": "string", "description": "entity name to score" },
                        "context": { "type": "string", "description": "free-text context to screen" }
                    }
                }
            }
        }),
    }
}
