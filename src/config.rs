//! Configuration management
//!
//! All deployment knobs come from `AGENTRANK_*` environment variables: the
//! graph key in the shared KV, the facilitator base URL, the on-chain pay-to
//! addresses and the rate-limit policy. Pay-to addresses have no defaults
//! and must be configured explicitly.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

/// Default hourly rate-limit quota per client IP.
pub const DEFAULT_HOURLY_LIMIT: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRankConfig {
    pub server: ServerConfig,
    pub graph: GraphConfig,
    pub payment: PaymentConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Public base URL, used when the request carries no Host header
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// KV key the whole-graph snapshot lives under
    pub graph_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Base URL of the x402 facilitator
    pub facilitator_url: String,
    /// EVM (Base) address payments are made out to
    pub evm_pay_to: String,
    /// Solana address payments are made out to
    pub solana_pay_to: String,
    /// Fee-payer address advertised for the Solana option
    pub solana_fee_payer: String,
    /// Per-call facilitator timeout; must stay under maxTimeoutSeconds (300)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Permits per rolling hour per client IP
    pub hourly_limit: u32,
    /// IPs exempt from the quota
    pub bypass_ips: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Enable per-request span logging
    pub log_requests: bool,
}

impl Default for AgentRankConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8402,
                base_url: "https://oracle.agentrank.dev".to_string(),
            },
            graph: GraphConfig {
                graph_key: "agent_knowledge_graph".to_string(),
            },
            payment: PaymentConfig::default(),
            rate_limit: RateLimitConfig {
                hourly_limit: DEFAULT_HOURLY_LIMIT,
                bypass_ips: Vec::new(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                log_requests: false,
            },
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            facilitator_url: "https://x402.org/facilitator".to_string(),
            evm_pay_to: String::new(),    // must come from environment
            solana_pay_to: String::new(), // must come from environment
            solana_fee_payer: String::new(),
            timeout_secs: 30,
        }
    }
}

impl AgentRankConfig {
    /// Load from environment variables and validate.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var("AGENTRANK_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = env::var("AGENTRANK_PORT") {
            config.server.port = port.parse().context("Invalid AGENTRANK_PORT value")?;
        }
        if let Ok(base_url) = env::var("AGENTRANK_BASE_URL") {
            config.server.base_url = base_url;
        }

        if let Ok(key) = env::var("AGENTRANK_GRAPH_KEY") {
            config.graph.graph_key = key;
        }

        if let Ok(url) = env::var("AGENTRANK_FACILITATOR_URL") {
            config.payment.facilitator_url = url;
        }
        if let Ok(timeout) = env::var("AGENTRANK_FACILITATOR_TIMEOUT_SECS") {
            config.payment.timeout_secs = timeout
                .parse()
                .context("Invalid AGENTRANK_FACILITATOR_TIMEOUT_SECS value")?;
        }

        config.payment.evm_pay_to = env::var("AGENTRANK_EVM_PAY_TO")
            .context("AGENTRANK_EVM_PAY_TO environment variable is required")?;
        config.payment.solana_pay_to = env::var("AGENTRANK_SOLANA_PAY_TO")
            .context("AGENTRANK_SOLANA_PAY_TO environment variable is required")?;
        config.payment.solana_fee_payer = env::var("AGENTRANK_SOLANA_FEE_PAYER")
            .context("AGENTRANK_SOLANA_FEE_PAYER environment variable is required")?;

        if let Ok(limit) = env::var("AGENTRANK_RATE_LIMIT_PER_HOUR") {
            config.rate_limit.hourly_limit = limit
                .parse()
                .context("Invalid AGENTRANK_RATE_LIMIT_PER_HOUR value")?;
        }
        if let Ok(bypass) = env::var("AGENTRANK_RATE_LIMIT_BYPASS") {
            config.rate_limit.bypass_ips = bypass
                .split(',')
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Ok(level) = env::var("AGENTRANK_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(log_requests) = env::var("AGENTRANK_LOG_REQUESTS") {
            config.logging.log_requests = log_requests
                .parse()
                .context("Invalid AGENTRANK_LOG_REQUESTS value")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate for consistency before serving.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow!("Server host cannot be empty"));
        }
        if self.server.port == 0 {
            return Err(anyhow!("Server port must be non-zero"));
        }
        if self.graph.graph_key.is_empty() {
            return Err(anyhow!("Graph key cannot be empty"));
        }

        Url::parse(&self.payment.facilitator_url).context("Facilitator URL does not parse")?;
        if self.payment.timeout_secs == 0 || self.payment.timeout_secs > 300 {
            return Err(anyhow!(
                "Facilitator timeout must be within (0, 300] seconds, got {}",
                self.payment.timeout_secs
            ));
        }

        if !self.payment.evm_pay_to.starts_with("0x") || self.payment.evm_pay_to.len() != 42 {
            return Err(anyhow!(
                "EVM pay-to address must be a 0x-prefixed 20-byte hex address"
            ));
        }
        if self.payment.solana_pay_to.is_empty() {
            return Err(anyhow!("Solana pay-to address cannot be empty"));
        }
        if self.payment.solana_fee_payer.is_empty() {
            return Err(anyhow!("Solana fee-payer address cannot be empty"));
        }

        if self.rate_limit.hourly_limit == 0 {
            return Err(anyhow!("Hourly rate limit must be non-zero"));
        }

        Ok(())
    }
}
