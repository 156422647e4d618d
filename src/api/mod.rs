//! HTTP API for the AgentRank oracle
//!
//! Provides:
//! - Route table with content-negotiated landing and health endpoints
//! - The paid scoring endpoint
//! - CORS and rate-limiting middleware
//! - JSON error envelopes

pub mod error;
pub mod middleware;
pub mod router;
pub mod score;

pub use error::ApiError;
pub use middleware::{RateLimiter, client_ip, cors_middleware};
pub use router::build_router;
pub use score::{PaymentEcho, ScoreRequest, ScoreResponse, score_entity};

use anyhow::Result;
use std::sync::Arc;

use crate::config::AgentRankConfig;
use crate::graph::GraphStore;
use crate::kv::KvStore;
use crate::payment::FacilitatorClient;
use crate::trust::ReputationEngine;

/// Shared application state: configuration plus the handles every request
/// needs. All shared mutable state lives behind the KV seam.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AgentRankConfig>,
    pub kv: Arc<dyn KvStore>,
    pub graph: GraphStore,
    pub reputation: ReputationEngine,
    pub rate_limiter: RateLimiter,
    pub facilitator: FacilitatorClient,
}

impl AppState {
    pub fn new(config: Arc<AgentRankConfig>, kv: Arc<dyn KvStore>) -> Result<Self> {
        let facilitator = FacilitatorClient::new(
            &config.payment.facilitator_url,
            config.payment.timeout_secs,
        )?;
        let graph = GraphStore::new(kv.clone(), config.graph.graph_key.clone());
        let reputation = ReputationEngine::new(kv.clone());
        let rate_limiter = RateLimiter::new(
            kv.clone(),
            config.rate_limit.hourly_limit,
            config.rate_limit.bypass_ips.iter().cloned(),
        );

        Ok(Self {
            config,
            kv,
            graph,
            reputation,
            rate_limiter,
            facilitator,
        })
    }
}
