//! AgentRank Oracle
//!
//! Paid trust-scoring service over a directed, labeled knowledge graph of
//! software agents. Each scoring query is gated by an x402 micropayment
//! verified and settled against an external facilitator.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Configuration management
//! ├── kv.rs          - Shared KV binding (graph, rate counters, caches)
//! ├── graph/         - Knowledge-graph model
//! │   ├── model.rs   - Entities, observations, relations, trust weights
//! │   └── store.rs   - Snapshot loading from the shared KV
//! ├── trust/         - Trust scoring
//! │   ├── reputation.rs - Damped propagation over trust-typed edges
//! │   ├── composite.rs  - Seven-component composite score
//! │   ├── screener.rs   - Regex-family context classifier
//! │   └── assemble.rs   - Tiers, recommendations, rank, neighborhoods
//! ├── payment/       - x402 payment gate
//! │   ├── requirements.rs - 402 requirement document
//! │   ├── proof.rs        - Proof decoding and shape classification
//! │   └── facilitator.rs  - Verify-then-settle facilitator client
//! └── api/           - HTTP surface
//!     ├── router.rs     - Routes, landing, health
//!     ├── score.rs      - Paid scoring pipeline
//!     ├── middleware.rs - CORS, client IP, rate limiting
//!     └── error.rs      - JSON error envelopes
//! ```

pub mod api;
pub mod config;
pub mod graph;
pub mod kv;
pub mod payment;
pub mod trust;

// Re-export main types for convenience
pub use api::{ApiError, AppState, RateLimiter, build_router};
pub use config::AgentRankConfig;
pub use graph::{Entity, GraphSnapshot, GraphStore, Observation, Relation, trust_weight};
pub use kv::{KvStore, MemoryKv};
pub use payment::{
    FacilitatorClient, FacilitatorError, PaymentGateError, ProofKind, RequirementsDoc,
    build_requirements, decode_proof,
};
pub use trust::{
    ComponentBreakdown, RawSignals, Recommendation, ReputationEngine, SafetyReport, Verdict,
    composite_score, compute_reputation, rank_of, recommendation_for, screen, tier_for,
};
