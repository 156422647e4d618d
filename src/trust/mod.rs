//! Trust scoring: reputation walk, composite score, context screening,
//! response assembly

pub mod assemble;
pub mod composite;
pub mod reputation;
pub mod screener;

pub use assemble::{
    RankInfo, Recommendation, TrustEdge, TrustNetwork, rank_of, recommendation_for, tier_for,
    trust_network,
};
pub use composite::{ComponentBreakdown, RawSignals, composite_score};
pub use reputation::{ReputationEngine, compute_reputation};
pub use screener::{SafetyReport, Severity, Verdict, screen};
