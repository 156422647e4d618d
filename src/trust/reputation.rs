//! Graph reputation engine
//!
//! Damped random-walk propagation over the trust-typed edge subset, min-max
//! normalized to [0,1] and cached in the shared KV with a fixed TTL. The
//! computation is deterministic for a given snapshot, so concurrent cache
//! writers racing on the same key all write the same value.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::graph::model::{GraphSnapshot, trust_weight};
use crate::kv::KvStore;

/// Damping factor of the propagation walk.
pub const DAMPING: f64 = 0.85;
/// Iteration bound; pathological graphs must not exhaust the request budget.
pub const MAX_ITERATIONS: usize = 50;
/// Convergence tolerance on the max per-entity delta.
pub const CONVERGENCE_EPSILON: f64 = 0.001;
/// Cache key; the version suffix invalidates cached vectors across schema changes.
pub const REPUTATION_CACHE_KEY: &str = "reputation:v2";
/// Cache TTL.
pub const REPUTATION_CACHE_TTL: Duration = Duration::from_secs(8 * 3600);

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Compute the reputation vector for a snapshot.
///
/// Entities absent from the snapshot resolve to 0 at lookup time. A graph
/// with no trust-typed edges converges to a uniform vector and takes the
/// degenerate normalization branch (everyone 0.5).
pub fn compute_reputation(snapshot: &GraphSnapshot) -> HashMap<String, f64> {
    let names: Vec<&str> = snapshot.entities.iter().map(|e| e.name.as_str()).collect();
    let n = names.len();
    if n == 0 {
        return HashMap::new();
    }

    let index: HashMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();

    // Derived indices are built once per compute, not per entity.
    let mut out_deg = vec![0usize; n];
    let mut in_edges: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for relation in &snapshot.relations {
        let Some(weight) = trust_weight(&relation.relation) else {
            continue;
        };
        // Edges pointing at unknown entities are tolerated and skipped.
        let (Some(&src), Some(&dst)) = (
            index.get(relation.source.as_str()),
            index.get(relation.target.as_str()),
        ) else {
            continue;
        };
        out_deg[src] += 1;
        in_edges[dst].push((src, weight));
    }

    let mut scores = vec![1.0f64; n];
    for iteration in 0..MAX_ITERATIONS {
        let mut next = vec![0.0f64; n];
        let mut max_delta = 0.0f64;
        for v in 0..n {
            let incoming: f64 = in_edges[v]
                .iter()
                .map(|&(u, w)| (scores[u] / out_deg[u].max(1) as f64) * w)
                .sum();
            next[v] = (1.0 - DAMPING) + DAMPING * incoming;
            max_delta = max_delta.max((next[v] - scores[v]).abs());
        }
        scores = next;
        if max_delta < CONVERGENCE_EPSILON {
            debug!(iterations = iteration + 1, "Reputation walk converged");
            break;
        }
    }

    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    names
        .into_iter()
        .zip(scores)
        .map(|(name, score)| {
            let normalized = if range < 1e-4 {
                0.5
            } else {
                round4((score - min) / range)
            };
            (name.to_string(), normalized)
        })
        .collect()
}

/// Cache-fronted reputation computation over the shared KV.
#[derive(Clone)]
pub struct ReputationEngine {
    kv: Arc<dyn KvStore>,
}

impl ReputationEngine {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Return the cached vector when present, otherwise compute and write
    /// back. Cache read/write failures are never fatal.
    pub async fn reputation(&self, snapshot: &GraphSnapshot) -> HashMap<String, f64> {
        match self.kv.get(REPUTATION_CACHE_KEY).await {
            Ok(Some(raw)) => {
                if let Ok(cached) = serde_json::from_str::<HashMap<String, f64>>(&raw) {
                    return cached;
                }
                warn!("Cached reputation vector did not parse, recomputing");
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Reputation cache read failed, recomputing"),
        }

        let scores = compute_reputation(snapshot);
        if let Err(e) = self.write_back(&scores).await {
            warn!(error = %e, "Reputation cache write failed");
        }
        scores
    }

    async fn write_back(&self, scores: &HashMap<String, f64>) -> Result<()> {
        let raw = serde_json::to_string(scores)?;
        self.kv
            .put(REPUTATION_CACHE_KEY, raw, Some(REPUTATION_CACHE_TTL))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::{Entity, Relation};
    use crate::kv::MemoryKv;
    use chrono::Utc;

    fn entity(name: &str) -> Entity {
        Entity {
            name: name.to_string(),
            entity_type: "agent".to_string(),
            created: Utc::now(),
            updated: None,
            observations: vec![],
        }
    }

    fn relation(source: &str, target: &str, label: &str) -> Relation {
        Relation {
            source: source.to_string(),
            target: target.to_string(),
            relation: label.to_string(),
        }
    }

    fn chain_snapshot() -> GraphSnapshot {
        GraphSnapshot {
            entities: vec![entity("a"), entity("b"), entity("c")],
            relations: vec![
                relation("a", "b", "trusts"),
                relation("b", "c", "endorsed_by"),
                relation("a", "c", "uses"),
            ],
        }
    }

    #[test]
    fn test_scores_are_normalized_to_unit_interval() {
        let scores = compute_reputation(&chain_snapshot());
        for (name, score) in &scores {
            assert!((0.0..=1.0).contains(score), "{name} out of range: {score}");
        }
        // Min-max normalization pins the extremes.
        assert!(scores.values().any(|s| *s == 0.0));
        assert!(scores.values().any(|s| *s == 1.0));
    }

    #[test]
    fn test_recomputation_is_idempotent() {
        let snapshot = chain_snapshot();
        assert_eq!(compute_reputation(&snapshot), compute_reputation(&snapshot));
    }

    #[test]
    fn test_no_trust_edges_is_uniform_half() {
        let snapshot = GraphSnapshot {
            entities: vec![entity("a"), entity("b"), entity("c")],
            relations: vec![relation("a", "b", "mentions")],
        };
        let scores = compute_reputation(&snapshot);
        assert_eq!(scores.len(), 3);
        assert!(scores.values().all(|s| *s == 0.5));
    }

    #[test]
    fn test_dangling_relations_are_skipped() {
        let snapshot = GraphSnapshot {
            entities: vec![entity("a"), entity("b")],
            relations: vec![
                relation("a", "b", "trusts"),
                relation("ghost", "b", "trusts"),
                relation("a", "ghost", "endorsed_by"),
            ],
        };
        let scores = compute_reputation(&snapshot);
        assert_eq!(scores.len(), 2);
        assert!(!scores.contains_key("ghost"));
    }

    #[test]
    fn test_empty_graph_is_empty_vector() {
        assert!(compute_reputation(&GraphSnapshot::default()).is_empty());
    }

    #[test]
    fn test_more_inbound_trust_ranks_higher() {
        let snapshot = GraphSnapshot {
            entities: vec![entity("hub"), entity("x"), entity("y"), entity("z")],
            relations: vec![
                relation("x", "hub", "trusts"),
                relation("y", "hub", "trusts"),
                relation("z", "hub", "verified_by"),
                relation("hub", "x", "uses"),
            ],
        };
        let scores = compute_reputation(&snapshot);
        assert!(scores["hub"] > scores["y"]);
        assert!(scores["hub"] > scores["z"]);
    }

    #[tokio::test]
    async fn test_cache_hit_short_circuits_compute() {
        let kv = Arc::new(MemoryKv::new());
        kv.put(
            REPUTATION_CACHE_KEY,
            r#"{"cached_only":0.9}"#.to_string(),
            None,
        )
        .await
        .unwrap();

        let engine = ReputationEngine::new(kv);
        let scores = engine.reputation(&chain_snapshot()).await;
        assert_eq!(scores.get("cached_only"), Some(&0.9));
        assert!(!scores.contains_key("a"));
    }

    #[tokio::test]
    async fn test_miss_computes_and_writes_back() {
        let kv = Arc::new(MemoryKv::new());
        let engine = ReputationEngine::new(kv.clone());

        let scores = engine.reputation(&chain_snapshot()).await;
        assert_eq!(scores.len(), 3);

        let cached = kv.get(REPUTATION_CACHE_KEY).await.unwrap().unwrap();
        let parsed: HashMap<String, f64> = serde_json::from_str(&cached).unwrap();
        assert_eq!(parsed, scores);
    }
}
