//! Graph snapshot loader
//!
//! Fetches the whole-graph snapshot from the shared KV under the configured
//! key. The snapshot is opaque and atomic: either the full graph parses or
//! the scoring endpoint reports the graph unavailable.

use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tracing::debug;

use crate::graph::model::GraphSnapshot;
use crate::kv::KvStore;

#[derive(Clone)]
pub struct GraphStore {
    kv: Arc<dyn KvStore>,
    graph_key: String,
}

impl GraphStore {
    pub fn new(kv: Arc<dyn KvStore>, graph_key: impl Into<String>) -> Self {
        Self {
            kv,
            graph_key: graph_key.into(),
        }
    }

    /// Read and parse the current snapshot. Miss and parse failure are both
    /// reported as errors; the caller maps them to the 503 envelope.
    pub async fn snapshot(&self) -> Result<GraphSnapshot> {
        let raw = self
            .kv
            .get(&self.graph_key)
            .await
            .context("knowledge graph read failed")?
            .ok_or_else(|| anyhow!("knowledge graph not found under key '{}'", self.graph_key))?;

        let snapshot: GraphSnapshot =
            serde_json::from_str(&raw).context("knowledge graph snapshot did not parse")?;

        debug!(
            entities = snapshot.entities.len(),
            relations = snapshot.relations.len(),
            "Loaded graph snapshot"
        );
        Ok(snapshot)
    }
}
