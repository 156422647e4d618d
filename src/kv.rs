//! Shared key-value store binding
//!
//! The oracle keeps all cross-request state in an external KV store: the
//! graph snapshot (read-only from here), the reputation cache, and the
//! per-IP rate counters. `KvStore` is the seam a deployment binds its store
//! behind; `MemoryKv` is the in-process implementation used when no external
//! binding is configured (and by the test suite).

use anyhow::Result;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Minimal async KV interface with optional per-key expiry.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value. `ttl: Some(d)` sets the key to expire after `d`;
    /// `ttl: None` keeps the expiry an existing key already has (a fresh key
    /// written with `None` never expires).
    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// In-process KV with TTL semantics matching the external store.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: DashMap<String, (String, Option<Instant>)>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    fn is_expired(deadline: &Option<Instant>) -> bool {
        matches!(deadline, Some(at) if Instant::now() >= *at)
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            let (value, deadline) = entry.value();
            if Self::is_expired(deadline) {
                drop(entry);
                self.entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(value.clone()));
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let deadline = match ttl {
            Some(d) => Some(Instant::now() + d),
            None => {
                // Copy the existing deadline out before inserting so the
                // shard read guard is released.
                let existing = self.entries.get(key).and_then(|entry| entry.value().1);
                existing.filter(|at| Instant::now() < *at)
            }
        };
        self.entries.insert(key.to_string(), (value, deadline));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
