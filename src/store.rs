//! Pluggable storage for designs, traces and strategies.
//!
//! Stores are scoped per dialogue context and passed explicitly; nothing in
//! the crate holds module-level state. The in-memory backends are the
//! reference implementations and what the test suites run against. A small
//! TTL cache holds derived artifacts (views, orthogonality verdicts) keyed
//! by a stable content hash, so recomputation under races is always safe.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::design::{Design, DesignId};
use crate::dispute::{Trace, TraceId};
use crate::strategy::{Strategy, StrategyId};

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Design {0} already exists")]
    DuplicateDesign(DesignId),

    #[error("Design {0} does not exist")]
    DesignMissing(DesignId),

    #[error("Strategy {0} does not exist")]
    StrategyMissing(StrategyId),

    #[error("The trace row was superseded by a concurrent write")]
    TraceSuperseded,

    #[error("A lock was poisoned by a panicking writer")]
    LockPoisoned,
}

/// A design together with its monotone revision counter.
///
/// The revision bumps on every update; traces record the revisions they were
/// computed against so staleness is detectable.
#[derive(Debug, Clone)]
pub struct VersionedDesign {
    /// The stored design.
    pub design: Design,
    /// Current revision, starting at 0.
    pub revision: u64,
}

/// Storage for designs.
pub trait DesignStore: Send + Sync {
    /// Inserts a new design at revision 0.
    ///
    /// # Errors
    ///
    /// Fails if the ID is already present.
    fn insert(&self, design: Design) -> Result<(), StorageError>;

    /// Fetches a design with its revision.
    ///
    /// # Errors
    ///
    /// Fails only on backend faults; a missing design is `Ok(None)`.
    fn get(&self, id: DesignId) -> Result<Option<VersionedDesign>, StorageError>;

    /// Replaces a design's content, bumping its revision.
    ///
    /// # Errors
    ///
    /// Fails if the design does not exist.
    fn update(&self, design: Design) -> Result<u64, StorageError>;
}

/// Storage for interaction traces, one row per ordered design pair.
pub trait TraceStore: Send + Sync {
    /// Fetches the trace for a design pair.
    ///
    /// # Errors
    ///
    /// Fails only on backend faults.
    fn get(&self, pos: DesignId, neg: DesignId) -> Result<Option<Trace>, StorageError>;

    /// Writes the trace for a pair, conditional on the currently stored row.
    ///
    /// `expected` is the ID of the row the caller read (or `None` for a
    /// fresh pair); a mismatch means a concurrent writer got there first.
    ///
    /// # Errors
    ///
    /// Fails with [`StorageError::TraceSuperseded`] on a conflict.
    fn put_if(
        &self,
        trace: Trace,
        expected: Option<TraceId>,
    ) -> Result<(), StorageError>;

    /// Drops the trace for a pair, if present.
    ///
    /// # Errors
    ///
    /// Fails only on backend faults.
    fn remove(&self, pos: DesignId, neg: DesignId) -> Result<(), StorageError>;
}

/// Storage for built strategies.
pub trait StrategyStore: Send + Sync {
    /// Inserts or replaces a strategy.
    ///
    /// # Errors
    ///
    /// Fails only on backend faults.
    fn put(&self, strategy: Strategy) -> Result<(), StorageError>;

    /// Fetches a strategy.
    ///
    /// # Errors
    ///
    /// Fails only on backend faults.
    fn get(&self, id: StrategyId) -> Result<Option<Strategy>, StorageError>;
}

/// In-memory design store.
#[derive(Debug, Default)]
pub struct InMemoryDesignStore {
    designs: RwLock<HashMap<DesignId, VersionedDesign>>,
}

impl DesignStore for InMemoryDesignStore {
    fn insert(&self, design: Design) -> Result<(), StorageError> {
        let mut designs = self.designs.write().map_err(|_| StorageError::LockPoisoned)?;
        if designs.contains_key(&design.id) {
            return Err(StorageError::DuplicateDesign(design.id));
        }
        designs.insert(
            design.id,
            VersionedDesign {
                design,
                revision: 0,
            },
        );
        Ok(())
    }

    fn get(&self, id: DesignId) -> Result<Option<VersionedDesign>, StorageError> {
        let designs = self.designs.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(designs.get(&id).cloned())
    }

    fn update(&self, design: Design) -> Result<u64, StorageError> {
        let mut designs = self.designs.write().map_err(|_| StorageError::LockPoisoned)?;
        let entry = designs
            .get_mut(&design.id)
            .ok_or(StorageError::DesignMissing(design.id))?;
        entry.design = design;
        entry.revision += 1;
        Ok(entry.revision)
    }
}

/// In-memory trace store.
#[derive(Debug, Default)]
pub struct InMemoryTraceStore {
    traces: RwLock<HashMap<(DesignId, DesignId), Trace>>,
}

impl TraceStore for InMemoryTraceStore {
    fn get(&self, pos: DesignId, neg: DesignId) -> Result<Option<Trace>, StorageError> {
        let traces = self.traces.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(traces.get(&(pos, neg)).cloned())
    }

    fn put_if(&self, trace: Trace, expected: Option<TraceId>) -> Result<(), StorageError> {
        let mut traces = self.traces.write().map_err(|_| StorageError::LockPoisoned)?;
        let key = (trace.pos_design, trace.neg_design);
        let current = traces.get(&key).map(|row| row.id);
        if current != expected {
            return Err(StorageError::TraceSuperseded);
        }
        traces.insert(key, trace);
        Ok(())
    }

    fn remove(&self, pos: DesignId, neg: DesignId) -> Result<(), StorageError> {
        let mut traces = self.traces.write().map_err(|_| StorageError::LockPoisoned)?;
        traces.remove(&(pos, neg));
        Ok(())
    }
}

/// In-memory strategy store.
#[derive(Debug, Default)]
pub struct InMemoryStrategyStore {
    strategies: RwLock<HashMap<StrategyId, Strategy>>,
}

impl StrategyStore for InMemoryStrategyStore {
    fn put(&self, strategy: Strategy) -> Result<(), StorageError> {
        let mut strategies = self
            .strategies
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        strategies.insert(strategy.id, strategy);
        Ok(())
    }

    fn get(&self, id: StrategyId) -> Result<Option<Strategy>, StorageError> {
        let strategies = self
            .strategies
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(strategies.get(&id).cloned())
    }
}

struct CacheEntry {
    stored_at: DateTime<Utc>,
    value: serde_json::Value,
}

/// TTL cache for derived artifacts.
///
/// Keys are blake3 hashes over the source IDs and parameters that produced
/// the artifact; entries past the TTL are dropped on read.
pub struct DerivedCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl DerivedCache {
    /// Creates a cache whose entries expire after `ttl_secs` seconds.
    #[must_use]
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Builds a stable cache key from identifying parts.
    #[must_use]
    pub fn key(parts: &[&str]) -> String {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update(b"\x1f");
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Fetches a cached value, dropping it if expired.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let expired = {
            let entries = self.entries.read().ok()?;
            let entry = entries.get(key)?;
            if Utc::now() - entry.stored_at > self.ttl {
                true
            } else {
                return serde_json::from_value(entry.value.clone()).ok();
            }
        };
        if expired {
            if let Ok(mut entries) = self.entries.write() {
                entries.remove(key);
            }
        }
        None
    }

    /// Stores a value under a key.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) {
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key.to_string(),
                CacheEntry {
                    stored_at: Utc::now(),
                    value,
                },
            );
        }
    }

    /// Evicts all expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let cutoff = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| cutoff - entry.stored_at <= self.ttl);
        before - entries.len()
    }

    /// Number of live entries, counting expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    /// Returns true if the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
