//! In-process store.
//!
//! Behaves like a single-member cluster: every commit is immediately
//! "quorum-acknowledged" and published on the change feed. Leadership,
//! configuration and availability are switches so tests and demos can play
//! the other roles.

use crate::error::{StoreError, StoreResult};
use crate::store::{CasOutcome, ClusterView, EntitlementStore, Versioned};
use async_trait::async_trait;
use entitle_license::StoredEntitlement;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

/// Capacity of the change feed. Slow subscribers skip to newer values.
const FEED_CAPACITY: usize = 64;

/// An in-memory `EntitlementStore`.
pub struct MemoryStore {
    current: Mutex<Versioned>,
    feed: broadcast::Sender<Versioned>,
    leader: AtomicBool,
    config_committed: AtomicBool,
    available: AtomicBool,
    commits: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store where this node is the committed leader.
    pub fn new() -> Self {
        Self::with_value(Versioned::default())
    }

    /// Creates a store that already holds `initial`.
    pub fn with_value(initial: Versioned) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            current: Mutex::new(initial),
            feed,
            leader: AtomicBool::new(true),
            config_committed: AtomicBool::new(true),
            available: AtomicBool::new(true),
            commits: AtomicU64::new(0),
        }
    }

    /// Marks this node as leader or follower.
    pub fn set_leader(&self, leader: bool) {
        self.leader.store(leader, Ordering::SeqCst);
    }

    /// Marks the cluster configuration as committed or not.
    pub fn set_config_committed(&self, committed: bool) {
        self.config_committed.store(committed, Ordering::SeqCst);
    }

    /// Simulates losing (or regaining) the store.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of successful writes since construction.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store switched off".to_string()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntitlementStore for MemoryStore {
    async fn get(&self) -> StoreResult<Versioned> {
        self.ensure_available()?;
        Ok(self.current.lock().await.clone())
    }

    async fn compare_and_swap(
        &self,
        expected_term: u64,
        value: StoredEntitlement,
    ) -> StoreResult<CasOutcome> {
        self.ensure_available()?;
        if value.is_absent() {
            return Err(StoreError::IllegalTransition(
                "a stored entitlement never returns to absent".to_string(),
            ));
        }

        let mut current = self.current.lock().await;
        if current.term != expected_term {
            debug!(
                expected_term,
                current_term = current.term,
                "compare-and-swap conflict"
            );
            return Ok(CasOutcome::Conflict {
                current_term: current.term,
            });
        }

        current.term += 1;
        current.value = value;
        self.commits.fetch_add(1, Ordering::SeqCst);
        info!(term = current.term, "entitlement committed");

        // Published under the lock so subscribers see commits in term order.
        // No subscribers is fine; the value is still committed.
        let _ = self.feed.send(current.clone());
        Ok(CasOutcome::Committed { term: current.term })
    }

    fn subscribe(&self) -> broadcast::Receiver<Versioned> {
        self.feed.subscribe()
    }

    fn cluster_view(&self) -> ClusterView {
        ClusterView {
            config_committed: self.config_committed.load(Ordering::SeqCst),
            is_leader: self.leader.load(Ordering::SeqCst),
        }
    }
}
