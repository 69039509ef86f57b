//! Store collaborator contract.

use crate::error::StoreResult;
use async_trait::async_trait;
use entitle_license::StoredEntitlement;
use tokio::sync::broadcast;

/// A stored value together with the term it was committed at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Versioned {
    /// Monotonic commit counter. `0` means nothing was ever committed.
    pub term: u64,
    pub value: StoredEntitlement,
}

impl Versioned {
    pub fn new(term: u64, value: StoredEntitlement) -> Self {
        Self { term, value }
    }
}

/// Result of a compare-and-swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// Written; carries the new term.
    Committed { term: u64 },
    /// The term moved since the caller read it. Nothing was written.
    Conflict { current_term: u64 },
}

impl CasOutcome {
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// What this node currently knows about the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClusterView {
    /// A cluster configuration has been committed and is observable.
    pub config_committed: bool,
    /// This node is the elected writer.
    pub is_leader: bool,
}

impl ClusterView {
    /// True when this node may originate cluster-wide writes on its own
    /// initiative (trial issuance).
    #[must_use]
    pub fn can_originate_writes(&self) -> bool {
        self.config_committed && self.is_leader
    }
}

/// The replicated, versioned holder of the cluster's entitlement.
///
/// Implementations provide linearizable reads and CAS, deliver change events
/// only after a write is durably committed, and expose a single-leader view.
/// They never validate records.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Reads the current value and its term.
    async fn get(&self) -> StoreResult<Versioned>;

    /// Writes `value` if the current term is still `expected_term`.
    async fn compare_and_swap(
        &self,
        expected_term: u64,
        value: StoredEntitlement,
    ) -> StoreResult<CasOutcome>;

    /// Subscribes to committed changes.
    fn subscribe(&self) -> broadcast::Receiver<Versioned>;

    /// Returns this node's view of cluster membership and leadership.
    fn cluster_view(&self) -> ClusterView;
}
