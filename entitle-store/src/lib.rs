//! Replicated entitlement store.
//!
//! The store holds exactly one `StoredEntitlement` per cluster plus a term
//! that increases with every commit. All writes are compare-and-swap on the
//! term, which is what makes trial issuance exactly-once across nodes.
//!
//! # Components
//!
//! - **`EntitlementStore`**: the collaborator contract (read, CAS, change
//!   feed, leadership view)
//! - **`MemoryStore`**: an in-process implementation for single-node use and
//!   tests

mod error;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::{CasOutcome, ClusterView, EntitlementStore, Versioned};
