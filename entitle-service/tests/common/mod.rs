//! Shared test helpers for service tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::TimeDelta;
use entitle_crypto::{generate_random_key, EnvelopeKey, IssuerSigningKey};
use entitle_license::{
    EntitlementRecord, LifecycleState, OperationMode, RecordSpec, StoredEntitlement,
};
use entitle_service::{Dependent, DependentError, DependentResult, LicensingService};
use entitle_store::{
    CasOutcome, ClusterView, EntitlementStore, MemoryStore, StoreResult, Versioned,
};
use entitle_types::{ManualClock, RecordId, Timestamp};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Barrier};

// ── Keys and records ─────────────────────────────────────────────

/// Returns a deterministic issuer key from a fixed seed.
pub fn test_issuer() -> IssuerSigningKey {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    IssuerSigningKey::from_bytes(&seed)
}

/// An issuer the service does not trust.
pub fn rogue_issuer() -> IssuerSigningKey {
    IssuerSigningKey::from_bytes(&[7u8; 32])
}

/// Fixed reference instant (2024-01-01T00:00:00Z).
pub fn t0() -> Timestamp {
    Timestamp::from_millis(1_704_067_200_000)
}

/// A gold record signed by the test issuer, valid in `[issue, expiry]`.
pub fn issued_record(issue: Timestamp, expiry: Timestamp) -> EntitlementRecord {
    RecordSpec::new("acme", issue, expiry, 10, OperationMode::Gold)
        .unwrap()
        .sign(&test_issuer())
        .unwrap()
}

/// A gold record issued a day before `t0` and valid for 30 days.
pub fn current_record() -> EntitlementRecord {
    issued_record(t0() - TimeDelta::days(1), t0() + TimeDelta::days(29))
}

pub fn stored(record: &EntitlementRecord) -> StoredEntitlement {
    StoredEntitlement::record_of(record.clone())
}

// ── Dependents ───────────────────────────────────────────────────

/// Records every notification it receives.
pub struct RecordingDependent {
    id: String,
    pub changes: Mutex<Vec<(Option<RecordId>, LifecycleState)>>,
    ack_messages: Vec<String>,
    expiration_messages: Vec<String>,
    fail: AtomicBool,
    panic: AtomicBool,
    expiration_reads: AtomicUsize,
}

impl RecordingDependent {
    pub fn new(id: &str) -> Arc<Self> {
        Self::build(id, Vec::new(), Vec::new())
    }

    /// A dependent that objects to every replacement.
    pub fn objecting(id: &str, message: &str) -> Arc<Self> {
        Self::build(id, vec![message.to_string()], Vec::new())
    }

    /// A dependent that degrades on expiry.
    pub fn expiring(id: &str, message: &str) -> Arc<Self> {
        Self::build(id, Vec::new(), vec![message.to_string()])
    }

    fn build(id: &str, ack_messages: Vec<String>, expiration_messages: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            changes: Mutex::new(Vec::new()),
            ack_messages,
            expiration_messages,
            fail: AtomicBool::new(false),
            panic: AtomicBool::new(false),
            expiration_reads: AtomicUsize::new(0),
        })
    }

    /// Makes every later `on_change` fail after recording.
    pub fn fail_from_now_on(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Makes every later `on_change` panic after recording.
    pub fn panic_from_now_on(&self) {
        self.panic.store(true, Ordering::SeqCst);
    }

    /// How many times an expiration warning asked for this dependent's messages.
    pub fn expiration_reads(&self) -> usize {
        self.expiration_reads.load(Ordering::SeqCst)
    }

    pub fn changes(&self) -> Vec<(Option<RecordId>, LifecycleState)> {
        self.changes.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.changes.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<(Option<RecordId>, LifecycleState)> {
        self.changes.lock().unwrap().last().cloned()
    }
}

impl Dependent for RecordingDependent {
    fn id(&self) -> &str {
        &self.id
    }

    fn on_change(
        &self,
        record: Option<&EntitlementRecord>,
        state: LifecycleState,
    ) -> DependentResult<()> {
        self.changes
            .lock()
            .unwrap()
            .push((record.map(EntitlementRecord::id), state));
        if self.panic.load(Ordering::SeqCst) {
            panic!("{} blew up applying {state}", self.id);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(DependentError::Apply("refusing on purpose".into()));
        }
        Ok(())
    }

    fn expiration_messages(&self) -> Vec<String> {
        self.expiration_reads.fetch_add(1, Ordering::SeqCst);
        self.expiration_messages.clone()
    }

    fn acknowledgment_messages(
        &self,
        _current: &EntitlementRecord,
        _new: &EntitlementRecord,
    ) -> Vec<String> {
        self.ack_messages.clone()
    }
}

// ── Stores ───────────────────────────────────────────────────────

/// Holds every `get` until two callers have read, so both observe the same
/// term before either writes.
pub struct RacingStore {
    pub inner: MemoryStore,
    barrier: Barrier,
}

impl RacingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            barrier: Barrier::new(2),
        }
    }
}

#[async_trait]
impl EntitlementStore for RacingStore {
    async fn get(&self) -> StoreResult<Versioned> {
        let value = self.inner.get().await?;
        self.barrier.wait().await;
        Ok(value)
    }

    async fn compare_and_swap(
        &self,
        expected_term: u64,
        value: StoredEntitlement,
    ) -> StoreResult<CasOutcome> {
        self.inner.compare_and_swap(expected_term, value).await
    }

    fn subscribe(&self) -> broadcast::Receiver<Versioned> {
        self.inner.subscribe()
    }

    fn cluster_view(&self) -> ClusterView {
        self.inner.cluster_view()
    }
}

/// Lets another writer commit a tombstone right after the next `get`.
pub struct InterleavingStore {
    pub inner: MemoryStore,
    interfere: AtomicBool,
}

impl InterleavingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            interfere: AtomicBool::new(false),
        }
    }

    pub fn interfere_once(&self) {
        self.interfere.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl EntitlementStore for InterleavingStore {
    async fn get(&self) -> StoreResult<Versioned> {
        let value = self.inner.get().await?;
        if self.interfere.swap(false, Ordering::SeqCst) {
            self.inner
                .compare_and_swap(value.term, StoredEntitlement::Tombstone)
                .await?;
        }
        Ok(value)
    }

    async fn compare_and_swap(
        &self,
        expected_term: u64,
        value: StoredEntitlement,
    ) -> StoreResult<CasOutcome> {
        self.inner.compare_and_swap(expected_term, value).await
    }

    fn subscribe(&self) -> broadcast::Receiver<Versioned> {
        self.inner.subscribe()
    }

    fn cluster_view(&self) -> ClusterView {
        self.inner.cluster_view()
    }
}

// ── Service wiring ───────────────────────────────────────────────

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub envelope_key: EnvelopeKey,
    pub service: Arc<LicensingService>,
}

/// A service over a fresh `MemoryStore` with the clock pinned at `t0`.
pub fn harness(dependents: &[Arc<RecordingDependent>]) -> Harness {
    harness_with_store(MemoryStore::new(), dependents)
}

pub fn harness_with_store(store: MemoryStore, dependents: &[Arc<RecordingDependent>]) -> Harness {
    let clock = Arc::new(ManualClock::new(t0()));
    let store = Arc::new(store);
    let envelope_key = generate_random_key();

    let mut builder = LicensingService::builder(
        store.clone(),
        test_issuer().verifying_key(),
        envelope_key.clone(),
    )
    .clock(clock.clone());
    for dependent in dependents {
        builder = builder.dependent(dependent.clone());
    }

    Harness {
        clock,
        store,
        envelope_key,
        service: builder.build(),
    }
}

/// Polls `condition` until it holds or five seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
