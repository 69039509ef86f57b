//! The licensing service.
//!
//! Owns the cached store value, the per-dependent notification state and the
//! scheduler jobs derived from the installed record. Every entry point funnels
//! into the same compare-and-update step: derive the state, compare it with
//! what each dependent last saw, notify only those that differ.

use crate::acknowledgment::{collect_acknowledgments, RegistrationResponse, RegistrationStatus};
use crate::config::LicensingConfig;
use crate::dependent::Dependent;
use crate::error::{ServiceError, ServiceResult};
use crate::trial::{TrialIssuer, TrialOutcome};
use crate::warnings::compose_expiration_warning;
use entitle_crypto::{EnvelopeKey, IssuerVerifyingKey};
use entitle_license::{
    EntitlementRecord, ExpirationPolicy, LifecycleState, StateResolver, StoredEntitlement,
    Verifier,
};
use entitle_scheduler::{SchedulerEngine, SchedulerEvent, SchedulerListener, SchedulerResult};
use entitle_store::{CasOutcome, EntitlementStore, Versioned};
use entitle_types::{Clock, SystemClock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Name of the job that fires at each lifecycle boundary of the record.
pub const EXPIRY_JOB: &str = "expiry";

/// What `remove` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The tombstone was written.
    Removed,
    /// A tombstone was already stored. Nothing was written.
    AlreadyRemoved,
}

/// What a dependent was last told.
#[derive(Debug, Clone, PartialEq)]
struct Notified {
    record: Option<Arc<EntitlementRecord>>,
    state: LifecycleState,
}

impl Notified {
    fn initial() -> Self {
        Self {
            record: None,
            state: LifecycleState::Disabled,
        }
    }
}

struct Tracked {
    dependent: Arc<dyn Dependent>,
    last: Notified,
}

struct Inner {
    cached: Versioned,
    tracked: Vec<Tracked>,
}

impl Inner {
    /// Updates every pair that differs from `current` and returns the
    /// dependents to notify.
    fn claim_changed(&mut self, current: &Notified) -> Vec<Arc<dyn Dependent>> {
        self.tracked
            .iter_mut()
            .filter(|t| t.last != *current)
            .map(|t| {
                t.last = current.clone();
                Arc::clone(&t.dependent)
            })
            .collect()
    }

    fn dependents(&self) -> Vec<Arc<dyn Dependent>> {
        self.tracked.iter().map(|t| Arc::clone(&t.dependent)).collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builder for [`LicensingService`].
pub struct LicensingServiceBuilder {
    store: Arc<dyn EntitlementStore>,
    issuer_key: IssuerVerifyingKey,
    envelope_key: EnvelopeKey,
    clock: Arc<dyn Clock>,
    config: LicensingConfig,
    policies: Vec<ExpirationPolicy>,
    dependents: Vec<Arc<dyn Dependent>>,
}

impl LicensingServiceBuilder {
    /// Replaces the wall clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: LicensingConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default expiration warning policies.
    pub fn policies(mut self, policies: Vec<ExpirationPolicy>) -> Self {
        self.policies = policies;
        self
    }

    /// Adds a dependent known at wiring time.
    pub fn dependent(mut self, dependent: Arc<dyn Dependent>) -> Self {
        self.dependents.push(dependent);
        self
    }

    pub fn build(self) -> Arc<LicensingService> {
        let Self {
            store,
            issuer_key,
            envelope_key,
            clock,
            config,
            policies,
            dependents,
        } = self;

        Arc::new_cyclic(|weak: &Weak<LicensingService>| {
            let scheduler = SchedulerEngine::new(Arc::clone(&clock), config.scheduler_config());
            scheduler.register(Arc::new(JobListener {
                service: weak.clone(),
            }));

            let tracked = dependents
                .into_iter()
                .map(|dependent| Tracked {
                    dependent,
                    last: Notified::initial(),
                })
                .collect();

            LicensingService {
                verifier: Verifier::new(issuer_key, envelope_key.clone()),
                trial: TrialIssuer::new(Arc::clone(&clock), envelope_key, &config),
                resolver: config.resolver(),
                store,
                clock,
                policies,
                scheduler,
                inner: Mutex::new(Inner {
                    cached: Versioned::default(),
                    tracked,
                }),
                feed_task: Mutex::new(None),
            }
        })
    }
}

/// Orchestrates registration, removal, trial issuance and dependent
/// notification for the cluster's single entitlement.
pub struct LicensingService {
    store: Arc<dyn EntitlementStore>,
    verifier: Verifier,
    resolver: StateResolver,
    trial: TrialIssuer,
    clock: Arc<dyn Clock>,
    policies: Vec<ExpirationPolicy>,
    scheduler: SchedulerEngine,
    inner: Mutex<Inner>,
    feed_task: Mutex<Option<JoinHandle<()>>>,
}

impl LicensingService {
    /// Starts building a service with the wall clock, default config and
    /// default warning policies.
    pub fn builder(
        store: Arc<dyn EntitlementStore>,
        issuer_key: IssuerVerifyingKey,
        envelope_key: EnvelopeKey,
    ) -> LicensingServiceBuilder {
        LicensingServiceBuilder {
            store,
            issuer_key,
            envelope_key,
            clock: Arc::new(SystemClock),
            config: LicensingConfig::default(),
            policies: ExpirationPolicy::defaults(),
            dependents: Vec::new(),
        }
    }

    /// The scheduler driving expiry transitions and warnings.
    pub fn scheduler(&self) -> &SchedulerEngine {
        &self.scheduler
    }

    // ── Registration ─────────────────────────────────────────────

    /// Validates `record` and, if acceptable, stores it in place of the
    /// current value.
    ///
    /// Without `acknowledged`, replacing a live record that some dependent
    /// (or the older-license check) objects to returns
    /// `NeedsAcknowledgment` and writes nothing.
    ///
    /// # Errors
    ///
    /// Store failures, and `Conflict` when another write landed between the
    /// read and the compare-and-swap.
    pub async fn register(
        &self,
        record: EntitlementRecord,
        acknowledged: bool,
    ) -> ServiceResult<RegistrationResponse> {
        let now = self.clock.now();

        if record.auto_generated() {
            info!(record_id = %record.id(), "rejected registration of a self-generated record");
            return Ok(RegistrationResponse::status(RegistrationStatus::Invalid));
        }
        if !self.verifier.verify(&record) || record.issue_date() > now {
            info!(record_id = %record.id(), "rejected invalid license");
            return Ok(RegistrationResponse::status(RegistrationStatus::Invalid));
        }
        if record.expiry_date() < now {
            info!(record_id = %record.id(), expiry = %record.expiry_date(), "rejected expired license");
            return Ok(RegistrationResponse::status(RegistrationStatus::Expired));
        }

        let current = self.store.get().await?;
        if !acknowledged {
            if let Some(installed) = current.value.record() {
                let dependents = lock(&self.inner).dependents();
                let acknowledgments = collect_acknowledgments(&dependents, installed, &record);
                if !acknowledgments.is_empty() {
                    debug!(
                        record_id = %record.id(),
                        count = acknowledgments.len(),
                        "registration needs acknowledgment"
                    );
                    return Ok(RegistrationResponse::needs_acknowledgment(acknowledgments));
                }
            }
        }

        let record_id = record.id();
        match self
            .store
            .compare_and_swap(current.term, StoredEntitlement::record_of(record))
            .await?
        {
            CasOutcome::Committed { term } => {
                info!(%record_id, term, "license registered");
                Ok(RegistrationResponse::status(RegistrationStatus::Valid))
            }
            CasOutcome::Conflict { current_term } => Err(ServiceError::Conflict {
                expected_term: current.term,
                current_term,
            }),
        }
    }

    /// Replaces the current value with a tombstone.
    ///
    /// # Errors
    ///
    /// Store failures and `Conflict`.
    pub async fn remove(&self) -> ServiceResult<RemoveOutcome> {
        let current = self.store.get().await?;
        if current.value.is_tombstone() {
            debug!(term = current.term, "license already removed");
            return Ok(RemoveOutcome::AlreadyRemoved);
        }

        match self
            .store
            .compare_and_swap(current.term, StoredEntitlement::Tombstone)
            .await?
        {
            CasOutcome::Committed { term } => {
                info!(term, "license removed");
                Ok(RemoveOutcome::Removed)
            }
            CasOutcome::Conflict { current_term } => Err(ServiceError::Conflict {
                expected_term: current.term,
                current_term,
            }),
        }
    }

    // ── Store changes ────────────────────────────────────────────

    /// Applies a committed store value: notifies dependents whose view
    /// changed and reprograms the scheduler when the record changed.
    ///
    /// Idempotent: applying the same value twice notifies nobody the second
    /// time. Values older than the cached term are ignored.
    pub fn on_store_change(&self, versioned: &Versioned) {
        let now = self.clock.now();
        let record = versioned.value.record().cloned();
        let current = Notified {
            state: self.resolver.resolve(record.as_deref(), now),
            record,
        };

        let to_notify = {
            let mut inner = lock(&self.inner);
            if versioned.term < inner.cached.term {
                debug!(
                    term = versioned.term,
                    cached_term = inner.cached.term,
                    "ignoring stale store value"
                );
                return;
            }
            if inner.cached.value.record() != current.record.as_ref() {
                debug!(term = versioned.term, state = %current.state, "installed record changed");
                // Under the lock so jobs always follow the cached record.
                self.reprogram(current.record.as_ref());
            }
            inner.cached = versioned.clone();
            inner.claim_changed(&current)
        };
        notify(&to_notify, &current);
    }

    /// Re-derives the state of the cached value at the current time.
    fn refresh(&self) {
        let now = self.clock.now();
        let (current, to_notify) = {
            let mut inner = lock(&self.inner);
            let record = inner.cached.value.record().cloned();
            let current = Notified {
                state: self.resolver.resolve(record.as_deref(), now),
                record,
            };
            let to_notify = inner.claim_changed(&current);
            (current, to_notify)
        };
        if !to_notify.is_empty() {
            info!(state = %current.state, "entitlement state changed");
        }
        notify(&to_notify, &current);
    }

    /// Replaces the expiry and warning jobs for `record`, or removes them.
    ///
    /// Callers hold `inner`. The scheduler never calls back into the service
    /// while holding its own locks.
    fn reprogram(&self, record: Option<&Arc<EntitlementRecord>>) {
        let Some(record) = record else {
            self.scheduler.remove_job(EXPIRY_JOB);
            for policy in &self.policies {
                self.scheduler.remove_job(policy.id());
            }
            return;
        };

        let resolver = self.resolver;
        let boundaries = Arc::clone(record);
        self.scheduler.add_job(EXPIRY_JOB, move |_start, now| {
            resolver.next_transition(&boundaries, now)
        });

        let expiry = record.expiry_date();
        for policy in &self.policies {
            let policy = policy.clone();
            let id = policy.id().to_string();
            self.scheduler
                .add_job(id, move |_start, now| policy.next_fire_time(expiry, now));
        }
    }

    fn on_job(&self, event: &SchedulerEvent) {
        if event.job() == EXPIRY_JOB {
            self.refresh();
        } else if self.policies.iter().any(|p| p.id() == event.job()) {
            if let Some(text) = self.expiration_warning() {
                warn!("{text}");
            }
        } else {
            debug!(job = %event.job(), "ignoring unknown job");
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Subscribes to the store, starts the scheduler and installs the
    /// current value, issuing the trial when this node is the committed
    /// leader and the store has never held a value.
    ///
    /// An unavailable store is logged and leaves the service without state;
    /// the change feed fills it in later.
    ///
    /// # Errors
    ///
    /// `Scheduler` when called outside a tokio runtime.
    pub async fn init(self: &Arc<Self>) -> ServiceResult<()> {
        let feed = self.store.subscribe();
        let task = tokio::spawn(follow_feed(Arc::downgrade(self), feed));
        if let Some(previous) = lock(&self.feed_task).replace(task) {
            previous.abort();
        }

        self.scheduler.start()?;

        let current = match self.store.get().await {
            Ok(current) => current,
            Err(e) => {
                warn!(error = %e, "store unavailable, no entitlement installed");
                return Ok(());
            }
        };

        if !current.value.is_absent() {
            self.on_store_change(&current);
            return Ok(());
        }

        let view = self.store.cluster_view();
        if !view.can_originate_writes() {
            debug!(?view, "no entitlement yet, waiting for the leader to issue the trial");
            return Ok(());
        }
        match self.trial.maybe_issue(self.store.as_ref()).await {
            Ok(TrialOutcome::Issued(record)) => {
                debug!(record_id = %record.id(), "trial issued at init");
            }
            Ok(outcome) => debug!(?outcome, "trial not issued at init"),
            Err(e) => warn!(error = %e, "trial issuance failed"),
        }
        Ok(())
    }

    /// Forgets all state without notifying anyone and stops background work.
    pub async fn shutdown(&self) {
        {
            let mut inner = lock(&self.inner);
            inner.cached = Versioned::default();
            for tracked in &mut inner.tracked {
                tracked.last = Notified::initial();
            }
            self.reprogram(None);
        }
        if let Some(task) = lock(&self.feed_task).take() {
            task.abort();
        }
        self.scheduler.stop().await;
        info!("licensing service stopped");
    }

    /// Adds a dependent after construction and immediately brings it up to
    /// date with the cached value.
    pub fn add_dependent(&self, dependent: Arc<dyn Dependent>) {
        let now = self.clock.now();
        let (current, changed) = {
            let mut inner = lock(&self.inner);
            let record = inner.cached.value.record().cloned();
            let current = Notified {
                state: self.resolver.resolve(record.as_deref(), now),
                record,
            };
            let changed = current != Notified::initial();
            inner.tracked.push(Tracked {
                dependent: Arc::clone(&dependent),
                last: current.clone(),
            });
            (current, changed)
        };
        debug!(dependent = %dependent.id(), "dependent added");
        if changed {
            notify(&[dependent], &current);
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    /// The state of the cached record now.
    pub fn current_state(&self) -> LifecycleState {
        let now = self.clock.now();
        let inner = lock(&self.inner);
        self.resolver.resolve(inner.cached.value.record().map(|r| &**r), now)
    }

    /// The installed record, if any.
    pub fn current_record(&self) -> Option<Arc<EntitlementRecord>> {
        lock(&self.inner).cached.value.record().cloned()
    }

    /// The expiration warning for the installed record, or `None` when no
    /// record is installed or no dependent has messages.
    pub fn expiration_warning(&self) -> Option<String> {
        let (record, dependents) = {
            let inner = lock(&self.inner);
            (inner.cached.value.record().cloned()?, inner.dependents())
        };
        compose_expiration_warning(&record, self.clock.now(), &dependents)
    }
}

impl Drop for LicensingService {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.feed_task).take() {
            task.abort();
        }
    }
}

/// Delivers `current` to each dependent in turn. A dependent that fails or
/// panics is logged and the rest are still notified.
fn notify(dependents: &[Arc<dyn Dependent>], current: &Notified) {
    for dependent in dependents {
        let applied = panic::catch_unwind(AssertUnwindSafe(|| {
            dependent.on_change(current.record.as_deref(), current.state)
        }));
        match applied {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                dependent = %dependent.id(),
                state = %current.state,
                error = %e,
                "dependent failed to apply entitlement change"
            ),
            Err(_) => warn!(
                dependent = %dependent.id(),
                state = %current.state,
                "dependent panicked applying entitlement change"
            ),
        }
    }
}

async fn follow_feed(service: Weak<LicensingService>, mut feed: broadcast::Receiver<Versioned>) {
    loop {
        let next = feed.recv().await;
        let Some(service) = service.upgrade() else {
            break;
        };
        match next {
            Ok(versioned) => service.on_store_change(&versioned),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "change feed lagged, re-reading the store");
                match service.store.get().await {
                    Ok(versioned) => service.on_store_change(&versioned),
                    Err(e) => warn!(error = %e, "store unavailable after lag"),
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
    debug!("change feed closed");
}

/// Routes scheduler events back into the service.
struct JobListener {
    service: Weak<LicensingService>,
}

impl SchedulerListener for JobListener {
    fn triggered(&self, event: &SchedulerEvent) -> SchedulerResult<()> {
        if let Some(service) = self.service.upgrade() {
            service.on_job(event);
        }
        Ok(())
    }
}
