//! One-time trial issuance.
//!
//! Every node may race to issue the trial at bootstrap. The store's
//! compare-and-swap on the absent term lets exactly one of them win; the
//! others observe a conflict and step back.

use crate::config::LicensingConfig;
use crate::error::ServiceResult;
use chrono::TimeDelta;
use entitle_crypto::EnvelopeKey;
use entitle_license::{sign_trial, EntitlementRecord, RecordSpec, StoredEntitlement};
use entitle_store::{CasOutcome, EntitlementStore};
use entitle_types::Clock;
use std::sync::Arc;
use tracing::{debug, info};

/// What a `maybe_issue` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialOutcome {
    /// This call committed the trial.
    Issued(Arc<EntitlementRecord>),
    /// The store already holds a record or a tombstone.
    AlreadyPresent,
    /// Another writer committed between our read and our write.
    LostRace,
}

/// Builds and commits the self-generated trial record.
pub struct TrialIssuer {
    clock: Arc<dyn Clock>,
    envelope_key: EnvelopeKey,
    duration: TimeDelta,
    max_units: u32,
    issued_to: String,
}

impl TrialIssuer {
    pub fn new(clock: Arc<dyn Clock>, envelope_key: EnvelopeKey, config: &LicensingConfig) -> Self {
        Self {
            clock,
            envelope_key,
            duration: config.trial_duration(),
            max_units: config.trial_max_units,
            issued_to: config.trial_issued_to.clone(),
        }
    }

    /// Builds a sealed trial record starting now.
    pub fn build_record(&self) -> ServiceResult<EntitlementRecord> {
        let now = self.clock.now();
        let spec = RecordSpec::trial(
            self.issued_to.clone(),
            now,
            now + self.duration,
            self.max_units,
        )?;
        Ok(sign_trial(spec, &self.envelope_key)?)
    }

    /// Issues the trial if and only if the store has never held a value.
    ///
    /// # Errors
    ///
    /// Store failures and record construction failures. Losing the race is
    /// not an error.
    pub async fn maybe_issue(&self, store: &dyn EntitlementStore) -> ServiceResult<TrialOutcome> {
        let current = store.get().await?;
        if !current.value.is_absent() {
            debug!(term = current.term, "entitlement already present, no trial issued");
            return Ok(TrialOutcome::AlreadyPresent);
        }

        let record = Arc::new(self.build_record()?);
        let value = StoredEntitlement::Record(Arc::clone(&record));
        match store.compare_and_swap(current.term, value).await? {
            CasOutcome::Committed { term } => {
                info!(
                    record_id = %record.id(),
                    term,
                    expiry = %record.expiry_date(),
                    "trial entitlement issued"
                );
                Ok(TrialOutcome::Issued(record))
            }
            CasOutcome::Conflict { current_term } => {
                debug!(
                    expected_term = current.term,
                    current_term, "trial issuance lost the race"
                );
                Ok(TrialOutcome::LostRace)
            }
        }
    }
}
