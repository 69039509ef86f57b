//! Lifecycle state derivation.
//!
//! The state is a pure function of the record and the current instant, so
//! every node derives the same answer without coordinating.

use crate::record::EntitlementRecord;
use chrono::TimeDelta;
use entitle_types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grace period in milliseconds (7 days).
pub const DEFAULT_GRACE_PERIOD_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// The lifecycle state of the installed entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Within `[issueDate, expiryDate)`.
    Enabled,
    /// Within `[expiryDate, expiryDate + grace)`. Still usable, warns.
    GracePeriod,
    /// No record, not yet valid, or past the grace period.
    Disabled,
}

impl LifecycleState {
    /// Returns true if features should keep working (Enabled or GracePeriod).
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Enabled | Self::GracePeriod)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Enabled => "ENABLED",
            Self::GracePeriod => "GRACE_PERIOD",
            Self::Disabled => "DISABLED",
        };
        f.write_str(name)
    }
}

/// Maps `(record, now)` to a `LifecycleState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateResolver {
    grace_period: TimeDelta,
}

impl Default for StateResolver {
    fn default() -> Self {
        Self::new(TimeDelta::milliseconds(DEFAULT_GRACE_PERIOD_MS))
    }
}

impl StateResolver {
    /// Creates a resolver with the given grace period.
    #[must_use]
    pub fn new(grace_period: TimeDelta) -> Self {
        Self { grace_period }
    }

    #[must_use]
    pub fn grace_period(&self) -> TimeDelta {
        self.grace_period
    }

    /// Derives the state of `record` at `now`.
    #[must_use]
    pub fn resolve(&self, record: Option<&EntitlementRecord>, now: Timestamp) -> LifecycleState {
        let Some(record) = record else {
            return LifecycleState::Disabled;
        };

        if now < record.issue_date() {
            LifecycleState::Disabled
        } else if now < record.expiry_date() {
            LifecycleState::Enabled
        } else if now < record.expiry_date() + self.grace_period {
            LifecycleState::GracePeriod
        } else {
            LifecycleState::Disabled
        }
    }

    /// The next instant strictly after `now` at which `resolve` changes its
    /// answer for `record`, or `None` once the record is past its grace
    /// period.
    #[must_use]
    pub fn next_transition(&self, record: &EntitlementRecord, now: Timestamp) -> Option<Timestamp> {
        let grace_end = record.expiry_date() + self.grace_period;
        [record.issue_date(), record.expiry_date(), grace_end]
            .into_iter()
            .find(|&boundary| now < boundary)
    }
}
