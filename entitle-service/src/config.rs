//! Service configuration.

use chrono::TimeDelta;
use entitle_license::{StateResolver, DEFAULT_GRACE_PERIOD_MS};
use entitle_scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default trial length (30 days).
pub const DEFAULT_TRIAL_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

/// Default trial capacity.
pub const DEFAULT_TRIAL_MAX_UNITS: u32 = 1000;

/// Default `issuedTo` of trial records.
pub const DEFAULT_TRIAL_ISSUED_TO: &str = "cluster";

/// Configuration for the licensing service.
///
/// Missing fields take their defaults, so an empty table is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicensingConfig {
    /// How long an expired record stays usable.
    pub grace_period_secs: u64,
    /// Lifetime of a self-issued trial.
    pub trial_duration_secs: u64,
    /// Capacity granted by a trial.
    pub trial_max_units: u32,
    /// `issuedTo` written into trial records.
    pub trial_issued_to: String,
    /// Upper bound on how long shutdown waits for the scheduler loop (ms).
    pub scheduler_stop_timeout_ms: u64,
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: (DEFAULT_GRACE_PERIOD_MS / 1000) as u64,
            trial_duration_secs: DEFAULT_TRIAL_DURATION_SECS,
            trial_max_units: DEFAULT_TRIAL_MAX_UNITS,
            trial_issued_to: DEFAULT_TRIAL_ISSUED_TO.to_string(),
            scheduler_stop_timeout_ms: 5_000,
        }
    }
}

fn secs(value: u64) -> TimeDelta {
    i64::try_from(value)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

impl LicensingConfig {
    pub fn grace_period(&self) -> TimeDelta {
        secs(self.grace_period_secs)
    }

    pub fn trial_duration(&self) -> TimeDelta {
        secs(self.trial_duration_secs)
    }

    /// A resolver using the configured grace period.
    pub fn resolver(&self) -> StateResolver {
        StateResolver::new(self.grace_period())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            stop_timeout: Duration::from_millis(self.scheduler_stop_timeout_ms),
        }
    }
}
