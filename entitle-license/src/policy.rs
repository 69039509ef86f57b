//! Expiration warning schedules.
//!
//! Each policy describes a window relative to the expiry date and a repeat
//! interval inside it. Offsets count backwards from expiry: `start = 25d`
//! opens the window 25 days before expiry, `start = 0` opens it at expiry.

use crate::error::{LicenseError, LicenseResult};
use chrono::TimeDelta;
use entitle_types::Timestamp;

/// Id of the daily warning issued 25 to 7 days before expiry.
pub const LONG_RANGE_WARNING: &str = "expiry-warning-long";

/// Id of the frequent warning issued during the last 7 days.
pub const SHORT_RANGE_WARNING: &str = "expiry-warning-short";

/// Id of the warning repeated after expiry.
pub const GRACE_WARNING: &str = "expiry-warning-grace";

/// A repeating warning window anchored on an expiry date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationPolicy {
    id: String,
    start: TimeDelta,
    end: Option<TimeDelta>,
    frequency: TimeDelta,
}

impl ExpirationPolicy {
    /// Creates a policy active in `[expiry - start, expiry - end)`, repeating
    /// every `frequency`. `end = None` never closes.
    ///
    /// # Errors
    ///
    /// `InvalidPolicy` if `frequency` is not positive or the window is empty.
    pub fn new(
        id: impl Into<String>,
        start: TimeDelta,
        end: Option<TimeDelta>,
        frequency: TimeDelta,
    ) -> LicenseResult<Self> {
        let id = id.into();
        if frequency <= TimeDelta::zero() {
            return Err(LicenseError::InvalidPolicy(format!(
                "{id}: frequency must be positive"
            )));
        }
        if let Some(end) = end {
            if end >= start {
                return Err(LicenseError::InvalidPolicy(format!(
                    "{id}: window closes before it opens"
                )));
            }
        }
        Ok(Self {
            id,
            start,
            end,
            frequency,
        })
    }

    /// The default set: long-range daily, short-range every 10 minutes, and
    /// post-expiry every 10 minutes.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                id: LONG_RANGE_WARNING.to_string(),
                start: TimeDelta::days(25),
                end: Some(TimeDelta::days(7)),
                frequency: TimeDelta::days(1),
            },
            Self {
                id: SHORT_RANGE_WARNING.to_string(),
                start: TimeDelta::days(7),
                end: Some(TimeDelta::zero()),
                frequency: TimeDelta::minutes(10),
            },
            Self {
                id: GRACE_WARNING.to_string(),
                start: TimeDelta::zero(),
                end: None,
                frequency: TimeDelta::minutes(10),
            },
        ]
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn frequency(&self) -> TimeDelta {
        self.frequency
    }

    /// When the window opens for a record expiring at `expiry`.
    #[must_use]
    pub fn window_start(&self, expiry: Timestamp) -> Timestamp {
        expiry - self.start
    }

    /// When the window closes, if ever.
    #[must_use]
    pub fn window_end(&self, expiry: Timestamp) -> Option<Timestamp> {
        self.end.map(|end| expiry - end)
    }

    /// Next warning time strictly after `now`, or `None` once exhausted.
    #[must_use]
    pub fn next_fire_time(&self, expiry: Timestamp, now: Timestamp) -> Option<Timestamp> {
        let opens = self.window_start(expiry);
        if now < opens {
            return Some(opens);
        }

        let step = self.frequency.num_milliseconds();
        let elapsed = now.since(opens).num_milliseconds();
        let periods = elapsed / step + 1;
        let next = opens + TimeDelta::milliseconds(periods.saturating_mul(step));

        match self.window_end(expiry) {
            Some(closes) if next >= closes => None,
            _ => Some(next),
        }
    }
}
