//! Time source abstraction.

use crate::Timestamp;

/// A source of the current time.
///
/// Everything that derives state from "now" takes a `Clock` so tests can pin
/// and advance time instead of sleeping.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Timestamp;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-util"))]
mod manual {
    use super::Clock;
    use crate::Timestamp;
    use chrono::TimeDelta;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// A clock that only moves when told to.
    #[derive(Debug)]
    pub struct ManualClock {
        millis: AtomicI64,
    }

    impl ManualClock {
        /// Creates a clock frozen at `start`.
        pub fn new(start: Timestamp) -> Self {
            Self {
                millis: AtomicI64::new(start.as_millis()),
            }
        }

        /// Moves the clock to `to`.
        pub fn set(&self, to: Timestamp) {
            self.millis.store(to.as_millis(), Ordering::SeqCst);
        }

        /// Moves the clock forward by `by`.
        pub fn advance(&self, by: TimeDelta) {
            self.millis
                .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
        }
    }
}
