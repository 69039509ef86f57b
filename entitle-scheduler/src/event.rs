//! Scheduler events and listeners.

use crate::error::SchedulerResult;
use entitle_types::Timestamp;

/// Something the scheduler tells its listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A job's fire time was reached.
    Triggered {
        /// Name the job was added under.
        job: String,
        /// The fire time that was reached (not the delivery time).
        scheduled: Timestamp,
    },
}

impl SchedulerEvent {
    /// The job this event concerns.
    #[must_use]
    pub fn job(&self) -> &str {
        match self {
            Self::Triggered { job, .. } => job,
        }
    }
}

/// Receives scheduler events.
///
/// Called on a blocking worker, never on the scheduling loop itself. An
/// error (or a panic) is logged and does not affect other deliveries.
pub trait SchedulerListener: Send + Sync {
    fn triggered(&self, event: &SchedulerEvent) -> SchedulerResult<()>;
}
