//! Named-job scheduler.
//!
//! Holds any number of independent jobs, each a function answering "when do
//! you next want to run?". A single background task sleeps until the
//! earliest answer, fires every job that is due, asks again, and repeats.
//! Adding or removing a job wakes the loop so the sleep is always computed
//! from the current job set.
//!
//! # Example
//!
//! ```
//! use entitle_scheduler::{SchedulerConfig, SchedulerEngine};
//! use entitle_types::SystemClock;
//! use std::sync::Arc;
//!
//! let engine = SchedulerEngine::new(Arc::new(SystemClock), SchedulerConfig::default());
//! engine.add_job("heartbeat", |_start, now| Some(now + chrono::TimeDelta::seconds(30)));
//! assert_eq!(engine.job_names(), vec!["heartbeat".to_string()]);
//! ```

mod engine;
mod error;
mod event;

pub use engine::{ScheduleFn, SchedulerConfig, SchedulerEngine};
pub use error::{SchedulerError, SchedulerResult};
pub use event::{SchedulerEvent, SchedulerListener};
