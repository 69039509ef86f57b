//! Scheduler engine: the job table and the background loop that drives it.

use crate::error::{SchedulerError, SchedulerResult};
use crate::event::{SchedulerEvent, SchedulerListener};
use entitle_types::{Clock, Timestamp};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A job's schedule: `(scheduler start time, now) -> next fire time`.
///
/// Returning a time at or before `now` right after the job fired marks the
/// job as exhausted, so a schedule cannot fire twice for one instant.
pub type ScheduleFn = Arc<dyn Fn(Timestamp, Timestamp) -> Option<Timestamp> + Send + Sync>;

/// Configuration for the scheduler engine.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How long `stop` waits for the loop to exit before aborting it.
    pub stop_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(5),
        }
    }
}

struct Job {
    schedule: ScheduleFn,
    next: Option<Timestamp>,
}

/// State shared between the engine handle and its loop task.
struct Shared {
    clock: Arc<dyn Clock>,
    start_time: Timestamp,
    jobs: Mutex<BTreeMap<String, Job>>,
    listeners: Mutex<Vec<Arc<dyn SchedulerListener>>>,
    wake: Notify,
    stopping: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn next_wake(&self) -> Option<Timestamp> {
        lock(&self.jobs).values().filter_map(|job| job.next).min()
    }

    /// Fires every job whose held fire time has been reached, then asks every
    /// job for its next time.
    fn run_once(&self) -> Vec<String> {
        let now = self.clock.now();
        let due: Vec<(String, Timestamp)> = {
            let mut jobs = lock(&self.jobs);
            let due: Vec<(String, Timestamp)> = jobs
                .iter()
                .filter_map(|(name, job)| match job.next {
                    Some(at) if at <= now => Some((name.clone(), at)),
                    _ => None,
                })
                .collect();
            for job in jobs.values_mut() {
                job.next = (job.schedule)(self.start_time, now).filter(|&next| next > now);
            }
            due
        };

        for (job, scheduled) in &due {
            debug!(job = %job, %scheduled, "job triggered");
            self.dispatch(SchedulerEvent::Triggered {
                job: job.clone(),
                scheduled: *scheduled,
            });
        }
        due.into_iter().map(|(name, _)| name).collect()
    }

    /// Hands the event to each listener on a blocking worker and returns
    /// immediately.
    fn dispatch(&self, event: SchedulerEvent) {
        let listeners = lock(&self.listeners).clone();
        for listener in listeners {
            let event = event.clone();
            tokio::spawn(async move {
                let job = event.job().to_string();
                match tokio::task::spawn_blocking(move || listener.triggered(&event)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(job = %job, error = %e, "scheduler listener failed"),
                    Err(e) => warn!(job = %job, error = %e, "scheduler listener panicked"),
                }
            });
        }
    }
}

async fn run_loop(shared: Arc<Shared>) {
    info!("scheduler loop started");
    while !shared.stopping.load(Ordering::SeqCst) {
        shared.run_once();
        if shared.stopping.load(Ordering::SeqCst) {
            break;
        }

        match shared.next_wake() {
            Some(at) => {
                let delay = at
                    .since(shared.clock.now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shared.wake.notified() => {}
                }
            }
            None => shared.wake.notified().await,
        }
    }
    info!("scheduler loop exited");
}

/// Holds named jobs and runs the loop that fires them.
pub struct SchedulerEngine {
    shared: Arc<Shared>,
    config: SchedulerConfig,
    running: Mutex<Option<JoinHandle<()>>>,
}

impl SchedulerEngine {
    /// Creates a stopped engine. Its start time is `clock.now()`.
    pub fn new(clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        let start_time = clock.now();
        Self {
            shared: Arc::new(Shared {
                clock,
                start_time,
                jobs: Mutex::new(BTreeMap::new()),
                listeners: Mutex::new(Vec::new()),
                wake: Notify::new(),
                stopping: AtomicBool::new(false),
            }),
            config,
            running: Mutex::new(None),
        }
    }

    /// The instant the engine was created, passed to every schedule.
    pub fn start_time(&self) -> Timestamp {
        self.shared.start_time
    }

    /// Adds a listener for all future events.
    pub fn register(&self, listener: Arc<dyn SchedulerListener>) {
        lock(&self.shared.listeners).push(listener);
    }

    /// Adds a job, replacing any job with the same name, and wakes the loop.
    pub fn add_job<F>(&self, name: impl Into<String>, schedule: F)
    where
        F: Fn(Timestamp, Timestamp) -> Option<Timestamp> + Send + Sync + 'static,
    {
        let name = name.into();
        let schedule: ScheduleFn = Arc::new(schedule);
        let next = schedule(self.shared.start_time, self.shared.clock.now());
        debug!(job = %name, next = ?next, "job added");
        lock(&self.shared.jobs).insert(name, Job { schedule, next });
        self.shared.wake.notify_one();
    }

    /// Removes a job and wakes the loop. Returns whether it existed.
    pub fn remove_job(&self, name: &str) -> bool {
        let removed = lock(&self.shared.jobs).remove(name).is_some();
        if removed {
            debug!(job = %name, "job removed");
            self.shared.wake.notify_one();
        }
        removed
    }

    /// The fire time currently held for `name`.
    pub fn next_fire_time(&self, name: &str) -> Option<Timestamp> {
        lock(&self.shared.jobs).get(name).and_then(|job| job.next)
    }

    /// Names of all jobs, sorted.
    pub fn job_names(&self) -> Vec<String> {
        lock(&self.shared.jobs).keys().cloned().collect()
    }

    /// Runs one evaluate-and-fire cycle at the clock's current time and
    /// returns the names of the jobs that fired.
    ///
    /// Listeners are notified asynchronously; this needs a tokio runtime when
    /// anything is due.
    pub fn run_once(&self) -> Vec<String> {
        self.shared.run_once()
    }

    /// Spawns the scheduling loop. A no-op if already running.
    ///
    /// # Errors
    ///
    /// `NoRuntime` when called outside a tokio runtime.
    pub fn start(&self) -> SchedulerResult<()> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let mut running = lock(&self.running);
        if running.is_some() {
            return Ok(());
        }
        self.shared.stopping.store(false, Ordering::SeqCst);
        *running = Some(runtime.spawn(run_loop(Arc::clone(&self.shared))));
        Ok(())
    }

    /// Whether the loop task is running.
    pub fn is_running(&self) -> bool {
        lock(&self.running).is_some()
    }

    /// Stops the loop and waits for it to exit, aborting it if it does not
    /// exit within the configured timeout. Safe to call repeatedly.
    pub async fn stop(&self) {
        let handle = lock(&self.running).take();
        let Some(mut handle) = handle else {
            return;
        };

        self.shared.stopping.store(true, Ordering::SeqCst);
        self.shared.wake.notify_one();

        if tokio::time::timeout(self.config.stop_timeout, &mut handle)
            .await
            .is_err()
        {
            warn!(
                timeout_ms = self.config.stop_timeout.as_millis() as u64,
                "scheduler loop did not stop in time, aborting"
            );
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for SchedulerEngine {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.running).take() {
            self.shared.stopping.store(true, Ordering::SeqCst);
            handle.abort();
        }
    }
}
