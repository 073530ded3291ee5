//! Cooperative routine scheduler
//!
//! This module provides the [`Scheduler`], a single-threaded, frame-synchronous
//! scheduler for [`Sequence`]s. The host loop calls [`Scheduler::tick`] once
//! per frame; every active job is advanced at most once per tick.
//!
//! # Architecture
//!
//! - [`Sequence`](sequence::Sequence) - Resumable unit of work and its [`Step`]/[`Yield`] results
//! - [`Handle`](handle::Handle) - Identity-based reference to a scheduled job
//! - [`Owner`](job::Owner) - Weak tag used for owner-scoped teardown
//! - [`wait`] - Wait primitives (`WaitForSeconds`, `WaitWhile`, `WaitForObject`, ...)
//! - [`Script`](script::Script) - Linear "wait, then do" routines
//!
//! Jobs live in a slot arena. A tick iterates a snapshot of job keys, and no
//! internal borrow is held while a step runs, so a step may freely schedule
//! new jobs or stop any job, itself included.

pub mod handle;
pub mod job;
pub mod script;
pub mod sequence;
mod stats;
pub mod wait;

pub use handle::Handle;
pub use job::{JobId, JobIdGenerator, JobState, Owner};
pub use script::Script;
pub use sequence::{from_fn, FromFn, Sequence, Step, Yield};
pub use stats::StatsSnapshot;
pub use wait::{WaitForJob, WaitForObject, WaitForSeconds, WaitUntil, WaitWhile};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use slab::Slab;
use tracing::{debug, trace, warn};

use crate::util::config::SchedulerConfig;
use job::{Continuation, Job, JobKey, JOB_IDS};
use stats::SchedulerStats;

/// Errors reported by the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Initial delay was negative, NaN or infinite.
    #[error("invalid delay {delay}: expected a finite, non-negative number of seconds")]
    InvalidDelay { delay: f32 },

    /// Tick delta was negative, NaN or infinite.
    #[error("invalid tick delta {delta}: expected a finite, non-negative number of seconds")]
    InvalidDelta { delta: f32 },

    /// `tick` was called from inside a running step.
    #[error("tick called re-entrantly from inside a running sequence")]
    ReentrantTick,

    /// A step returned an error. The job has been removed.
    #[error("{job} failed")]
    SequenceFailed {
        job: JobId,
        #[source]
        source: anyhow::Error,
    },
}

/// Outcome of advancing a job's continuation once.
enum Advance {
    /// Resume on the next tick.
    Ready,
    /// Resume once this many seconds have passed since the job fell due.
    Wait(f64),
    /// The top-level sequence reported done.
    Done,
}

/// Shared scheduler state.
pub(crate) struct Inner {
    /// Active jobs.
    jobs: RefCell<Slab<Job>>,
    /// Job keys in scheduling order. May hold keys of removed jobs until the
    /// next compaction.
    order: RefCell<Vec<JobKey>>,
    /// Logical clock: the sum of all tick deltas so far.
    now: Cell<f64>,
    /// Set while `tick` is running.
    ticking: Cell<bool>,
    config: SchedulerConfig,
    stats: SchedulerStats,
}

impl Inner {
    fn new(config: SchedulerConfig) -> Self {
        Self {
            jobs: RefCell::new(Slab::with_capacity(config.initial_capacity)),
            order: RefCell::new(Vec::with_capacity(config.initial_capacity)),
            now: Cell::new(0.0),
            ticking: Cell::new(false),
            config,
            stats: SchedulerStats::default(),
        }
    }

    /// Check if `key` refers to a live job.
    pub(crate) fn contains(
        &self,
        key: JobKey,
    ) -> bool {
        self.jobs
            .borrow()
            .get(key.slot)
            .is_some_and(|job| job.id == key.id)
    }

    fn insert(
        &self,
        delay: f64,
        owner: Option<Owner>,
        sequence: Box<dyn Sequence>,
    ) -> JobKey {
        let id = JOB_IDS.generate();
        let resume_at = self.now.get() + delay;
        let (key, active) = {
            let mut jobs = self.jobs.borrow_mut();
            let slot = jobs.insert(Job::new(id, resume_at, owner, sequence));
            (JobKey { slot, id }, jobs.len())
        };

        let mut order = self.order.borrow_mut();
        order.push(key);
        if order.len() > active * 2 + 32 {
            let jobs = self.jobs.borrow();
            order.retain(|key| jobs.get(key.slot).is_some_and(|job| job.id == key.id));
        }

        if self.config.enable_stats {
            self.stats.record_scheduled(active);
        }
        key
    }

    /// Remove a single job. Returns `false` if it was not present.
    pub(crate) fn remove(
        &self,
        key: JobKey,
    ) -> bool {
        let removed = {
            let mut jobs = self.jobs.borrow_mut();
            let live = jobs.get(key.slot).is_some_and(|job| job.id == key.id);
            live.then(|| jobs.remove(key.slot))
        };

        // Dropped outside the borrow: a sequence's destructor may call back
        // into the scheduler.
        match removed {
            Some(job) => {
                debug!(job = %job.id, "job stopped");
                if self.config.enable_stats {
                    self.stats.record_stopped(1);
                }
                drop(job);
                true
            }
            None => false,
        }
    }

    /// Remove every job matching `filter`.
    fn remove_where(
        &self,
        filter: impl Fn(&Job) -> bool,
    ) -> Vec<Job> {
        let mut jobs = self.jobs.borrow_mut();
        let slots: Vec<usize> = jobs
            .iter()
            .filter(|(_, job)| filter(*job))
            .map(|(slot, _)| slot)
            .collect();
        slots.into_iter().map(|slot| jobs.remove(slot)).collect()
    }

    /// Drop stale keys and return the current scheduling order.
    fn snapshot(&self) -> Vec<JobKey> {
        let jobs = self.jobs.borrow();
        let mut order = self.order.borrow_mut();
        order.retain(|key| jobs.get(key.slot).is_some_and(|job| job.id == key.id));
        order.clone()
    }

    /// If the job is due at `now`, take its continuation out for stepping.
    ///
    /// Returns the continuation and the time the job fell due, from which its
    /// next wait is measured. A job that fell due before this tick began is
    /// treated as due at the start of the tick.
    fn checkout(
        &self,
        key: JobKey,
        now: f64,
        delta: f64,
    ) -> Option<(Continuation, f64)> {
        let epsilon = f64::from(self.config.delay_epsilon);
        let stale = {
            let mut jobs = self.jobs.borrow_mut();
            let job = jobs.get_mut(key.slot).filter(|job| job.id == key.id)?;

            if job.resume_at - now > epsilon {
                return None;
            }

            if job.continuation.active.is_some() {
                let due = job.resume_at.max(now - delta);
                return Some((std::mem::take(&mut job.continuation), due));
            }

            // A previous step unwound without handing its continuation back.
            jobs.remove(key.slot)
        };
        warn!(job = %stale.id, "removing job left without a sequence");
        None
    }

    /// Hand a continuation back after stepping.
    ///
    /// If the job was stopped while its step ran, the continuation is dropped.
    fn checkin(
        &self,
        key: JobKey,
        continuation: Continuation,
        resume_at: f64,
    ) {
        let orphaned = {
            let mut jobs = self.jobs.borrow_mut();
            match jobs.get_mut(key.slot).filter(|job| job.id == key.id) {
                Some(job) => {
                    job.continuation = continuation;
                    job.resume_at = resume_at;
                    None
                }
                None => Some(continuation),
            }
        };
        if orphaned.is_some() {
            trace!(job = %key.id, "job stopped during its own step");
        }
    }

    /// Remove a job whose sequence finished or failed.
    fn retire(
        &self,
        key: JobKey,
    ) -> Option<Job> {
        let mut jobs = self.jobs.borrow_mut();
        let live = jobs.get(key.slot).is_some_and(|job| job.id == key.id);
        live.then(|| jobs.remove(key.slot))
    }

    /// Step the continuation until it suspends.
    ///
    /// A nested sequence that completes lets its outer sequence run in the
    /// same tick, one level only: an outer sequence that also completes hands
    /// control to its own parent on the next tick.
    fn advance(
        &self,
        id: JobId,
        continuation: &mut Continuation,
    ) -> anyhow::Result<Advance> {
        let mut drained = false;
        while let Some(active) = continuation.active.as_mut() {
            if self.config.enable_stats {
                self.stats.record_step();
            }
            let step = active.step()?;
            trace!(job = %id, depth = continuation.depth(), ?step, "step");

            match step {
                Step::Done => match continuation.resume.pop() {
                    Some(outer) => {
                        continuation.active = Some(outer);
                        if drained {
                            return Ok(Advance::Ready);
                        }
                        drained = true;
                    }
                    None => {
                        continuation.active = None;
                        return Ok(Advance::Done);
                    }
                },
                Step::Yield(Yield::None) => return Ok(Advance::Ready),
                Step::Yield(Yield::Seconds(seconds)) => return Ok(Advance::Wait(seconds)),
                Step::Yield(Yield::Nested(child)) => {
                    if let Some(outer) = continuation.active.replace(child) {
                        continuation.resume.push(outer);
                    }
                    return Ok(Advance::Ready);
                }
            }
        }
        Ok(Advance::Done)
    }
}

/// Resets the ticking flag even if a step panics.
struct TickGuard<'a>(&'a Cell<bool>);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Frame-synchronous cooperative scheduler.
///
/// Cloning yields another reference to the same scheduler, which is how
/// sequences get access to it from inside their steps.
///
/// ```
/// use framewise::runtime::scheduler::{Scheduler, WaitForSeconds};
///
/// let scheduler = Scheduler::new();
/// let handle = scheduler.run(WaitForSeconds::new(0.1));
///
/// for _ in 0..6 {
///     scheduler.tick(1.0 / 60.0).unwrap();
/// }
/// assert!(!handle.is_running());
/// ```
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<Inner>,
}

impl Scheduler {
    /// Create a new scheduler with default config.
    #[inline]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create a scheduler with custom configuration.
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            inner: Rc::new(Inner::new(config)),
        }
    }

    /// Schedule `sequence` to start on the next tick.
    pub fn run(
        &self,
        sequence: impl Sequence + 'static,
    ) -> Handle {
        self.schedule(0.0, None, Box::new(sequence))
    }

    /// Schedule `sequence` on behalf of `owner`, starting on the next tick.
    pub fn run_owned(
        &self,
        owner: &Owner,
        sequence: impl Sequence + 'static,
    ) -> Handle {
        self.schedule(0.0, Some(owner.clone()), Box::new(sequence))
    }

    /// Schedule `sequence` to start once `delay` seconds have elapsed.
    ///
    /// The sequence is never stepped in the tick it was scheduled, even with a
    /// zero delay.
    pub fn run_delayed(
        &self,
        delay: f32,
        sequence: impl Sequence + 'static,
        owner: Option<&Owner>,
    ) -> Result<Handle, SchedulerError> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SchedulerError::InvalidDelay { delay });
        }
        Ok(self.schedule(f64::from(delay), owner.cloned(), Box::new(sequence)))
    }

    fn schedule(
        &self,
        delay: f64,
        owner: Option<Owner>,
        sequence: Box<dyn Sequence>,
    ) -> Handle {
        let key = self.inner.insert(delay, owner, sequence);
        debug!(job = %key.id, delay, "job scheduled");
        Handle::new(key, Rc::downgrade(&self.inner))
    }

    /// Stop the job behind `handle`.
    ///
    /// Returns `false` if the job already finished, was stopped before, or
    /// `handle` is [`Handle::none`].
    pub fn stop(
        &self,
        handle: &Handle,
    ) -> bool {
        handle.key().is_some_and(|key| self.inner.remove(key))
    }

    /// Stop every job started by `owner`, or every job when `owner` is `None`.
    ///
    /// Returns the number of jobs removed.
    pub fn stop_all(
        &self,
        owner: Option<&Owner>,
    ) -> usize {
        let removed = match owner {
            Some(owner) => self.inner.remove_where(|job| job.is_owned_by(owner)),
            None => {
                self.inner.order.borrow_mut().clear();
                self.inner.jobs.borrow_mut().drain().collect()
            }
        };
        let count = removed.len();
        if count > 0 {
            debug!(count, scoped = owner.is_some(), "jobs stopped");
            if self.inner.config.enable_stats {
                self.inner.stats.record_stopped(count);
            }
        }
        count
    }

    /// Stop jobs whose owner has been dropped.
    ///
    /// Owner tags never keep their target alive, so jobs of an owner that went
    /// away without calling [`Scheduler::stop_all`] keep running until this is
    /// called.
    pub fn stop_orphaned(&self) -> usize {
        let removed = self
            .inner
            .remove_where(|job| job.owner.as_ref().is_some_and(|owner| !owner.is_alive()));
        let count = removed.len();
        if count > 0 {
            debug!(count, "orphaned jobs stopped");
            if self.inner.config.enable_stats {
                self.inner.stats.record_stopped(count);
            }
        }
        count
    }

    /// Check if the job behind `handle` is still active.
    pub fn is_running(
        &self,
        handle: &Handle,
    ) -> bool {
        handle.key().is_some_and(|key| self.inner.contains(key))
    }

    /// Current state of the job behind `handle`, if it is active.
    pub fn state(
        &self,
        handle: &Handle,
    ) -> Option<JobState> {
        let key = handle.key()?;
        let jobs = self.inner.jobs.borrow();
        jobs.get(key.slot)
            .filter(|job| job.id == key.id)
            .map(|job| {
                job.state(
                    self.inner.now.get(),
                    f64::from(self.inner.config.delay_epsilon),
                )
            })
    }

    /// Number of active jobs.
    #[inline]
    pub fn count(&self) -> usize {
        self.inner.jobs.borrow().len()
    }

    /// Check if no job is active.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Advance every active job once. Call exactly once per frame, after the
    /// frame clock has been advanced.
    ///
    /// Jobs are visited in scheduling order. Jobs scheduled during this tick
    /// first run on the next one. If a step fails, its job is removed and the
    /// error is returned at once; jobs not yet visited keep their state for
    /// the next tick.
    pub fn tick(
        &self,
        delta: f32,
    ) -> Result<(), SchedulerError> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(SchedulerError::InvalidDelta { delta });
        }
        if self.inner.ticking.replace(true) {
            return Err(SchedulerError::ReentrantTick);
        }
        let _guard = TickGuard(&self.inner.ticking);

        if self.inner.config.enable_stats {
            self.inner.stats.record_tick();
        }

        let delta = f64::from(delta);
        let now = self.inner.now.get() + delta;
        self.inner.now.set(now);

        for key in self.inner.snapshot() {
            let Some((mut continuation, due)) = self.inner.checkout(key, now, delta) else {
                continue;
            };

            match self.inner.advance(key.id, &mut continuation) {
                Ok(Advance::Ready) => self.inner.checkin(key, continuation, now),
                Ok(Advance::Wait(seconds)) => {
                    self.inner.checkin(key, continuation, due + seconds)
                }
                Ok(Advance::Done) => {
                    if let Some(job) = self.inner.retire(key) {
                        debug!(job = %job.id, "job completed");
                        if self.inner.config.enable_stats {
                            self.inner.stats.record_completed();
                        }
                    }
                }
                Err(source) => {
                    let job = self.inner.retire(key);
                    drop(continuation);
                    drop(job);
                    warn!(job = %key.id, error = %source, "sequence failed");
                    if self.inner.config.enable_stats {
                        self.inner.stats.record_failed();
                    }
                    return Err(SchedulerError::SequenceFailed {
                        job: key.id,
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Seconds of logical time elapsed: the sum of every tick delta so far.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.inner.now.get()
    }

    /// Get a snapshot of the statistics.
    ///
    /// All zeros unless [`SchedulerConfig::enable_stats`] is set.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Get the configuration.
    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("jobs", &self.count())
            .field("elapsed", &self.elapsed())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests;
