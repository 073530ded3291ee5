//! Scheduler statistics.

use std::cell::Cell;

/// Counters updated while the scheduler runs.
///
/// Only collected when [`SchedulerConfig::enable_stats`] is set.
///
/// [`SchedulerConfig::enable_stats`]: crate::util::config::SchedulerConfig::enable_stats
#[derive(Debug, Default)]
pub(crate) struct SchedulerStats {
    scheduled: Cell<u64>,
    completed: Cell<u64>,
    stopped: Cell<u64>,
    failed: Cell<u64>,
    steps: Cell<u64>,
    ticks: Cell<u64>,
    peak_jobs: Cell<usize>,
}

#[inline]
fn bump(
    counter: &Cell<u64>,
    by: u64,
) {
    counter.set(counter.get().saturating_add(by));
}

impl SchedulerStats {
    /// Record a scheduled job and the resulting job count.
    #[inline]
    pub(crate) fn record_scheduled(
        &self,
        active: usize,
    ) {
        bump(&self.scheduled, 1);
        if active > self.peak_jobs.get() {
            self.peak_jobs.set(active);
        }
    }

    /// Record a job whose sequence reported done.
    #[inline]
    pub(crate) fn record_completed(&self) {
        bump(&self.completed, 1);
    }

    /// Record jobs removed by `stop`/`stop_all`.
    #[inline]
    pub(crate) fn record_stopped(
        &self,
        count: usize,
    ) {
        bump(&self.stopped, count as u64);
    }

    /// Record a job removed because its step failed.
    #[inline]
    pub(crate) fn record_failed(&self) {
        bump(&self.failed, 1);
    }

    /// Record a single `Sequence::step` call.
    #[inline]
    pub(crate) fn record_step(&self) {
        bump(&self.steps, 1);
    }

    #[inline]
    pub(crate) fn record_tick(&self) {
        bump(&self.ticks, 1);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            scheduled: self.scheduled.get(),
            completed: self.completed.get(),
            stopped: self.stopped.get(),
            failed: self.failed.get(),
            steps: self.steps.get(),
            ticks: self.ticks.get(),
            peak_jobs: self.peak_jobs.get(),
        }
    }
}

/// Point-in-time copy of the scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Jobs scheduled with `run`/`run_delayed`.
    pub scheduled: u64,
    /// Jobs whose sequence reported done.
    pub completed: u64,
    /// Jobs removed by `stop`, `stop_all` or `stop_orphaned`.
    pub stopped: u64,
    /// Jobs removed because a step returned an error.
    pub failed: u64,
    /// Total `Sequence::step` calls, nested sequences included.
    pub steps: u64,
    /// Ticks processed.
    pub ticks: u64,
    /// Largest number of simultaneously active jobs.
    pub peak_jobs: usize,
}

impl StatsSnapshot {
    /// Average step calls per tick.
    pub fn steps_per_tick(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        self.steps as f64 / self.ticks as f64
    }
}
