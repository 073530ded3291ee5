//! Named timers on top of the scheduler.
//!
//! A [`Timer`] is a sequence that waits and then invokes an action, once or
//! repeatedly. [`TimerRegistry`] keeps timers addressable by name so engine
//! code can restart or cancel them without holding handles.

use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use super::scheduler::{Handle, Owner, Scheduler, SchedulerError, Sequence, Step, Yield};

/// Reject delays that are negative, NaN or infinite.
fn check_delay(delay: f64) -> Result<(), SchedulerError> {
    if !delay.is_finite() || delay < 0.0 {
        return Err(SchedulerError::InvalidDelay {
            delay: delay as f32,
        });
    }
    Ok(())
}

/// Wait `delay` seconds, invoke the action, and repeat if requested.
///
/// A timer scheduled directly with an invalid delay fails on its first step.
pub struct Timer {
    name: String,
    delay: f64,
    repeat: bool,
    armed: bool,
    fired: u64,
    action: Box<dyn FnMut()>,
}

impl Timer {
    pub fn new(
        name: impl Into<String>,
        delay: f64,
        repeat: bool,
        action: impl FnMut() + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            delay,
            repeat,
            armed: false,
            fired: 0,
            action: Box::new(action),
        }
    }

    /// One-shot timer.
    pub fn once(
        name: impl Into<String>,
        delay: f64,
        action: impl FnMut() + 'static,
    ) -> Self {
        Self::new(name, delay, false, action)
    }

    /// Timer firing every `delay` seconds until stopped.
    pub fn repeating(
        name: impl Into<String>,
        delay: f64,
        action: impl FnMut() + 'static,
    ) -> Self {
        Self::new(name, delay, true, action)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of times the action has run.
    #[inline]
    pub fn fired(&self) -> u64 {
        self.fired
    }
}

impl Sequence for Timer {
    fn step(&mut self) -> anyhow::Result<Step> {
        if !self.armed {
            check_delay(self.delay)?;
            self.armed = true;
            return Ok(Step::Yield(Yield::Seconds(self.delay)));
        }

        (self.action)();
        self.fired += 1;

        if self.repeat {
            Ok(Step::Yield(Yield::Seconds(self.delay)))
        } else {
            Ok(Step::Done)
        }
    }
}

impl fmt::Debug for Timer {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Timer")
            .field("name", &self.name)
            .field("delay", &self.delay)
            .field("repeat", &self.repeat)
            .field("fired", &self.fired)
            .finish_non_exhaustive()
    }
}

/// Timers addressable by name.
///
/// Starting a timer under a name that is already active replaces it.
/// Dropping the registry stops its timers.
#[derive(Debug)]
pub struct TimerRegistry {
    scheduler: Scheduler,
    owner: Option<Owner>,
    timers: IndexMap<String, Handle>,
}

impl TimerRegistry {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            owner: None,
            timers: IndexMap::new(),
        }
    }

    /// Registry whose timers are tagged with `owner`, so
    /// `stop_all(Some(&owner))` cancels them too.
    pub fn with_owner(
        scheduler: Scheduler,
        owner: Owner,
    ) -> Self {
        Self {
            scheduler,
            owner: Some(owner),
            timers: IndexMap::new(),
        }
    }

    /// Start a timer named `name`, replacing an active one with that name.
    ///
    /// An invalid delay is rejected before anything is replaced.
    pub fn start(
        &mut self,
        name: impl Into<String>,
        delay: f64,
        repeat: bool,
        action: impl FnMut() + 'static,
    ) -> Result<Handle, SchedulerError> {
        check_delay(delay)?;
        let name = name.into();
        if let Some(previous) = self.timers.shift_remove(&name) {
            if previous.stop() {
                debug!(timer = %name, "timer replaced");
            }
        }

        let timer = Timer::new(name.clone(), delay, repeat, action);
        let handle = match &self.owner {
            Some(owner) => self.scheduler.run_owned(owner, timer),
            None => self.scheduler.run(timer),
        };
        self.timers.insert(name, handle.clone());
        Ok(handle)
    }

    /// Stop the timer named `name`. Returns `false` if it was not active.
    pub fn stop(
        &mut self,
        name: &str,
    ) -> bool {
        self.timers
            .shift_remove(name)
            .is_some_and(|handle| handle.stop())
    }

    /// Check if the timer named `name` is still scheduled.
    pub fn is_active(
        &self,
        name: &str,
    ) -> bool {
        self.timers.get(name).is_some_and(Handle::is_running)
    }

    /// Handle of the timer named `name`, if it is still scheduled.
    pub fn handle(
        &self,
        name: &str,
    ) -> Option<&Handle> {
        self.timers.get(name).filter(|handle| handle.is_running())
    }

    /// Names of the scheduled timers, in start order.
    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.timers
            .iter()
            .filter(|(_, handle)| handle.is_running())
            .map(|(name, _)| name.as_str())
    }

    /// Number of scheduled timers.
    pub fn len(&self) -> usize {
        self.active().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget timers that finished on their own.
    pub fn prune(&mut self) {
        self.timers.retain(|_, handle| handle.is_running());
    }

    /// Stop every timer of this registry. Returns the number stopped.
    pub fn clear(&mut self) -> usize {
        self.timers
            .drain(..)
            .filter(|(_, handle)| handle.stop())
            .count()
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}
