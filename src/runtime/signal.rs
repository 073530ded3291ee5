//! Delayed signal emission.
//!
//! The signal bus lives outside this crate. It plugs in through [`Emitter`];
//! this module only schedules the emission.

use std::fmt;
use std::rc::Rc;

use super::scheduler::{Handle, Owner, Scheduler, SchedulerError, Sequence, Step, Yield};

/// Something that can publish a named signal.
pub trait Emitter<T> {
    fn emit(
        &self,
        name: &str,
        data: T,
    );
}

impl<T, F> Emitter<T> for F
where
    F: Fn(&str, T),
{
    fn emit(
        &self,
        name: &str,
        data: T,
    ) {
        self(name, data)
    }
}

/// One-shot sequence: wait, then emit.
pub struct DelayedEmit<T> {
    emitter: Rc<dyn Emitter<T>>,
    name: String,
    data: Option<T>,
    delay: f64,
    waited: bool,
}

impl<T> DelayedEmit<T> {
    pub fn new(
        emitter: Rc<dyn Emitter<T>>,
        name: impl Into<String>,
        data: T,
        delay: f64,
    ) -> Self {
        Self {
            emitter,
            name: name.into(),
            data: Some(data),
            delay,
            waited: false,
        }
    }
}

impl<T> Sequence for DelayedEmit<T> {
    fn step(&mut self) -> anyhow::Result<Step> {
        if !self.waited {
            self.waited = true;
            return Ok(Step::Yield(Yield::Seconds(self.delay)));
        }
        if let Some(data) = self.data.take() {
            self.emitter.emit(&self.name, data);
        }
        Ok(Step::Done)
    }
}

impl<T> fmt::Debug for DelayedEmit<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("DelayedEmit")
            .field("name", &self.name)
            .field("delay", &self.delay)
            .field("pending", &self.data.is_some())
            .finish_non_exhaustive()
    }
}

/// Emit `name` with `data` through `emitter` after `delay` seconds.
///
/// The returned handle cancels the emission if stopped before it fires.
pub fn emit_delayed<T: 'static>(
    scheduler: &Scheduler,
    delay: f32,
    emitter: Rc<dyn Emitter<T>>,
    name: impl Into<String>,
    data: T,
    owner: Option<&Owner>,
) -> Result<Handle, SchedulerError> {
    if !delay.is_finite() || delay < 0.0 {
        return Err(SchedulerError::InvalidDelay { delay });
    }
    let emit = DelayedEmit::new(emitter, name, data, f64::from(delay));
    Ok(match owner {
        Some(owner) => scheduler.run_owned(owner, emit),
        None => scheduler.run(emit),
    })
}
