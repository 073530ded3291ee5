//! Wait primitives.
//!
//! Small sequences covering the common suspension patterns. Each one is a
//! minimal state machine over the [`Sequence`] contract and can be scheduled
//! directly or yielded as a nested child.

use std::fmt;

use super::handle::Handle;
use super::sequence::{Sequence, Step, Yield};

/// Wait for a fixed number of seconds.
///
/// The first step yields [`Yield::Seconds`]; the second reports done. Yielding
/// `WaitForSeconds::new(f).into()` is the same as yielding `f` directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitForSeconds {
    seconds: f64,
    started: bool,
}

impl WaitForSeconds {
    pub fn new(seconds: f64) -> Self {
        Self {
            seconds,
            started: false,
        }
    }

    #[inline]
    pub fn seconds(&self) -> f64 {
        self.seconds
    }
}

impl Sequence for WaitForSeconds {
    fn step(&mut self) -> anyhow::Result<Step> {
        if self.started {
            return Ok(Step::Done);
        }
        self.started = true;
        Ok(Step::Yield(Yield::Seconds(self.seconds)))
    }
}

/// Stay pending while `predicate` returns true.
///
/// Checked once per tick; no delay is introduced. A predicate that never turns
/// false suspends the job forever.
pub struct WaitWhile<P> {
    predicate: P,
}

impl<P> WaitWhile<P>
where
    P: FnMut() -> bool,
{
    pub fn new(predicate: P) -> Self {
        Self { predicate }
    }
}

impl<P> Sequence for WaitWhile<P>
where
    P: FnMut() -> bool,
{
    fn step(&mut self) -> anyhow::Result<Step> {
        if (self.predicate)() {
            Ok(Step::next_frame())
        } else {
            Ok(Step::Done)
        }
    }
}

impl<P> fmt::Debug for WaitWhile<P> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("WaitWhile").finish_non_exhaustive()
    }
}

/// Stay pending until `predicate` returns true.
pub struct WaitUntil<P> {
    predicate: P,
}

impl<P> WaitUntil<P>
where
    P: FnMut() -> bool,
{
    pub fn new(predicate: P) -> Self {
        Self { predicate }
    }
}

impl<P> Sequence for WaitUntil<P>
where
    P: FnMut() -> bool,
{
    fn step(&mut self) -> anyhow::Result<Step> {
        if (self.predicate)() {
            Ok(Step::Done)
        } else {
            Ok(Step::next_frame())
        }
    }
}

impl<P> fmt::Debug for WaitUntil<P> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("WaitUntil").finish_non_exhaustive()
    }
}

/// Wait until a lazily assigned reference becomes available.
///
/// `getter` is polled once per tick. When it first returns `Some`, the
/// optional continuation receives the value and the sequence reports done.
pub struct WaitForObject<T, G> {
    getter: G,
    then: Option<Box<dyn FnOnce(T)>>,
}

impl<T, G> WaitForObject<T, G>
where
    G: FnMut() -> Option<T>,
{
    pub fn new(getter: G) -> Self {
        Self { getter, then: None }
    }

    /// Invoke `f` with the resolved value.
    pub fn then(
        mut self,
        f: impl FnOnce(T) + 'static,
    ) -> Self {
        self.then = Some(Box::new(f));
        self
    }
}

impl<T, G> Sequence for WaitForObject<T, G>
where
    G: FnMut() -> Option<T>,
{
    fn step(&mut self) -> anyhow::Result<Step> {
        match (self.getter)() {
            Some(value) => {
                if let Some(then) = self.then.take() {
                    then(value);
                }
                Ok(Step::Done)
            }
            None => Ok(Step::next_frame()),
        }
    }
}

impl<T, G> fmt::Debug for WaitForObject<T, G> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("WaitForObject")
            .field("has_continuation", &self.then.is_some())
            .finish_non_exhaustive()
    }
}

/// Wait until another job has left the scheduler.
///
/// Completes immediately for [`Handle::none`].
#[derive(Debug, Clone)]
pub struct WaitForJob {
    handle: Handle,
}

impl WaitForJob {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Sequence for WaitForJob {
    fn step(&mut self) -> anyhow::Result<Step> {
        if self.handle.is_running() {
            Ok(Step::next_frame())
        } else {
            Ok(Step::Done)
        }
    }
}
