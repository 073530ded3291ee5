//! Sequence contract for the scheduler.
//!
//! A [`Sequence`] is a resumable unit of cooperative work. Each call to
//! [`Sequence::step`] runs until the next suspension point and reports what
//! the scheduler should wait for before stepping it again.

use std::fmt;

use super::wait::WaitForSeconds;

/// A resumable unit of work advanced one step per scheduler tick.
///
/// Steps must return promptly: the scheduler runs on the host thread and the
/// boundaries between steps are the only suspension points.
pub trait Sequence {
    /// Run until the next suspension point.
    fn step(&mut self) -> anyhow::Result<Step>;
}

impl<S: Sequence + ?Sized> Sequence for Box<S> {
    #[inline]
    fn step(&mut self) -> anyhow::Result<Step> {
        (**self).step()
    }
}

/// Result of a single [`Sequence::step`].
pub enum Step {
    /// Still pending; resume after the yielded condition is met.
    Yield(Yield),
    /// Finished; the owning job is removed.
    Done,
}

impl Step {
    /// Resume on the next tick.
    #[inline]
    pub fn next_frame() -> Self {
        Step::Yield(Yield::None)
    }

    /// Resume after `seconds` of simulated time.
    #[inline]
    pub fn wait(seconds: impl Into<Yield>) -> Self {
        Step::Yield(seconds.into())
    }

    /// Resume once `child` has completed.
    #[inline]
    pub fn nested(child: impl Sequence + 'static) -> Self {
        Step::Yield(Yield::nested(child))
    }

    /// Check if this step finished the sequence.
    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, Step::Done)
    }
}

impl From<Yield> for Step {
    #[inline]
    fn from(value: Yield) -> Self {
        Step::Yield(value)
    }
}

impl fmt::Debug for Step {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Step::Yield(value) => f.debug_tuple("Yield").field(value).finish(),
            Step::Done => write!(f, "Done"),
        }
    }
}

/// What a pending sequence is waiting for.
pub enum Yield {
    /// Advance again on the very next tick.
    None,
    /// Suspend for the given number of seconds.
    Seconds(f64),
    /// Suspend until the child sequence reports done.
    Nested(Box<dyn Sequence>),
}

impl Yield {
    /// Wrap a child sequence.
    #[inline]
    pub fn nested(child: impl Sequence + 'static) -> Self {
        Yield::Nested(Box::new(child))
    }
}

impl fmt::Debug for Yield {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Yield::None => write!(f, "None"),
            Yield::Seconds(seconds) => f.debug_tuple("Seconds").field(seconds).finish(),
            Yield::Nested(_) => write!(f, "Nested(..)"),
        }
    }
}

impl From<f64> for Yield {
    #[inline]
    fn from(seconds: f64) -> Self {
        Yield::Seconds(seconds)
    }
}

impl From<f32> for Yield {
    #[inline]
    fn from(seconds: f32) -> Self {
        Yield::Seconds(f64::from(seconds))
    }
}

impl From<i32> for Yield {
    #[inline]
    fn from(seconds: i32) -> Self {
        Yield::Seconds(f64::from(seconds))
    }
}

impl From<u32> for Yield {
    #[inline]
    fn from(seconds: u32) -> Self {
        Yield::Seconds(f64::from(seconds))
    }
}

/// `WaitForSeconds` normalizes to a plain delay instead of a nested child, so
/// both spellings schedule identically.
impl From<WaitForSeconds> for Yield {
    #[inline]
    fn from(wait: WaitForSeconds) -> Self {
        Yield::Seconds(wait.seconds())
    }
}

/// Sequence backed by a closure. See [`from_fn`].
pub struct FromFn<F> {
    f: F,
}

impl<F> Sequence for FromFn<F>
where
    F: FnMut() -> anyhow::Result<Step>,
{
    #[inline]
    fn step(&mut self) -> anyhow::Result<Step> {
        (self.f)()
    }
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}

/// Build a sequence whose every step calls `f`.
///
/// ```
/// use framewise::runtime::scheduler::{from_fn, Step};
///
/// let mut frames = 0;
/// let seq = from_fn(move || {
///     frames += 1;
///     Ok(if frames < 3 { Step::next_frame() } else { Step::Done })
/// });
/// # drop(seq);
/// ```
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut() -> anyhow::Result<Step>,
{
    FromFn { f }
}
