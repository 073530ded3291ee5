//! Job records for the scheduler.
//!
//! A job is one scheduled top-level sequence plus its remaining delay, an
//! optional owner tag, and the continuation used to drain nested sequences.

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::sequence::Sequence;

/// Unique job identifier. Never reused, even after the job's slot is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl JobId {
    /// Get the inner value.
    #[inline]
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Job({})", self.0)
    }
}

/// Process-wide generator for job identifiers.
///
/// Ids are unique across every scheduler so a handle can never match a job
/// owned by another scheduler instance.
#[derive(Debug)]
pub struct JobIdGenerator {
    next_id: AtomicU64,
}

impl JobIdGenerator {
    /// Create a new generator starting at 1.
    #[inline]
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Generate the next job ID.
    #[inline]
    pub fn generate(&self) -> JobId {
        JobId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for JobIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) static JOB_IDS: JobIdGenerator = JobIdGenerator::new();

/// Location of a job in the scheduler's slot arena.
///
/// The slot alone is ambiguous once a job is removed and its slot reused; the
/// id disambiguates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct JobKey {
    pub(crate) slot: usize,
    pub(crate) id: JobId,
}

/// Back-reference to the object that started a job.
///
/// Holds a [`Weak`] only, so tagging a job never keeps its owner alive. Two
/// owners are equal when they point at the same allocation.
#[derive(Clone)]
pub struct Owner {
    target: Weak<dyn Any>,
}

impl Owner {
    /// Tag jobs with `target`.
    pub fn of<T: Any>(target: &Rc<T>) -> Self {
        let target: Weak<T> = Rc::downgrade(target);
        Self { target }
    }

    /// Check if the owning object is still alive.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }

    /// Check if this tag refers to `target`.
    #[inline]
    pub fn is<T: Any>(
        &self,
        target: &Rc<T>,
    ) -> bool {
        *self == Owner::of(target)
    }
}

impl PartialEq for Owner {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        Weak::ptr_eq(&self.target, &other.target)
    }
}

impl Eq for Owner {}

impl fmt::Debug for Owner {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Owner")
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

/// Transient state of a job within one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting out a positive delay.
    Scheduled,
    /// Will be advanced on the next tick.
    Ready,
    /// A step is executing right now.
    Advancing,
    /// Waiting on a nested sequence.
    PendingNested,
}

/// Innermost running sequence plus the outer sequences waiting on it.
///
/// `active` is the sequence stepped next. Each entry of `resume` is an outer
/// sequence that yielded the one above it; the last entry is resumed first.
#[derive(Default)]
pub(crate) struct Continuation {
    pub(crate) active: Option<Box<dyn Sequence>>,
    pub(crate) resume: SmallVec<[Box<dyn Sequence>; 2]>,
}

impl Continuation {
    pub(crate) fn new(sequence: Box<dyn Sequence>) -> Self {
        Self {
            active: Some(sequence),
            resume: SmallVec::new(),
        }
    }

    /// Nesting depth: 0 when only the top-level sequence is running.
    #[inline]
    pub(crate) fn depth(&self) -> usize {
        self.resume.len()
    }
}

/// One scheduled top-level sequence.
pub(crate) struct Job {
    pub(crate) id: JobId,
    /// Logical time at which the job is next due.
    pub(crate) resume_at: f64,
    pub(crate) owner: Option<Owner>,
    pub(crate) continuation: Continuation,
}

impl Job {
    pub(crate) fn new(
        id: JobId,
        resume_at: f64,
        owner: Option<Owner>,
        sequence: Box<dyn Sequence>,
    ) -> Self {
        Self {
            id,
            resume_at,
            owner,
            continuation: Continuation::new(sequence),
        }
    }

    /// Check if this job was started by `owner`.
    #[inline]
    pub(crate) fn is_owned_by(
        &self,
        owner: &Owner,
    ) -> bool {
        self.owner.as_ref() == Some(owner)
    }

    pub(crate) fn state(
        &self,
        now: f64,
        epsilon: f64,
    ) -> JobState {
        if self.continuation.active.is_none() {
            JobState::Advancing
        } else if self.resume_at - now > epsilon {
            JobState::Scheduled
        } else if self.continuation.depth() > 0 {
            JobState::PendingNested
        } else {
            JobState::Ready
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("resume_at", &self.resume_at)
            .field("owner", &self.owner)
            .field("depth", &self.continuation.depth())
            .finish()
    }
}
