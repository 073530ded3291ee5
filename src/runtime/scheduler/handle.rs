//! External references to scheduled jobs.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Weak;

use super::job::{JobId, JobKey};
use super::Inner;

/// Opaque reference to a scheduled job.
///
/// A handle never caches the job's status: [`Handle::is_running`] asks the
/// scheduler every time. Equality and hashing use the job's identity only, and
/// [`Handle::none`] is never running.
#[derive(Clone)]
pub struct Handle {
    key: Option<JobKey>,
    scheduler: Weak<Inner>,
}

impl Handle {
    pub(crate) fn new(
        key: JobKey,
        scheduler: Weak<Inner>,
    ) -> Self {
        Self {
            key: Some(key),
            scheduler,
        }
    }

    /// Handle that refers to no job.
    pub fn none() -> Self {
        Self {
            key: None,
            scheduler: Weak::new(),
        }
    }

    /// Check if this is the [`Handle::none`] sentinel.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.key.is_none()
    }

    /// Identity of the referenced job.
    #[inline]
    pub fn id(&self) -> Option<JobId> {
        self.key.map(|key| key.id)
    }

    #[inline]
    pub(crate) fn key(&self) -> Option<JobKey> {
        self.key
    }

    /// Check if the job is still in its scheduler's active set.
    ///
    /// Returns `false` once the scheduler itself has been dropped.
    pub fn is_running(&self) -> bool {
        match (self.key, self.scheduler.upgrade()) {
            (Some(key), Some(inner)) => inner.contains(key),
            _ => false,
        }
    }

    /// Stop the job. Same as [`Scheduler::stop`](super::Scheduler::stop).
    pub fn stop(&self) -> bool {
        match (self.key, self.scheduler.upgrade()) {
            (Some(key), Some(inner)) => inner.remove(key),
            _ => false,
        }
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::none()
    }
}

impl PartialEq for Handle {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Handle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.id() {
            Some(id) => f.debug_tuple("Handle").field(&id.inner()).finish(),
            None => write!(f, "Handle(none)"),
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{}", id),
            None => write!(f, "Job(none)"),
        }
    }
}
