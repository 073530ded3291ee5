//! Runtime system
//!
//! This module contains the routine scheduler and the engine-facing helpers
//! built on it: named timers and delayed signal emission.

pub mod scheduler;
pub mod signal;
pub mod timer;

pub use scheduler::{Handle, Owner, Scheduler, SchedulerError, Sequence, Step, Yield};
