//! framewise
//!
//! A frame-synchronous cooperative routine scheduler: timers, delayed signal
//! emission, animation sequencing and anything else that runs "over several
//! frames" inside a single-threaded host loop.
//!
//! # Example
//!
//! ```rust
//! use framewise::{Scheduler, Script};
//!
//! let scheduler = Scheduler::new();
//! scheduler.run(Script::new().wait(0.5).call(|| println!("ding")));
//!
//! // Host loop: advance the frame clock, then tick once per frame.
//! for _ in 0..30 {
//!     scheduler.tick(1.0 / 60.0).unwrap();
//! }
//! assert_eq!(scheduler.count(), 0);
//! ```

#![doc(html_root_url = "https://docs.rs/framewise")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use runtime::scheduler::{
    from_fn, Handle, JobId, JobState, Owner, Scheduler, SchedulerError, Script, Sequence,
    StatsSnapshot, Step, WaitForJob, WaitForObject, WaitForSeconds, WaitUntil, WaitWhile, Yield,
};
pub use runtime::signal::{emit_delayed, DelayedEmit, Emitter};
pub use runtime::timer::{Timer, TimerRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "framewise";
