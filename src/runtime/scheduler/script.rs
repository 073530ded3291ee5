//! Linear routines built from a list of instructions.
//!
//! Most engine routines read as "wait, do something, wait, do something
//! else". [`Script`] expresses that without a hand-written state machine:
//! calls run back to back inside one step, and every wait ends the step.

use std::collections::VecDeque;
use std::fmt;

use super::sequence::{Sequence, Step, Yield};

enum Instruction {
    Yield(Yield),
    Call(Box<dyn FnOnce() -> anyhow::Result<()>>),
}

/// A sequence executing its instructions in order.
///
/// ```
/// use framewise::runtime::scheduler::{Scheduler, Script};
///
/// let scheduler = Scheduler::new();
/// let script = Script::new()
///     .wait(0.5)
///     .call(|| println!("half a second later"))
///     .next_frame()
///     .call(|| println!("one frame after that"));
/// scheduler.run(script);
/// ```
#[derive(Default)]
pub struct Script {
    instructions: VecDeque<Instruction>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend for `seconds`.
    pub fn wait(
        mut self,
        seconds: impl Into<Yield>,
    ) -> Self {
        self.instructions.push_back(Instruction::Yield(seconds.into()));
        self
    }

    /// Suspend until the next tick.
    pub fn next_frame(mut self) -> Self {
        self.instructions.push_back(Instruction::Yield(Yield::None));
        self
    }

    /// Suspend until `child` completes.
    pub fn nested(
        mut self,
        child: impl Sequence + 'static,
    ) -> Self {
        self.instructions
            .push_back(Instruction::Yield(Yield::nested(child)));
        self
    }

    /// Run `f` without suspending.
    pub fn call(
        mut self,
        f: impl FnOnce() + 'static,
    ) -> Self {
        self.instructions.push_back(Instruction::Call(Box::new(move || {
            f();
            Ok(())
        })));
        self
    }

    /// Run a fallible `f`; an error fails the job.
    pub fn try_call(
        mut self,
        f: impl FnOnce() -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.instructions.push_back(Instruction::Call(Box::new(f)));
        self
    }

    /// Number of instructions not yet executed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.instructions.len()
    }
}

impl Sequence for Script {
    fn step(&mut self) -> anyhow::Result<Step> {
        while let Some(instruction) = self.instructions.pop_front() {
            match instruction {
                Instruction::Call(f) => f()?,
                Instruction::Yield(value) => return Ok(Step::Yield(value)),
            }
        }
        Ok(Step::Done)
    }
}

impl fmt::Debug for Script {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Script")
            .field("remaining", &self.instructions.len())
            .finish()
    }
}
