//! Scheduler 单元测试
//!
//! 测试调度器的 tick 计时、嵌套序列、取消和等待原语


use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use super::{Handle, Scheduler, Sequence, Step, Yield};

/// Frame delta used by most tests.
pub(super) const DT: f32 = 1.0 / 60.0;

/// Tick until `handle` leaves the scheduler. Returns the tick on which it did.
pub(super) fn ticks_until_done(
    scheduler: &Scheduler,
    handle: &Handle,
    delta: f32,
    limit: u32,
) -> Option<u32> {
    for n in 1..=limit {
        scheduler.tick(delta).unwrap();
        if !handle.is_running() {
            return Some(n);
        }
    }
    None
}

/// Tick `n` times.
pub(super) fn tick_n(
    scheduler: &Scheduler,
    delta: f32,
    n: u32,
) {
    for _ in 0..n {
        scheduler.tick(delta).unwrap();
    }
}

/// Yields a fixed plan, then reports done. Counts its steps.
pub(super) struct Plan {
    plan: VecDeque<Yield>,
    calls: Rc<Cell<u32>>,
}

impl Plan {
    pub(super) fn new(plan: impl IntoIterator<Item = Yield>) -> (Self, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let seq = Self {
            plan: plan.into_iter().collect(),
            calls: calls.clone(),
        };
        (seq, calls)
    }
}

impl Sequence for Plan {
    fn step(&mut self) -> anyhow::Result<Step> {
        self.calls.set(self.calls.get() + 1);
        Ok(match self.plan.pop_front() {
            Some(value) => Step::Yield(value),
            None => Step::Done,
        })
    }
}

/// Pends forever, appending `tag` to a shared log on every step.
pub(super) struct Tagged {
    tag: &'static str,
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl Tagged {
    pub(super) fn new(
        tag: &'static str,
        log: &Rc<RefCell<Vec<&'static str>>>,
    ) -> Self {
        Self {
            tag,
            log: log.clone(),
        }
    }
}

impl Sequence for Tagged {
    fn step(&mut self) -> anyhow::Result<Step> {
        self.log.borrow_mut().push(self.tag);
        Ok(Step::next_frame())
    }
}

/// Counts steps and pends forever.
pub(super) fn counter() -> (impl Sequence, Rc<Cell<u32>>) {
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let seq = super::from_fn(move || {
        seen.set(seen.get() + 1);
        Ok(Step::next_frame())
    });
    (seq, calls)
}
