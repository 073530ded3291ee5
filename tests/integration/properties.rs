//! Property tests for wait accounting and owner scoping

use std::cell::Cell;
use std::rc::Rc;

use framewise::{from_fn, Handle, Owner, Scheduler, Step, Yield};
use proptest::prelude::*;

fn frame_rate() -> impl Strategy<Value = f32> {
    prop_oneof![Just(30.0f32), Just(60.0f32), Just(144.0f32)]
}

/// Tick until `handle` finishes; returns the tick it finished on.
fn finish_tick(
    scheduler: &Scheduler,
    handle: &Handle,
    delta: f32,
) -> Option<u32> {
    (1..=20_000).find(|_| {
        scheduler.tick(delta).unwrap();
        !handle.is_running()
    })
}

/// Yields each wait in turn, then reports done.
fn waits(seconds: Vec<f64>) -> impl framewise::Sequence {
    let mut pending = seconds.into_iter();
    from_fn(move || {
        Ok(match pending.next() {
            Some(s) => Step::Yield(Yield::Seconds(s)),
            None => Step::Done,
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A wait of (n + frac) frames finishes on tick n + 1.
    #[test]
    fn single_wait_finishes_on_ceiling_tick(
        frames in 1u32..240,
        frac in 0.1f64..0.9,
        fps in frame_rate(),
    ) {
        let delta = 1.0 / fps;
        let total = (f64::from(frames) + frac) * f64::from(delta);
        let scheduler = Scheduler::new();
        let handle = scheduler.run(waits(vec![total]));

        prop_assert_eq!(finish_tick(&scheduler, &handle, delta), Some(frames + 1));
    }

    /// Consecutive waits do not accumulate rounding: the job finishes on the
    /// tick where their sum elapses.
    #[test]
    fn consecutive_waits_do_not_drift(
        first in 1u32..120,
        second in 1u32..120,
        frac_a in 0.1f64..0.4,
        frac_b in 0.1f64..0.4,
        fps in frame_rate(),
    ) {
        let delta = 1.0 / fps;
        let dt = f64::from(delta);
        let a = (f64::from(first) + frac_a) * dt;
        let b = (f64::from(second) + frac_b) * dt;
        let scheduler = Scheduler::new();
        let handle = scheduler.run(waits(vec![a, b]));

        prop_assert_eq!(
            finish_tick(&scheduler, &handle, delta),
            Some(first + second + 1)
        );
    }

    /// Waits that are whole numbers of frames finish exactly on their frame,
    /// however many are chained.
    #[test]
    fn whole_frame_waits_finish_on_their_frame(
        frames in prop::collection::vec(1u32..1200, 1..8),
        fps in frame_rate(),
    ) {
        let seconds = frames.iter().map(|&n| f64::from(n) / f64::from(fps)).collect();
        let scheduler = Scheduler::new();
        let handle = scheduler.run(waits(seconds));

        prop_assert_eq!(
            finish_tick(&scheduler, &handle, 1.0 / fps),
            Some(frames.iter().sum::<u32>())
        );
    }

    /// stop_all(owner) removes exactly that owner's jobs.
    #[test]
    fn stop_all_removes_exactly_the_owners_jobs(tags in prop::collection::vec(0usize..4, 1..40)) {
        struct Entity;

        let scheduler = Scheduler::new();
        let entities: Vec<Rc<Entity>> = (0..3).map(|_| Rc::new(Entity)).collect();
        let owners: Vec<Owner> = entities.iter().map(Owner::of).collect();

        let steps = Rc::new(Cell::new(0usize));
        let handles: Vec<(usize, Handle)> = tags
            .iter()
            .map(|&tag| {
                let seen = steps.clone();
                let seq = from_fn(move || {
                    seen.set(seen.get() + 1);
                    Ok(Step::next_frame())
                });
                // Tag 3 means untagged.
                let handle = match owners.get(tag) {
                    Some(owner) => scheduler.run_owned(owner, seq),
                    None => scheduler.run(seq),
                };
                (tag, handle)
            })
            .collect();

        let expected = tags.iter().filter(|&&tag| tag == 0).count();
        prop_assert_eq!(scheduler.stop_all(Some(&owners[0])), expected);
        for (tag, handle) in &handles {
            prop_assert_eq!(handle.is_running(), *tag != 0);
        }

        scheduler.tick(1.0 / 60.0).unwrap();
        prop_assert_eq!(steps.get(), tags.len() - expected);
    }
}
