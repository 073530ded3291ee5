//! Owner-scoped teardown integration tests

use std::cell::Cell;
use std::rc::Rc;

use framewise::{
    emit_delayed, from_fn, Emitter, Handle, Owner, Scheduler, Script, Step, TimerRegistry,
    WaitForJob,
};

const DT: f32 = 1.0 / 60.0;

/// An engine object with routines of its own.
struct Enemy {
    hits: Cell<u32>,
}

fn tick_n(
    scheduler: &Scheduler,
    n: u32,
) {
    for _ in 0..n {
        scheduler.tick(DT).unwrap();
    }
}

#[test]
fn test_entity_destroy_stops_every_routine_it_started() {
    let scheduler = Scheduler::new();
    let enemy = Rc::new(Enemy { hits: Cell::new(0) });
    let player = Rc::new(Enemy { hits: Cell::new(0) });
    let enemy_owner = Owner::of(&enemy);
    let player_owner = Owner::of(&player);

    // Attack loop, a delayed signal and a timer, all started by the enemy.
    let target = player.clone();
    scheduler.run_owned(
        &enemy_owner,
        from_fn(move || {
            target.hits.set(target.hits.get() + 1);
            Ok(Step::wait(0.1))
        }),
    );
    let emitted = Rc::new(Cell::new(false));
    let sink = emitted.clone();
    let emitter: Rc<dyn Emitter<()>> = Rc::new(move |_: &str, _: ()| sink.set(true));
    emit_delayed(&scheduler, 1.0, emitter, "roar", (), Some(&enemy_owner)).unwrap();
    let mut timers = TimerRegistry::with_owner(scheduler.clone(), enemy_owner.clone());
    let blinks = Rc::new(Cell::new(0));
    let blink = blinks.clone();
    timers
        .start("blink", 0.2, true, move || blink.set(blink.get() + 1))
        .unwrap();

    // The player's regeneration is unaffected.
    let regen = scheduler.run_owned(&player_owner, from_fn(|| Ok(Step::wait(0.5))));

    // Hits land on frames 1, 6, 12, 18, 24 and 30.
    tick_n(&scheduler, 30);
    assert_eq!(player.hits.get(), 6);

    assert_eq!(scheduler.stop_all(Some(&enemy_owner)), 3);
    assert!(timers.is_empty());

    tick_n(&scheduler, 120);
    assert_eq!(player.hits.get(), 6);
    assert!(!emitted.get());
    assert_eq!(blinks.get(), 2);
    assert!(regen.is_running());
    assert_eq!(enemy.hits.get(), 0);
}

#[test]
fn test_dropped_owner_cleaned_up_by_stop_orphaned() {
    let scheduler = Scheduler::new();
    let enemy = Rc::new(Enemy { hits: Cell::new(0) });
    let owner = Owner::of(&enemy);
    let steps = Rc::new(Cell::new(0));
    let seen = steps.clone();
    scheduler.run_owned(
        &owner,
        from_fn(move || {
            seen.set(seen.get() + 1);
            Ok(Step::next_frame())
        }),
    );

    tick_n(&scheduler, 2);
    drop(enemy);
    assert!(!owner.is_alive());

    // Owner tags are weak: the job lingers until swept.
    tick_n(&scheduler, 2);
    assert_eq!(steps.get(), 4);
    assert_eq!(scheduler.stop_orphaned(), 1);
    tick_n(&scheduler, 2);
    assert_eq!(steps.get(), 4);
}

#[test]
fn test_waiters_released_when_owner_torn_down() {
    let scheduler = Scheduler::new();
    let enemy = Rc::new(Enemy { hits: Cell::new(0) });
    let owner = Owner::of(&enemy);
    let attack = scheduler.run_owned(&owner, from_fn(|| Ok(Step::next_frame())));

    let finished = Rc::new(Cell::new(0u32));
    let frame = Rc::new(Cell::new(0u32));
    let (sink, clock) = (finished.clone(), frame.clone());
    let waiter = scheduler.run(
        Script::new()
            .nested(WaitForJob::new(attack.clone()))
            .call(move || sink.set(clock.get())),
    );

    for n in 1..=20 {
        frame.set(n);
        if n == 8 {
            scheduler.stop_all(Some(&owner));
        }
        scheduler.tick(DT).unwrap();
    }
    assert_eq!(finished.get(), 8);
    assert!(!waiter.is_running());
}

#[test]
fn test_stop_all_from_routine_ends_the_level() {
    let scheduler = Scheduler::new();
    let handles: Vec<Handle> = (0..5)
        .map(|_| scheduler.run(from_fn(|| Ok(Step::next_frame()))))
        .collect();
    let level_end = scheduler.clone();
    scheduler.run(Script::new().wait(0.5).call(move || {
        level_end.stop_all(None);
    }));

    tick_n(&scheduler, 29);
    assert_eq!(scheduler.count(), 6);
    scheduler.tick(DT).unwrap();
    assert!(scheduler.is_empty());
    assert!(handles.iter().all(|handle| !handle.is_running()));
}
