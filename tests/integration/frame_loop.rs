//! Host loop integration tests
//!
//! Drive a scheduler the way an engine does: advance the frame clock, then
//! tick once per frame, and check what the routines did on which frame.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use framewise::util::config::{load_config, save_config, RuntimeConfig};
use framewise::{
    emit_delayed, Emitter, Scheduler, Script, Sequence, Step, TimerRegistry, WaitForObject,
    WaitWhile,
};

const DT: f32 = 1.0 / 60.0;

type Events = Rc<RefCell<Vec<(u32, String)>>>;

/// Frame counter shared with the routines, plus an event log.
struct Host {
    scheduler: Scheduler,
    frame: Rc<Cell<u32>>,
    events: Events,
}

impl Host {
    fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            frame: Rc::new(Cell::new(0)),
            events: Rc::default(),
        }
    }

    fn recorder(&self) -> impl Fn(&str) + 'static {
        let frame = self.frame.clone();
        let events = self.events.clone();
        move |what: &str| events.borrow_mut().push((frame.get(), what.to_string()))
    }

    fn run_frames(
        &self,
        frames: u32,
    ) {
        for _ in 0..frames {
            self.frame.set(self.frame.get() + 1);
            self.scheduler.tick(DT).unwrap();
        }
    }

    fn events(&self) -> Vec<(u32, String)> {
        self.events.borrow().clone()
    }
}

/// Fades from 1.0 to 0.0 over `duration`, one step per frame.
struct Fade {
    alpha: Rc<Cell<f32>>,
    duration: f32,
    elapsed: f32,
}

impl Sequence for Fade {
    fn step(&mut self) -> anyhow::Result<Step> {
        self.elapsed += DT;
        let t = (self.elapsed / self.duration).min(1.0);
        self.alpha.set(1.0 - t);
        if t >= 1.0 {
            Ok(Step::Done)
        } else {
            Ok(Step::next_frame())
        }
    }
}

#[test]
fn test_cutscene_timeline() {
    let host = Host::new(Scheduler::new());
    let alpha = Rc::new(Cell::new(1.0));
    let (say, fade_done) = (host.recorder(), host.recorder());
    let (start, end) = (host.recorder(), host.recorder());

    start("start");
    host.scheduler.run(
        Script::new()
            .wait(0.5)
            .call(move || say("line 1"))
            .nested(Fade {
                alpha: alpha.clone(),
                duration: 0.25,
                elapsed: 0.0,
            })
            .call(move || fade_done("faded"))
            .wait(1)
            .call(move || end("end")),
    );

    host.run_frames(200);
    let events = host.events();
    assert_eq!(events[0], (0, "start".to_string()));
    assert_eq!(events[1], (30, "line 1".to_string()));

    // The fade steps on frames 31 to 45 and the script resumes in the last
    // one. A wait started on a frame counts that frame.
    assert_eq!(events[2], (45, "faded".to_string()));
    assert_eq!(events[3], (104, "end".to_string()));
    assert!(alpha.get() <= 0.0);
    assert!(host.scheduler.is_empty());
}

#[test]
fn test_timers_signals_and_late_references_interleave() {
    let host = Host::new(Scheduler::new());
    let mut timers = TimerRegistry::new(host.scheduler.clone());
    let beat = host.recorder();
    timers
        .start("heartbeat", 0.25, true, move || beat("beat"))
        .unwrap();

    let signal = host.recorder();
    let emitter: Rc<dyn Emitter<u32>> =
        Rc::new(move |name: &str, data: u32| signal(&format!("{name}={data}")));
    emit_delayed(&host.scheduler, 0.1, emitter, "loaded", 1, None).unwrap();

    let parent: Rc<Cell<Option<u32>>> = Rc::default();
    let getter = parent.clone();
    let attached = host.recorder();
    host.scheduler.run(
        WaitForObject::new(move || getter.get())
            .then(move |id| attached(&format!("parent {id}"))),
    );

    host.run_frames(9);
    parent.set(Some(7));
    host.run_frames(21);

    let events = host.events();
    assert_eq!(
        events,
        [
            (6, "loaded=1".to_string()),
            (10, "parent 7".to_string()),
            (15, "beat".to_string()),
            (30, "beat".to_string()),
        ]
    );
    assert_eq!(timers.len(), 1);
}

#[test]
fn test_routine_waits_on_shared_state() {
    let host = Host::new(Scheduler::new());
    let hp = Rc::new(Cell::new(100));
    let view = hp.clone();
    let dead = host.recorder();
    host.scheduler.run(
        Script::new()
            .nested(WaitWhile::new(move || view.get() > 0))
            .call(move || dead("dead")),
    );

    let damage = hp.clone();
    host.scheduler.run(framewise::from_fn(move || {
        damage.set(damage.get() - 10);
        Ok(Step::next_frame())
    }));

    host.run_frames(20);
    // Damage is applied after the waiter checks in the same frame.
    assert_eq!(host.events(), [(11, "dead".to_string())]);
}

#[test]
fn test_scheduler_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("framewise.toml");
    let mut config = RuntimeConfig::default();
    config.scheduler.enable_stats = true;
    config.scheduler.initial_capacity = 4;
    save_config(&path, &config).unwrap();

    let loaded = load_config(&path).unwrap();
    let host = Host::new(Scheduler::with_config(loaded.scheduler));
    for _ in 0..10 {
        host.scheduler.run(Script::new().next_frame());
    }
    host.run_frames(3);

    let stats = host.scheduler.stats();
    assert_eq!(stats.scheduled, 10);
    assert_eq!(stats.completed, 10);
    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.peak_jobs, 10);
}
