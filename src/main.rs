//! framewise - CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::info;

use framewise::util::config::{self, RuntimeConfig};
use framewise::util::logger::{self, LogLevel};
use framewise::{
    emit_delayed, Emitter, Owner, Scheduler, Script, TimerRegistry, WaitForObject, WaitWhile,
    NAME, VERSION,
};

/// Frame-synchronous cooperative routine scheduler
#[derive(Parser, Debug)]
#[command(name = "framewise")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Config file (overrides FRAMEWISE_CONFIG and ./framewise.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive a demo host loop and log what the routines do
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value_t = 180)]
        frames: u32,

        /// Frames per second of the simulated clock
        #[arg(long, default_value_t = 60.0)]
        fps: f32,
    },

    /// Print the effective configuration
    Config,

    /// Print version information
    Version,
}

fn load(args: &Args) -> Result<RuntimeConfig> {
    let mut config = match &args.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => config::load_default_config().context("Failed to load config")?,
    };
    if let Some(level) = args.log_level {
        config.log.level = level;
    }
    Ok(config)
}

/// A stand-in for an entity whose routines are torn down with it.
struct Entity {
    name: &'static str,
}

fn simulate(
    config: &RuntimeConfig,
    frames: u32,
    fps: f32,
) -> Result<()> {
    anyhow::ensure!(fps.is_finite() && fps > 0.0, "fps must be positive, got {}", fps);
    let delta = 1.0 / fps;

    let mut scheduler_config = config.scheduler.clone();
    scheduler_config.enable_stats = true;
    let scheduler = Scheduler::with_config(scheduler_config);

    let mut timers = TimerRegistry::new(scheduler.clone());
    timers.start("heartbeat", 1.0, true, || info!("heartbeat"))?;

    let emitter: Rc<dyn Emitter<u32>> =
        Rc::new(|name: &str, data: u32| info!(signal = name, data, "signal emitted"));
    emit_delayed(&scheduler, 0.75, emitter, "level_loaded", 1, None)?;

    let player = Rc::new(Entity { name: "player" });
    let owner = Owner::of(&player);
    scheduler.run_owned(
        &owner,
        Script::new()
            .wait(0.5)
            .call(|| info!("player: blink"))
            .wait(10.0)
            .call(|| info!("player: never reached, torn down first")),
    );

    // A reference attached a few frames in, as a parent entity would be.
    let parent: Rc<Cell<Option<u32>>> = Rc::new(Cell::new(None));
    let getter = parent.clone();
    scheduler.run(
        WaitForObject::new(move || getter.get()).then(|id| info!(parent = id, "parent attached")),
    );

    let frame = Rc::new(Cell::new(0u32));
    let frame_view = frame.clone();
    scheduler.run(
        Script::new()
            .nested(WaitWhile::new(move || frame_view.get() < 30))
            .call(|| info!("half a second of frames counted")),
    );

    for n in 1..=frames {
        frame.set(n);
        if n == 10 {
            parent.set(Some(7));
        }
        if n == frames / 2 {
            let stopped = scheduler.stop_all(Some(&owner));
            info!(entity = player.name, stopped, "entity torn down");
        }
        scheduler
            .tick(delta)
            .with_context(|| format!("Frame {} failed", n))?;
    }

    let stats = scheduler.stats();
    info!(
        frames,
        active = scheduler.count(),
        completed = stats.completed,
        stopped = stats.stopped,
        steps = stats.steps,
        "simulation finished"
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load(&args)?;
    logger::init_with_level(config.log.level);

    match args.command {
        Commands::Simulate { frames, fps } => {
            simulate(&config, frames, fps).context("Simulation failed")?;
        }
        Commands::Config => {
            print!("{}", config::to_toml(&config)?);
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}
