//! Ballpit entry point
//!
//! Headless driver for the arena: spawns bodies, streams their position
//! events, optionally resizes the population mid-run, then shuts down and
//! reports throughput. A rendering layer would subscribe exactly the way
//! this binary does.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::DVec2;

use ballpit::{ArenaConfig, Engine};

#[derive(Debug, Parser)]
#[command(name = "ballpit", about = "Concurrent bouncing-body arena, headless")]
struct Args {
    /// Number of bodies to spawn
    #[arg(short = 'n', long, default_value_t = 8)]
    count: usize,

    /// How long to run before shutting down
    #[arg(long, default_value_t = 5)]
    duration_secs: u64,

    /// Override the placement RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Arena config JSON (defaults to the built-in 400x420 arena)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Resize the population to this count halfway through the run
    #[arg(long)]
    resize_to: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ArenaConfig::from_json(&fs::read_to_string(path)?)?,
        None => ArenaConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let engine = Engine::new(config.clone())?;

    // Keep spawns out of the arena's center, purely to exercise the
    // validator hook the way an upper layer would.
    let center = DVec2::new(config.width / 2.0, config.height / 2.0);
    engine.set_placement_validator(move |position| position.distance(center) > 60.0);

    let subscription = engine.subscribe();
    engine.spawn(args.count, |position, body| {
        log::info!("body {} spawned at ({:.1}, {:.1})", body.id(), position.x, position.y);
    })?;

    let started = Instant::now();
    let total = Duration::from_secs(args.duration_secs);
    let mut events: u64 = 0;
    let mut resized = args.resize_to.is_none();

    while started.elapsed() < total {
        if subscription.recv_timeout(Duration::from_millis(50)).is_some() {
            events += 1;
        }
        while subscription.try_recv().is_some() {
            events += 1;
        }
        if !resized && started.elapsed() >= total / 2 {
            if let Some(target) = args.resize_to {
                engine.resize(target, |position, body| {
                    log::info!("body {} now at ({:.1}, {:.1})", body.id(), position.x, position.y);
                })?;
            }
            resized = true;
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    log::info!(
        "{events} position events in {elapsed:.1}s ({:.0}/s) from {} bodies",
        events as f64 / elapsed,
        engine.body_count()
    );
    engine.shutdown()?;
    Ok(())
}
