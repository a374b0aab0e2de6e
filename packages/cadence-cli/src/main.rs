mod skirmish;

use anyhow::{Context, Result};
use cadence_core::{ClockConfig, Runtime};
use cadence_devtools::DevToolsContext;
use clap::{Parser, Subcommand};
use skirmish::{Skirmisher, Tally};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence scheduler CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a skirmish and report how the schedulers interleaved
    Simulate {
        /// Number of skirmishers in the roster
        #[arg(long, default_value_t = 3)]
        actors: usize,
        /// Frames to run
        #[arg(long, default_value_t = 240)]
        frames: u64,
        /// Real seconds fed to the clock each frame
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f64,
        /// Clock configuration as JSON; defaults to a fixed step of `dt`
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print the devtools snapshot as JSON
        #[arg(long)]
        dump: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            actors,
            frames,
            dt,
            config,
            dump,
        } => simulate(actors, frames, dt, config.as_deref(), dump),
    }
}

fn load_config(path: Option<&Path>, dt: f64) -> Result<ClockConfig> {
    let Some(path) = path else {
        return Ok(ClockConfig::fixed(dt));
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read clock config {}", path.display()))?;
    ClockConfig::from_json(&source).with_context(|| format!("invalid clock config {}", path.display()))
}

fn simulate(actors: usize, frames: u64, dt: f64, config: Option<&Path>, dump: bool) -> Result<()> {
    let devtools = Arc::new(DevToolsContext::new());
    let mut runtime = Runtime::new(load_config(config, dt)?)?.with_devtools(devtools.clone());
    let tally = Rc::new(Tally::default());

    let mut positions = Vec::with_capacity(actors);
    for order in 0..actors {
        let skirmisher = Skirmisher::new(format!("skirmisher-{order}"), runtime.effects(), tally.clone());
        positions.push((skirmisher.name().to_owned(), skirmisher.position()));
        let order = i32::try_from(order).context("too many actors")?;
        runtime.turns_mut().add(order, skirmisher);
    }

    tracing::info!(actors, frames, "simulation started");
    for _ in 0..frames {
        runtime.tick(dt);
    }
    let info = runtime.clock().info();
    tracing::info!(frame = info.frame, time = info.time, "simulation finished");

    let profiling = runtime.profiling();
    println!("frames:          {}", profiling.frames);
    println!("rounds:          {}", runtime.turns().round());
    println!("turns taken:     {}", profiling.admissions);
    println!("missiles fired:  {}", tally.missiles.get());
    println!("explosions:      {}", tally.explosions.get());
    println!("tasks completed: {}", profiling.tasks_completed());
    println!("peak turn tasks: {}", profiling.peak_turn_tasks);
    println!("peak free tasks: {}", profiling.peak_free_tasks);
    for (name, position) in &positions {
        println!("  {name:<16} at {:.2}", position.get());
    }

    if dump {
        println!("{}", devtools.export_state());
    }
    Ok(())
}
