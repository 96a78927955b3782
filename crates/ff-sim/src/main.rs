//! FactoryFloor headless runner
//!
//! Plays matches without a presentation layer: a scripted player drives
//! the session, signals are recorded, a summary is printed.
//!
//! Usage:
//!   ff-sim                              - 3 waves, perfect player, random seed
//!   ff-sim --seed 7 --policy sloppy     - reproducible sloppy run
//!   ff-sim --config shift.yaml --trace out.json

mod autoplayer;
mod focus;
mod runner;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ff_line::GameConfig;

use crate::autoplayer::Policy;
use crate::runner::{SimOptions, SimReport};

#[derive(Parser)]
#[command(name = "ff-sim", about = "FactoryFloor headless match runner")]
struct Cli {
    /// Match config (.yaml, .yml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RNG seed (overrides the config)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Stop after this many completed waves
    #[arg(short, long, default_value_t = 3)]
    waves: u32,

    /// Simulated time limit
    #[arg(long, default_value_t = 300.0)]
    max_seconds: f32,

    /// Simulation frames per second
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Scripted player behaviour
    #[arg(short, long, value_enum, default_value_t = Policy::Perfect)]
    policy: Policy,

    /// Write the signal trace as JSON
    #[arg(short, long)]
    trace: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet { "error" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match &cli.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GameConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let options = SimOptions {
        waves: cli.waves,
        max_seconds: cli.max_seconds,
        fps: cli.fps,
        policy: cli.policy,
    };
    let report = runner::run(config, &options);

    if let Some(path) = &cli.trace {
        let json = report.trace.to_json().context("Failed to serialize trace")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write trace {}", path.display()))?;
        log::info!("Trace written to {}", path.display());
    }

    if !cli.quiet {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &SimReport) {
    let state = &report.final_state;
    let summary = report.trace.summary();

    println!("════════════════════════════════════════");
    println!(" FactoryFloor run (seed {})", report.seed);
    println!("════════════════════════════════════════");
    println!(" simulated    {:.1}s ({} frames)", report.seconds, report.frames);
    println!(" waves        {} completed, reached wave {}", report.waves_completed, state.wave);
    println!(" score        {}", state.score);
    println!(" health       {}/{}", state.health, state.max_health);
    println!(
        " tools left   freeze {} / quickscan {}",
        state.freeze_charges, state.quickscan_charges
    );
    println!(" successes    {}", summary.successes);
    println!(" mistakes     {}", summary.mistakes);
    println!(" actions      {}", report.player_actions);
    println!(
        " focus moves  {} ({} cut short)",
        report.focus_moves, report.focus_preempted
    );
    match summary.game_over {
        Some(reason) => println!(" result       GAME OVER: {reason}"),
        None => println!(" result       survived"),
    }
}
