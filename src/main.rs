//! Coaster Zombie headless runner
//!
//! Runs the simulation at a fixed timestep and prints JSON-line snapshots.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use glam::Vec2;
use serde::Serialize;

use coaster_zombie::Settings;
use coaster_zombie::consts::SIM_DT;
use coaster_zombie::sim::{GameState, RoundPhase, RoundStats, TickInput, tick};

#[derive(Debug, Parser)]
#[command(name = "coaster-zombie", about = "Run the hidden-zombie coaster simulation headless")]
struct Cli {
    /// Simulated seconds to run
    #[arg(long, default_value_t = 120.0)]
    seconds: f32,

    /// RNG seed (overrides the settings file)
    #[arg(long)]
    seed: Option<u64>,

    /// Settings JSON file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Disable the autopilot zombie; only scripted clicks act
    #[arg(long)]
    manual: bool,

    /// Scripted click as `SECONDS:X,Y` (repeatable)
    #[arg(long = "click", value_parser = parse_click)]
    clicks: Vec<ScriptedClick>,

    /// Print a snapshot every N ticks (0 = only at the end)
    #[arg(long, default_value_t = 60)]
    snapshot_every: u64,

    /// Write the effective settings to this path and exit
    #[arg(long)]
    write_settings: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
struct ScriptedClick {
    tick: u64,
    point: Vec2,
}

fn parse_click(s: &str) -> Result<ScriptedClick, String> {
    let (at, point) = s
        .split_once(':')
        .ok_or_else(|| format!("expected SECONDS:X,Y, got {s:?}"))?;
    let (x, y) = point
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {point:?}"))?;
    let seconds: f32 = at.trim().parse().map_err(|e| format!("bad time {at:?}: {e}"))?;
    let x: f32 = x.trim().parse().map_err(|e| format!("bad x {x:?}: {e}"))?;
    let y: f32 = y.trim().parse().map_err(|e| format!("bad y {y:?}: {e}"))?;
    if seconds < 0.0 {
        return Err(format!("click time must not be negative: {seconds}"));
    }
    Ok(ScriptedClick {
        tick: (seconds / SIM_DT).round() as u64,
        point: Vec2::new(x, y),
    })
}

#[derive(Debug, Serialize)]
struct Summary {
    seed: u64,
    ticks: u64,
    phase: RoundPhase,
    heads_eaten: u32,
    humans_alive: usize,
    stats: RoundStats,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };
    if let Some(seed) = cli.seed {
        settings.seed = seed;
    }

    if let Some(path) = &cli.write_settings {
        settings.save(path)?;
        log::info!("Wrote settings to {}", path.display());
        return Ok(());
    }

    log::info!(
        "Coaster Zombie (headless) starting: seed {}, {:.1}s, autopilot {}",
        settings.seed,
        cli.seconds,
        !cli.manual
    );

    let seed = settings.seed;
    let mut state = GameState::new(settings);
    let total_ticks = (cli.seconds.max(0.0) / SIM_DT).ceil() as u64;
    let mut clicks = cli.clicks.clone();
    clicks.sort_by_key(|c| c.tick);
    let mut pending = clicks.into_iter().peekable();

    for _ in 0..total_ticks {
        let now = state.time_ticks;
        let click = pending.next_if(|c| c.tick <= now).map(|c| c.point);
        let input = TickInput {
            click,
            autopilot: !cli.manual,
        };
        tick(&mut state, &input, SIM_DT);

        for event in state.drain_events() {
            log::debug!("{:?}", event);
        }
        if cli.snapshot_every > 0 && state.time_ticks % cli.snapshot_every == 0 {
            println!("{}", serde_json::to_string(&state.snapshot())?);
        }
    }

    let summary = Summary {
        seed,
        ticks: state.time_ticks,
        phase: state.phase(),
        heads_eaten: state.hunger.heads_eaten(),
        humans_alive: state.humans.iter().filter(|h| !h.is_dead()).count(),
        stats: state.round.stats,
    };
    println!("{}", serde_json::to_string(&summary)?);
    log::info!(
        "Finished: {} rides, {} eaten, {} escaped",
        summary.stats.rides_completed,
        summary.stats.humans_eaten,
        summary.stats.humans_escaped
    );
    Ok(())
}
