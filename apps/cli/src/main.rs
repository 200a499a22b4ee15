#![deny(warnings)]

//! Headless CLI for running the rent simulation.
//!
//! Defaults to a deterministic fast-forward through virtual time; `--run`
//! drives the wall-clock runtime instead, polling snapshots like a front end
//! would.

use anyhow::{anyhow, Result};
use sim_core::{GameState, SimConfig};
use sim_runtime::{Simulation, SimulationHandle};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    seed: u64,
    run_secs: Option<u64>,
    fast_forward_secs: u64,
}

fn parse_args() -> Args {
    let mut args = Args {
        seed: 42,
        run_secs: None,
        fast_forward_secs: 60,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--seed" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.seed = v;
                }
            }
            "--run" => args.run_secs = it.next().and_then(|s| s.parse().ok()),
            "--fast-forward" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.fast_forward_secs = v;
                }
            }
            _ => {}
        }
    }
    args
}

fn fast_forward(seed: u64, secs: u64) -> GameState {
    let mut sim = Simulation::new(SimConfig { rng_seed: seed });
    let step = Duration::from_secs(15);
    let mut remaining = Duration::from_secs(secs);
    while remaining > Duration::ZERO {
        let dt = step.min(remaining);
        sim.advance_by(dt);
        remaining -= dt;
        info!(
            elapsed = ?sim.elapsed(),
            money = %sim.state().money,
            rating = sim.state().rating,
            houses = sim.state().houses.len(),
            "fast-forward step"
        );
    }
    sim.snapshot()
}

async fn run_wall_clock(seed: u64, secs: u64) -> Result<GameState> {
    let mut handle = SimulationHandle::start(SimConfig { rng_seed: seed });
    let deadline = tokio::time::Instant::now() + Duration::from_secs(secs);
    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    ticker.tick().await;
    while tokio::time::Instant::now() < deadline {
        ticker.tick().await;
        if let Some(snap) = handle.snapshot().await {
            info!(
                money = %snap.money,
                rating = snap.rating,
                houses = snap.houses.len(),
                "market snapshot"
            );
        }
    }
    let last = handle
        .snapshot()
        .await
        .ok_or_else(|| anyhow!("simulation stopped early"))?;
    handle.stop();
    Ok(last)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(seed = args.seed, ?args.run_secs, "starting rent simulation");

    let final_state = match args.run_secs {
        Some(secs) => run_wall_clock(args.seed, secs).await?,
        None => fast_forward(args.seed, args.fast_forward_secs),
    };
    sim_core::validate_state(&final_state)?;

    println!(
        "Rating: {} | Money: ${} | Houses: {}",
        final_state.rating,
        final_state.money,
        final_state.houses.len()
    );
    println!("{}", serde_json::to_string_pretty(&final_state)?);

    Ok(())
}
