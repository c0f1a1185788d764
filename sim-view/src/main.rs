//! Application entry point for the particle-life viewer.
//!
//! Loads an optional JSON config, installs the logger, and then either runs
//! the simulation headless or hands it to [`Viewer`] inside eframe.

mod logging;
mod viewer;

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use sim_core::{ConfigFile, Simulation};
use viewer::Viewer;

#[derive(Parser, Debug)]
#[command(version, about = "Particle life on a 2-D torus")]
struct Args {
    /// JSON config file. Built-in defaults are used when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the seed from the config.
    #[arg(long)]
    seed: Option<u64>,

    /// Run without a window.
    #[arg(long)]
    headless: bool,

    /// Number of steps for a headless run.
    #[arg(long, requires = "headless")]
    steps: Option<u64>,

    /// Where a headless run writes its final frame as JSON.
    #[arg(long, requires = "headless")]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut file = match &args.config {
        Some(path) => ConfigFile::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ConfigFile::default(),
    };
    if let Some(seed) = args.seed {
        file.simulation_parameters.seed = seed;
    }

    logging::init(&file.logging)?;
    if let Some(path) = &args.config {
        log::info!("using config {}", path.display());
    }

    let sim = Simulation::new(file.simulation_parameters.clone())
        .context("initializing simulation")?;

    if args.headless {
        run_headless(sim, &file, &args)
    } else {
        run_viewer(sim, file.run_control.max_steps, file.visualization.colors)
    }
}

fn run_headless(mut sim: Simulation, file: &ConfigFile, args: &Args) -> anyhow::Result<()> {
    let Some(steps) = args.steps.or(file.run_control.max_steps) else {
        bail!("--headless needs --steps or run_control.max_steps in the config");
    };

    log::info!("running {steps} steps headless");
    sim.run(steps, file.run_control.log_throttle_steps)
        .with_context(|| format!("simulation halted after {} steps", sim.step_count()))?;

    let frame = sim.snapshot().to_frame();
    log::info!(
        "finished at step {} | mean speed {:.4}",
        frame.step,
        sim.particles().mean_speed()
    );

    if let Some(path) = &args.output {
        let json = serde_json::to_string(&frame).context("serializing final frame")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("final frame written to {}", path.display());
    }
    Ok(())
}

/// Starts the native eframe application.
fn run_viewer(
    sim: Simulation,
    max_steps: Option<u64>,
    colors: Option<Vec<[u8; 3]>>,
) -> anyhow::Result<()> {
    let options = eframe::NativeOptions::default();

    eframe::run_native(
        "Particle Life",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(Viewer::new(sim, max_steps, colors.as_deref())))
        }),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}
