//! Motif CLI
//!
//! Inspect stagger delay tables and simulate sequences and parallax sweeps on
//! a virtual clock.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use motif_animation::{
    compute_delays, Direction, ManualGeometry, ParallaxController, Rect, SequenceController,
    Viewport, Weighting,
};
use motif_core::{
    fibonacci_range, seconds_to_duration, MotionPreference, MotionSetting, REDUCED_MOTION_FEATURE,
};
use motif_platform::VirtualHost;

mod config;

use config::{DirectionName, MotifConfig};

/// Width of the virtual viewport used by parallax sweeps
const SWEEP_WIDTH: f32 = 1280.0;

/// Upper bound on the rows a parallax sweep prints
const MAX_SWEEP_SAMPLES: usize = 10_000;

#[derive(Parser)]
#[command(name = "motif")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Motif animation timing toolkit", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./motif.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stagger delay table
    Delays {
        /// Number of items
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Weight delays by the Fibonacci sequence
        #[arg(long, conflicts_with = "linear")]
        fibonacci: bool,

        /// Space delays evenly
        #[arg(long)]
        linear: bool,

        /// Fit the stagger into a total duration (seconds)
        #[arg(short, long)]
        total: Option<f64>,

        /// Apply the reduced-motion clamp
        #[arg(long)]
        reduced_motion: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print Fibonacci values for indices start..end
    Fib {
        /// First index
        #[arg(allow_hyphen_values = true)]
        start: i64,

        /// End index (exclusive)
        #[arg(allow_hyphen_values = true)]
        end: i64,
    },

    /// Play a sequence on a virtual clock and print each step
    Simulate {
        /// Number of steps
        #[arg(short, long)]
        steps: Option<usize>,

        /// Reveal the last step first
        #[arg(short, long)]
        reverse: bool,

        /// Simulate a user who asked for reduced motion
        #[arg(long)]
        reduced_motion: bool,

        /// Restart after the last step
        #[arg(long = "loop")]
        looping: bool,

        /// Virtual time to run for (seconds)
        #[arg(short, long, default_value = "10")]
        duration: f64,
    },

    /// Sweep an element through the viewport and print its offsets
    Parallax {
        /// Viewport height in pixels
        #[arg(long, default_value = "800")]
        viewport: f32,

        /// Element height in pixels
        #[arg(long, default_value = "200")]
        height: f32,

        /// Starting element top (defaults to the viewport height)
        #[arg(long, allow_hyphen_values = true)]
        from: Option<f32>,

        /// Final element top (defaults to minus the element height)
        #[arg(long, allow_hyphen_values = true)]
        to: Option<f32>,

        /// Scroll distance between samples in pixels
        #[arg(long, default_value = "50")]
        step: f32,
    },

    /// Write a default motif.toml
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cwd = std::env::current_dir()?;
    let explicit = cli.config.as_deref();
    let load = || MotifConfig::discover(explicit, &cwd);

    match cli.command {
        Commands::Delays {
            count,
            fibonacci,
            linear,
            total,
            reduced_motion,
            json,
        } => {
            let mut config = load()?;
            if fibonacci {
                config.stagger.fibonacci = true;
            }
            if linear {
                config.stagger.fibonacci = false;
            }
            if total.is_some() {
                config.stagger.total_duration = total;
            }
            config.accessibility.reduced_motion |= reduced_motion;
            let count = count.unwrap_or(config.sequence.steps);
            cmd_delays(&config, count, json)
        }

        Commands::Fib { start, end } => cmd_fib(start, end),

        Commands::Simulate {
            steps,
            reverse,
            reduced_motion,
            looping,
            duration,
        } => {
            let mut config = load()?;
            if let Some(steps) = steps {
                config.sequence.steps = steps;
            }
            if reverse {
                config.sequence.direction = DirectionName::Reverse;
            }
            config.sequence.looping |= looping;
            config.accessibility.reduced_motion |= reduced_motion;
            cmd_simulate(&config, duration)
        }

        Commands::Parallax {
            viewport,
            height,
            from,
            to,
            step,
        } => cmd_parallax(
            &load()?,
            viewport,
            height,
            from.unwrap_or(viewport),
            to.unwrap_or(-height),
            step,
        ),

        Commands::Init { force } => cmd_init(&MotifConfig::default_path(explicit, &cwd), force),
    }
}

#[derive(Serialize)]
struct DelayReport {
    count: usize,
    weighting: &'static str,
    reduced_motion: bool,
    total: f64,
    delays: Vec<f64>,
    offsets: Vec<f64>,
}

fn cmd_delays(config: &MotifConfig, count: usize, json: bool) -> Result<()> {
    let stagger = config.stagger_config(count);
    let table = compute_delays(&stagger).context("Invalid stagger configuration")?;

    let report = DelayReport {
        count,
        weighting: match stagger.weighting {
            Weighting::Linear => "linear",
            Weighting::Fibonacci => "fibonacci",
        },
        reduced_motion: stagger.reduced_motion,
        total: table.total(),
        delays: table.as_slice().to_vec(),
        offsets: table.cumulative(0.0),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} item(s), {} weighting{}",
        report.count,
        report.weighting,
        if report.reduced_motion {
            ", reduced motion"
        } else {
            ""
        }
    );
    println!("{:>5}  {:>10}  {:>10}", "item", "delay (s)", "start (s)");
    for (index, (delay, start)) in report.delays.iter().zip(&report.offsets).enumerate() {
        println!("{:>5}  {:>10.4}  {:>10.4}", index, delay, start);
    }
    println!("total {:.4}s", report.total);

    Ok(())
}

fn cmd_fib(start: i64, end: i64) -> Result<()> {
    let values = fibonacci_range(start, end);
    if values.is_empty() {
        info!("Empty range {}..{}", start, end);
    }
    for (offset, value) in values.iter().enumerate() {
        println!("F[{}] = {}", start.max(0) + offset as i64, value);
    }
    Ok(())
}

fn virtual_host(reduced_motion: bool) -> Rc<VirtualHost> {
    let host = Rc::new(VirtualHost::new());
    host.set_media_feature(
        REDUCED_MOTION_FEATURE,
        MotionSetting::from_reduced(reduced_motion).as_str(),
    );
    host
}

fn cmd_simulate(config: &MotifConfig, duration: f64) -> Result<()> {
    let limit = seconds_to_duration("duration", duration)?;
    let sequence = config.sequence_config();

    let host = virtual_host(config.accessibility.reduced_motion);
    let controller = SequenceController::new(host.clone(), MotionPreference::new(host.clone()));

    info!(
        "Simulating {} step(s), {:?}, {:?}{}",
        sequence.total_steps,
        sequence.direction,
        sequence.weighting,
        if sequence.looping { ", looping" } else { "" }
    );

    let clock = host.clone();
    controller.on_step(move |event| {
        println!(
            "{:>9.3}s  step {:>3}  (cycle {}){}",
            clock.now().as_secs_f64(),
            event.step,
            event.cycle,
            if event.is_final { "  final" } else { "" }
        );
    });

    controller
        .play(&sequence)
        .context("Invalid sequence configuration")?;
    host.run_until_idle(limit);

    let revealed: Vec<usize> = (0..sequence.total_steps)
        .filter(|&step| controller.should_animate_step(step))
        .collect();
    println!(
        "current step {:?}, playing {}, {} step(s) revealed",
        controller.current_step(),
        controller.is_playing(),
        revealed.len()
    );
    if controller.direction() == Direction::Reverse && !revealed.is_empty() {
        info!("Reverse playback revealed steps {:?}", revealed);
    }

    Ok(())
}

fn cmd_parallax(
    config: &MotifConfig,
    viewport: f32,
    height: f32,
    from: f32,
    to: f32,
    step: f32,
) -> Result<()> {
    if !(viewport.is_finite() && viewport > 0.0) {
        anyhow::bail!("--viewport must be a positive number of pixels, got {}", viewport);
    }
    if !(height.is_finite() && height >= 0.0) {
        anyhow::bail!("--height must be a non-negative number of pixels, got {}", height);
    }
    let positions = sweep_positions(from, to, step)?;

    let host = virtual_host(config.accessibility.reduced_motion);
    let element = Rc::new(ManualGeometry::new(
        Rect::new(0.0, from, SWEEP_WIDTH, height),
        Viewport::new(SWEEP_WIDTH, viewport),
    ));
    let controller = ParallaxController::new(
        host.clone(),
        element.clone(),
        MotionPreference::new(host.clone()),
        config.parallax_config(),
    );

    println!("{:>9}  {:>8}  {:>7}  transform", "top (px)", "progress", "in view");
    for top in positions {
        element.set_rect(Some(Rect::new(0.0, top, SWEEP_WIDTH, height)));
        controller.on_scroll();
        host.run_frames();

        let state = controller.state();
        println!(
            "{:>9.1}  {:>8.3}  {:>7}  {}",
            top, state.progress, state.in_view, state.transform
        );
    }

    Ok(())
}

/// Element tops visited by a sweep from `from` towards `to`
fn sweep_positions(from: f32, to: f32, step: f32) -> Result<Vec<f32>> {
    if !(step.is_finite() && step > 0.0) {
        anyhow::bail!("--step must be a positive number of pixels, got {}", step);
    }
    if !(from.is_finite() && to.is_finite()) {
        anyhow::bail!("--from and --to must be finite, got {} and {}", from, to);
    }

    let samples = ((to - from).abs() / step).floor();
    if samples >= MAX_SWEEP_SAMPLES as f32 {
        anyhow::bail!(
            "Sweep from {} to {} in steps of {} exceeds {} samples",
            from,
            to,
            step,
            MAX_SWEEP_SAMPLES
        );
    }

    let direction = if to < from { -1.0 } else { 1.0 };
    Ok((0..=samples as usize)
        .map(|index| from + direction * step * index as f32)
        .collect())
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists. Use --force to overwrite it.", path.display());
    }

    fs::write(path, MotifConfig::default().to_toml()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_positions_move_towards_target() {
        assert_eq!(sweep_positions(800.0, 600.0, 100.0).unwrap(), vec![800.0, 700.0, 600.0]);
        assert_eq!(sweep_positions(0.0, 120.0, 50.0).unwrap(), vec![0.0, 50.0, 100.0]);
        assert_eq!(sweep_positions(5.0, 5.0, 1.0).unwrap(), vec![5.0]);
    }

    #[test]
    fn test_sweep_rejects_unbounded_input() {
        assert!(sweep_positions(f32::INFINITY, 0.0, 50.0).is_err());
        assert!(sweep_positions(0.0, f32::NAN, 50.0).is_err());
        assert!(sweep_positions(0.0, 800.0, 0.0).is_err());
        assert!(sweep_positions(0.0, 800.0, 1e-6).is_err());
    }

    #[test]
    fn test_simulate_rejects_unrepresentable_duration() {
        let config = MotifConfig::default();
        assert!(cmd_simulate(&config, 1e20).is_err());
        assert!(cmd_simulate(&config, -1.0).is_err());
    }
}
