//! antscope CLI: antenna-analyzer sweep analysis from the command line.
//!
//! Reads sweep files, applies calibration and feedline de-embedding, and
//! reports SWR, impedance and TDR results.

mod config;
mod orchestrator;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lib_dsp::TdrMode;
use lib_formats::{SaveOptions, TouchstoneKind};
use lib_types::{FarEndMode, Ohms, UnitSystem};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "antscope")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum FarEndArg {
    None,
    Add,
    Subtract,
}

impl From<FarEndArg> for FarEndMode {
    fn from(arg: FarEndArg) -> Self {
        match arg {
            FarEndArg::None => FarEndMode::None,
            FarEndArg::Add => FarEndMode::Add,
            FarEndArg::Subtract => FarEndMode::Subtract,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum StrategyArg {
    Mirrored,
    Legacy,
}

impl From<StrategyArg> for TdrMode {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Mirrored => TdrMode::Mirrored,
            StrategyArg::Legacy => TdrMode::Legacy,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise a sweep file
    Inspect {
        /// Path to the sweep (.s1p, .csv, .nwl, .antdata, .asd)
        file: PathBuf,

        /// Analyzer model to check the frequency range against
        #[arg(long)]
        model: Option<String>,
    },

    /// Compute derived series (SWR, return loss, impedance, Smith chart)
    Analyze {
        /// Path to the sweep file
        file: PathBuf,

        /// Path to the configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Open standard sweep
        #[arg(long, requires_all = ["short", "load"])]
        open: Option<PathBuf>,

        /// Short standard sweep
        #[arg(long, requires_all = ["open", "load"])]
        short: Option<PathBuf>,

        /// Load standard sweep
        #[arg(long, requires_all = ["open", "short"])]
        load: Option<PathBuf>,

        /// Feedline de-embedding mode
        #[arg(long)]
        far_end: Option<FarEndArg>,

        /// Feedline length, in the configured cable length units
        #[arg(long)]
        cable_length: Option<f64>,

        /// Output directory for results
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },

    /// Time-domain reflectometry of a sweep starting at DC
    Tdr {
        /// Path to the sweep file
        file: PathBuf,

        /// Path to the configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Transform implementation
        #[arg(long)]
        strategy: Option<StrategyArg>,

        /// Velocity factor of the line
        #[arg(long)]
        velocity_factor: Option<f64>,

        /// Report distances in feet
        #[arg(long)]
        imperial: bool,

        /// Output directory for results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a sweep file to another format
    Convert {
        /// Source file
        input: PathBuf,

        /// Destination file; the extension selects the format
        output: PathBuf,

        /// Touchstone flavour when writing .s1p
        #[arg(long, default_value = "z-ri")]
        touchstone: TouchstoneKind,

        /// Reference impedance written into Touchstone files
        #[arg(long, default_value = "50")]
        z0: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Inspect { file, model } => {
            inspect(&file, model, cli.format)?;
        }
        Commands::Analyze { file, config, open, short, load, far_end, cable_length, output } => {
            let mut app = config::load_or_default(config.as_deref())?;
            if let (Some(open), Some(short), Some(load)) = (open, short, load) {
                app.calibration = Some(config::CalibrationFiles { open, short, load });
            }
            if let Some(mode) = far_end {
                app.engine.cable.mode = mode.into();
            }
            if let Some(length) = cable_length {
                app.engine.cable.length = length;
            }
            config::validate_config(&app)?;
            analyze(&file, app, &output, cli.format)?;
        }
        Commands::Tdr { file, config, strategy, velocity_factor, imperial, output } => {
            let mut app = config::load_or_default(config.as_deref())?;
            if let Some(strategy) = strategy {
                app.engine.tdr.mode = strategy.into();
            }
            if let Some(vf) = velocity_factor {
                app.engine.cable.velocity_factor = vf;
            }
            if imperial {
                app.engine.unit_system = UnitSystem::Imperial;
            }
            config::validate_config(&app)?;
            tdr(&file, app, output.as_deref(), cli.format)?;
        }
        Commands::Convert { input, output, touchstone, z0 } => {
            let options = SaveOptions { touchstone, z0: Ohms(z0) };
            let points = orchestrator::convert(&input, &output, &options)?;
            println!("Converted {} points: {:?} -> {:?}", points, input, output);
        }
    }

    Ok(())
}

fn inspect(file: &Path, model: Option<String>, format: OutputFormat) -> Result<()> {
    tracing::info!("Inspecting sweep file: {:?}", file);

    let app = config::AppConfig {
        model,
        ..config::AppConfig::default()
    };
    config::validate_config(&app)?;

    let mut orch = orchestrator::Orchestrator::new(app)?;
    let report = orch.inspect(file)?;
    print!("{}", output::render_inspect(&report, format)?);
    Ok(())
}

fn analyze(file: &Path, app: config::AppConfig, output_dir: &Path, format: OutputFormat) -> Result<()> {
    tracing::info!("Analyzing sweep file: {:?}", file);

    let mut orch = orchestrator::Orchestrator::new(app)?;
    let report = orch.analyze(file)?;
    let path = output::write_analysis(&report, output_dir, format)?;

    println!("Analysis of {} ({} points)", report.name, report.samples.len());
    if let Some(best) = &report.best_swr {
        println!("  Best SWR: {:.3} at {:.3} MHz", best.value, best.key / 1e3);
    }
    println!("  Written to: {:?}", path);
    Ok(())
}

fn tdr(file: &Path, app: config::AppConfig, output_dir: Option<&Path>, format: OutputFormat) -> Result<()> {
    tracing::info!("Running TDR on sweep file: {:?}", file);

    let mut orch = orchestrator::Orchestrator::new(app)?;
    let report = orch.tdr(file)?;

    match output_dir {
        Some(dir) => {
            let path = output::write_tdr(&report, dir, format)?;
            print!("{}", output::render_tdr(&report, OutputFormat::Text)?);
            println!("  Written to: {:?}", path);
        }
        None => print!("{}", output::render_tdr(&report, format)?),
    }
    Ok(())
}
