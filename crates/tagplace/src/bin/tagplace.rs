//! `tagplace` command line tool: replay recorded sessions, check configs.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use tagplace::replay::{run_replay_files, ReplayOptions};
use tagplace::{PipelineConfig, PlacementMode, Zone};

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "tagplace")]
#[command(about = "Replay recorded marker sessions through the tagplace pipeline")]
#[command(version)]
struct Cli {
    /// Log verbosity. With the `tracing` feature, RUST_LOG overrides it.
    #[arg(long, global = true, value_enum, default_value_t = LogLevelArg::Info)]
    log_level: LogLevelArg,

    /// Emit JSON logs (requires the `tracing` feature).
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded session and write a JSON report.
    Replay(ReplayArgs),

    /// Validate a pipeline config and print its bindings.
    CheckConfig {
        /// Path to the pipeline config (JSON).
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// Path to the pipeline config (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Path to the recorded session (JSON).
    #[arg(long)]
    session: PathBuf,

    /// Override the configured initial mode.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Restrict auto placement to a configured zone list.
    #[arg(long, value_enum)]
    zone: Option<Zone>,

    /// Report path. Printed to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Auto,
    OnDemand,
    Slow,
}

impl From<ModeArg> for PlacementMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => PlacementMode::AutoPlace,
            ModeArg::OnDemand => PlacementMode::OnDemand,
            ModeArg::Slow => PlacementMode::SlowPlacing,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Off => LevelFilter::Off,
            LogLevelArg::Error => LevelFilter::Error,
            LogLevelArg::Warn => LevelFilter::Warn,
            LogLevelArg::Info => LevelFilter::Info,
            LogLevelArg::Debug => LevelFilter::Debug,
            LogLevelArg::Trace => LevelFilter::Trace,
        }
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.into(), cli.json_logs)?;

    match cli.command {
        Commands::Replay(args) => run_replay_cmd(&args),
        Commands::CheckConfig { path } => run_check_config(&path),
    }
}

#[cfg(feature = "tracing")]
fn init_logging(level: LevelFilter, json: bool) -> CliResult<()> {
    // A second install is ignored.
    let _ = LogTracer::init();
    tagplace::core::init_tracing_with_level(level, json);
    Ok(())
}

#[cfg(not(feature = "tracing"))]
fn init_logging(level: LevelFilter, json: bool) -> CliResult<()> {
    if json {
        eprintln!("--json-logs needs the `tracing` feature; using plain logs");
    }
    tagplace::core::init_with_level(level)?;
    Ok(())
}

fn run_replay_cmd(args: &ReplayArgs) -> CliResult<()> {
    let options = ReplayOptions {
        mode: args.mode.map(PlacementMode::from),
        zone: args.zone,
        ..ReplayOptions::default()
    };
    let report = run_replay_files(&args.config, &args.session, &options)?;

    match &args.out {
        Some(path) => {
            report.write_json(path)?;
            println!("wrote report JSON to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn run_check_config(path: &Path) -> CliResult<()> {
    let config = PipelineConfig::load_json(path)?;
    config.validate()?;
    println!(
        "config ok: {} bindings, initial mode {:?}, marker size {} m",
        config.bindings.len(),
        config.initial_mode,
        config.marker_size_m
    );
    for binding in &config.bindings {
        println!("  marker {} -> {}", binding.marker_id, binding.entity);
    }
    Ok(())
}
