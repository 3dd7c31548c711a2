use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use cogex_experiment::{
    participant_rng, session_rng, ExperimentConfig, Session, SessionSummary, SimulatedDisplay,
    SimulatedParticipant,
};
use cogex_record::TrialLogger;
use cogex_timing::{HighPrecisionTimer, VirtualClock};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};
use uuid::Uuid;

mod bootstrap;
mod console;

use bootstrap::{Manifest, Overrides};
use console::{ConsoleDisplay, RawMode, TerminalInput};

/// Working-memory and relational pattern-completion session.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Participant id; a random UUID when omitted
    #[arg(short, long)]
    participant: Option<String>,

    /// Seed of the session's random stream; derived from the clock when omitted
    #[arg(short, long)]
    seed: Option<u64>,

    /// Root directory for per-session run directories
    #[arg(short, long, default_value = "data")]
    output_dir: PathBuf,

    /// JSON file overriding the default design and timing
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of relational runs
    #[arg(long)]
    runs: Option<usize>,

    /// Accept a trial order that still breaks the order constraints
    #[arg(long)]
    best_effort: bool,

    /// Run headless with a virtual clock and a simulated participant
    #[arg(long)]
    simulate: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            runs: self.runs,
            best_effort: self.best_effort,
        }
    }
}

/// Level of the stderr layer. A live run draws on the same terminal, so
/// diagnostics go to the log file only.
fn stderr_filter(simulate: bool) -> LevelFilter {
    if simulate {
        LevelFilter::TRACE
    } else {
        LevelFilter::OFF
    }
}

/// Diagnostics go to `<participant>.log` in the run directory, and also to
/// stderr when simulating.
fn init_tracing(log_path: &Path, simulate: bool) -> Result<()> {
    let file = File::create(log_path)
        .with_context(|| format!("cannot create {}", log_path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(stderr_filter(simulate)),
        )
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()?;
    Ok(())
}

fn run_simulated(
    participant: &str,
    seed: u64,
    config: ExperimentConfig,
    logger: TrialLogger,
) -> Result<SessionSummary> {
    let clock = VirtualClock::new();
    let session = Session::new(
        participant,
        config,
        clock.clone(),
        session_rng(seed),
        SimulatedDisplay::new(clock.clone()),
        SimulatedParticipant::new(clock, participant_rng(seed)),
        logger,
    )?;
    Ok(session.run()?)
}

fn run_console(
    participant: &str,
    seed: u64,
    config: ExperimentConfig,
    logger: TrialLogger,
) -> Result<SessionSummary> {
    let raw = RawMode::enable().context("cannot configure the terminal")?;
    if raw.is_none() {
        eprintln!("stdin is not a terminal; key presses need Enter");
        warn!("stdin is not a terminal");
    }
    let timer = HighPrecisionTimer::new();
    let session = Session::new(
        participant,
        config,
        timer.clone(),
        session_rng(seed),
        ConsoleDisplay::new(timer.clone()),
        TerminalInput::new(timer),
        logger,
    )?;
    let summary = session.run()?;
    drop(raw);
    Ok(summary)
}

fn print_summary(summary: &SessionSummary, data_path: &Path) {
    println!();
    if summary.aborted {
        println!("Session aborted after {} trials.", summary.trials);
    } else {
        println!("Session complete: {} trials.", summary.trials);
    }
    println!(
        "  responses {}  timeouts {}  errors {}",
        summary.responses, summary.timeouts, summary.errors
    );
    println!("  accuracy {:.1}%", summary.accuracy() * 100.0);
    if let Some(rt) = summary.mean_rt() {
        println!("  mean RT {:.3} s", rt);
    }
    println!("Data saved to {}", data_path.display());
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let started = Local::now();

    let participant = cli
        .participant
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    bootstrap::check_participant_id(&participant)?;
    let seed = cli
        .seed
        .unwrap_or_else(|| bootstrap::default_seed(Utc::now()));
    let config = bootstrap::load_config(cli.config.as_deref(), &cli.overrides())?;

    let run_dir = bootstrap::create_run_dir(&cli.output_dir, &started)?;
    init_tracing(&run_dir.join(format!("{participant}.log")), cli.simulate)?;

    let data_name = format!("{participant}.jsonl");
    let data_path = run_dir.join(&data_name);
    let manifest = Manifest {
        participant_id: &participant,
        seed,
        started_at: started.to_rfc3339(),
        simulated: cli.simulate,
        data_file: data_name,
        version: env!("CARGO_PKG_VERSION"),
        config: &config,
    };
    let manifest_path = bootstrap::write_manifest(&run_dir, &manifest)?;
    info!(
        participant = %participant,
        seed,
        simulated = cli.simulate,
        platform = std::env::consts::OS,
        run_dir = %run_dir.display(),
        manifest = %manifest_path.display(),
        "session starting"
    );

    let logger = TrialLogger::open(&data_path)?;
    let summary = if cli.simulate {
        run_simulated(&participant, seed, config, logger)?
    } else {
        run_console(&participant, seed, config, logger)?
    };
    print_summary(&summary, &data_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_are_required() {
        let cli = Cli::try_parse_from(["relational-session"]).unwrap();
        assert_eq!(cli.output_dir, PathBuf::from("data"));
        assert!(cli.participant.is_none() && cli.seed.is_none());
        assert!(!cli.simulate && !cli.best_effort);
    }

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "relational-session",
            "--seed",
            "42",
            "--runs",
            "2",
            "--best-effort",
            "--simulate",
        ])
        .unwrap();
        assert_eq!(cli.seed, Some(42));
        let overrides = cli.overrides();
        assert_eq!(overrides.runs, Some(2));
        assert!(overrides.best_effort);
    }

    #[test]
    fn live_runs_keep_diagnostics_off_the_terminal() {
        assert_eq!(stderr_filter(false), LevelFilter::OFF);
        assert_eq!(stderr_filter(true), LevelFilter::TRACE);
    }

    #[test]
    fn simulated_run_writes_every_trial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.jsonl");
        let logger = TrialLogger::open(&path).unwrap();
        let summary = run_simulated("p", 9, ExperimentConfig::default(), logger).unwrap();
        assert_eq!(summary.trials, 144);
        assert_eq!(cogex_record::read_log(&path).unwrap().rows.len(), 144);
    }
}
