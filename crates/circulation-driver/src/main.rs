//! Circulation driver binary.
//!
//! # Usage
//!
//! ```bash
//! # Fifty cycles against a simulator, seed picked at random
//! circulation-driver run ./my-simulator -- --flag
//!
//! # Eight seeds, four at a time, keeping transcripts
//! circulation-driver run --seed 7 --rounds 8 --parallel 4 \
//!     --input-log in.log --output-log out.log ./my-simulator
//!
//! # Re-check a recorded transcript
//! circulation-driver check --input-log in.log --output-log out.log
//! ```
//!
//! Each verdict is printed to stdout as one JSON object per line. The exit
//! status is zero only when every run passed.

use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use chrono::NaiveDate;
use circulation_driver::{
    DriverConfig, DriverError, RunOutcome, SutCommand, TranscriptPaths, read_log, run_rounds,
};
use circulation_harness::check_transcript;
use circulation_model::LibraryRules;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Conformance driver for library circulation simulators
#[derive(Parser, Debug)]
#[command(name = "circulation-driver")]
#[command(about = "Drive a library circulation simulator and check its answers")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run generated campaigns against a simulator
    Run(RunArgs),
    /// Check a recorded transcript offline
    Check(CheckArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Seed of the first round (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of rounds, each with the next seed
    #[arg(long, default_value = "1")]
    rounds: usize,

    /// Rounds running at the same time
    #[arg(long, default_value = "1")]
    parallel: usize,

    /// Date of the first OPEN (YYYY-MM-DD)
    #[arg(long, default_value = "2025-01-01", value_parser = parse_date)]
    start_date: NaiveDate,

    /// Open/close cycles per round
    #[arg(long, default_value = "50")]
    max_cycles: usize,

    /// Commands per round
    #[arg(long, default_value = "5000")]
    max_commands: usize,

    /// Titles in the inventory
    #[arg(long, default_value = "5")]
    titles: usize,

    /// Fewest copies per title
    #[arg(long, default_value = "1")]
    min_copies: u32,

    /// Most copies per title
    #[arg(long, default_value = "10")]
    max_copies: u32,

    /// Fewest requests per day batch
    #[arg(long, default_value = "1")]
    min_requests: usize,

    /// Most requests per day batch
    #[arg(long, default_value = "5")]
    max_requests: usize,

    /// Probability that a request comes from a new student
    #[arg(long, default_value = "0.2")]
    new_student_ratio: f64,

    /// Leave out credit queries and credit-based rejections
    #[arg(long)]
    no_credit: bool,

    /// Milliseconds to wait for each output line
    #[arg(long, default_value = "5000")]
    line_timeout_ms: u64,

    /// Milliseconds the simulator gets to exit after end of input
    #[arg(long, default_value = "1000")]
    shutdown_grace_ms: u64,

    /// Record every line sent to the simulator
    #[arg(long)]
    input_log: Option<PathBuf>,

    /// Record every line the simulator printed
    #[arg(long)]
    output_log: Option<PathBuf>,

    /// Simulator program
    program: PathBuf,

    /// Simulator arguments, after `--`
    #[arg(last = true)]
    args: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct CheckArgs {
    /// Recorded input log
    #[arg(long)]
    input_log: PathBuf,

    /// Recorded output log
    #[arg(long)]
    output_log: PathBuf,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("{s}: {e}"))
}

impl RunArgs {
    fn config(&self) -> DriverConfig {
        let mut config = DriverConfig {
            seed: self.seed.unwrap_or_else(rand::random),
            start_date: self.start_date,
            max_cycles: self.max_cycles,
            max_total_commands: self.max_commands,
            transcripts: TranscriptPaths {
                input: self.input_log.clone(),
                output: self.output_log.clone(),
            },
            ..Default::default()
        };
        config.inventory.titles = self.titles;
        config.inventory.min_copies = self.min_copies;
        config.inventory.max_copies = self.max_copies;
        config.cycle.min_requests = self.min_requests;
        config.cycle.max_requests = self.max_requests;
        config.generator.new_student_ratio = self.new_student_ratio;
        if self.no_credit {
            config.generator.weights.credit_query = 0;
            config.generator.weights.failed_by_credit = 0;
        }
        config.process.line_timeout = Duration::from_millis(self.line_timeout_ms);
        config.process.shutdown_grace = Duration::from_millis(self.shutdown_grace_ms);
        config
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let passed = match args.command {
        Mode::Run(run) => {
            let config = run.config();
            let sut = SutCommand::new(&run.program).with_args(run.args.iter().cloned());
            tracing::info!(program = %run.program.display(), seed = config.seed, rounds = run.rounds, "starting");

            let outcomes = run_rounds(sut, config, run.rounds, run.parallel).await;
            report(&outcomes)?;
            outcomes.len() == run.rounds && outcomes.iter().all(RunOutcome::is_success)
        },
        Mode::Check(check) => {
            let verdict = replay(&check).await;
            let json = match &verdict {
                Ok(()) => serde_json::json!({ "status": "success" }),
                Err(e) => serde_json::json!({ "status": "failure", "reason": e.to_string() }),
            };
            writeln!(io::stdout().lock(), "{json}")?;
            verdict.is_ok()
        },
    };

    Ok(if passed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn report(outcomes: &[RunOutcome]) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout().lock();
    for outcome in outcomes {
        writeln!(stdout, "{}", serde_json::to_string(outcome)?)?;
    }
    Ok(())
}

async fn replay(check: &CheckArgs) -> Result<(), DriverError> {
    let input = read_log(&check.input_log).await?;
    let output = read_log(&check.output_log).await?;
    check_transcript(&input[..], &output, LibraryRules::default())?;
    Ok(())
}
