//! Reference simulator binary.
//!
//! Speaks the simulator side of the line protocol on stdin/stdout, answering
//! with [`ReferenceLibrary`]. Useful as a known-good target for the driver
//! and, with `--fault`, as a known-bad one.
//!
//! ```bash
//! circulation-driver run reference-sut
//! circulation-driver run reference-sut -- --fault credit
//! ```

use std::io::{self, BufRead, Write};

use circulation_harness::ReferenceLibrary;
use circulation_model::LibraryRules;
use circulation_proto::{Command, CreditLine, Inventory, Request};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Reference library circulation simulator
#[derive(Parser, Debug)]
#[command(name = "reference-sut")]
#[command(version)]
struct Args {
    /// Deliberate misbehaviour
    #[arg(long, value_enum)]
    fault: Option<Fault>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Fault {
    /// Report every credit one point too high
    Credit,
    /// Print nothing in answer to CLOSE
    SilentClose,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let stdin = io::stdin().lock();
    let mut lines = stdin.lines();

    let mut handshake = Vec::new();
    if let Some(first) = lines.next() {
        let first = first?;
        let titles: usize = first.trim().parse()?;
        handshake.push(first);
        for _ in 0..titles {
            match lines.next() {
                Some(line) => handshake.push(line?),
                None => break,
            }
        }
    }
    let (inventory, _) = Inventory::parse_handshake(&handshake[..])?;
    let mut library = ReferenceLibrary::from_inventory(LibraryRules::default(), &inventory)?;
    tracing::info!(titles = inventory.entries().len(), "inventory loaded");

    let mut stdout = io::stdout().lock();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let command: Command = line.parse()?;
        let answer = library.respond(&command)?;
        for out in tamper(args.fault, &command, answer) {
            writeln!(stdout, "{out}")?;
        }
        stdout.flush()?;
    }
    tracing::info!("end of input");
    Ok(())
}

fn tamper(fault: Option<Fault>, command: &Command, answer: Vec<String>) -> Vec<String> {
    match (fault, &command.request) {
        (Some(Fault::SilentClose), Request::Close) => Vec::new(),
        (Some(Fault::Credit), Request::QueryCredit { .. }) => answer
            .into_iter()
            .map(|line| match CreditLine::parse(&line) {
                Ok(credit) => CreditLine { credit: credit.credit + 1, ..credit }.to_string(),
                Err(_) => line,
            })
            .collect(),
        _ => answer,
    }
}
