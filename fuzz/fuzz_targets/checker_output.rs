//! Fuzz target for the checker
//!
//! A fixed one-day script is answered with arbitrary simulator output. The
//! checker must turn any answer into a verdict.
//!
//! # Invariants
//!
//! - NEVER panic, whatever the simulator prints
//! - A rejected batch leaves the model untouched

#![no_main]

use arbitrary::Arbitrary;
use circulation_harness::Checker;
use circulation_model::LibrarySystem;
use circulation_proto::Command;
use libfuzzer_sys::fuzz_target;

const SCRIPT: &[&str] = &[
    "[2025-01-01] OPEN",
    "[2025-01-01] 23370001 borrowed B-0001",
    "[2025-01-01] 23370002 ordered C-0001",
    "[2025-01-01] 23370003 read A-0001",
    "[2025-01-01] 23370001 queried B-0001-01",
    "[2025-01-01] 23370002 queried credit score",
    "[2025-01-01] CLOSE",
    "[2025-01-02] OPEN",
    "[2025-01-02] 23370002 picked C-0001",
    "[2025-01-02] 23370003 restored A-0001-01",
];

#[derive(Debug, Arbitrary)]
struct Input {
    /// How many script commands form the batch.
    commands: u8,
    /// Simulator output.
    output: Vec<String>,
}

fuzz_target!(|input: Input| {
    let mut library = LibrarySystem::default();
    library.initialize(["A-0001 1", "B-0001 2", "C-0001 1"]).expect("inventory");
    let before = format!("{library:?}");

    let take = usize::from(input.commands) % (SCRIPT.len() + 1);
    let commands: Vec<Command> =
        SCRIPT[..take].iter().map(|line| line.parse().expect("script parses")).collect();

    if Checker::new().check_batch(&mut library, &commands, &input.output).is_err() {
        assert_eq!(format!("{library:?}"), before);
    }
});
