//! Process driver for library circulation simulators.
//!
//! Launches a simulator as a child process, feeds it a generated campaign
//! over stdin and judges every answer it prints. See [`Runner`] for a single
//! run and [`run_rounds`] for many seeds in parallel.

mod config;
mod error;
mod process;
mod runner;
mod transcript;

pub use config::{DriverConfig, ProcessConfig, SutCommand, TranscriptPaths};
pub use error::DriverError;
pub use process::SutProcess;
pub use runner::{RunOutcome, RunStatus, Runner, run_rounds};
pub use transcript::{Transcript, read_log};
