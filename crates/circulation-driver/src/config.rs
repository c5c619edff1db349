//! Driver configuration.

use std::{path::PathBuf, time::Duration};

use chrono::NaiveDate;
use circulation_harness::{CycleConfig, GeneratorConfig, InventoryConfig};
use circulation_model::LibraryRules;

use crate::error::DriverError;

/// How to launch the simulator under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SutCommand {
    /// Executable path or name resolved through `PATH`.
    pub program: PathBuf,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl SutCommand {
    /// Program without arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    /// Append arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Timing of the simulator subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessConfig {
    /// Longest wait for any single output line.
    pub line_timeout: Duration,
    /// How often liveness is re-checked while waiting.
    pub poll_interval: Duration,
    /// Time the simulator gets to exit after stdin closes.
    pub shutdown_grace: Duration,
    /// Number of recent stderr lines attached to failures.
    pub stderr_tail: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            line_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(50),
            shutdown_grace: Duration::from_secs(1),
            stderr_tail: 20,
        }
    }
}

/// Where transcripts go. Either log may be left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptPaths {
    /// Every line sent to the simulator.
    pub input: Option<PathBuf>,
    /// Every line received from the simulator.
    pub output: Option<PathBuf>,
}

impl TranscriptPaths {
    /// Paths for one of several rounds: `run.log` becomes `run.log.3`.
    #[must_use]
    pub fn for_round(&self, round: usize) -> Self {
        let suffix = |path: &PathBuf| {
            let mut name = path.clone().into_os_string();
            name.push(format!(".{round}"));
            PathBuf::from(name)
        };
        Self { input: self.input.as_ref().map(suffix), output: self.output.as_ref().map(suffix) }
    }
}

/// Everything one run needs besides the simulator itself.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Seed for inventory and command generation.
    pub seed: u64,
    /// Date of the first OPEN.
    pub start_date: NaiveDate,
    /// Stop after this many open/close cycles.
    pub max_cycles: usize,
    /// Stop once this many commands have been sent.
    pub max_total_commands: usize,

    /// Library rules the checker enforces.
    pub rules: LibraryRules,
    /// Command generation.
    pub generator: GeneratorConfig,
    /// Day scheduling.
    pub cycle: CycleConfig,
    /// Handshake inventory.
    pub inventory: InventoryConfig,

    /// Subprocess timing.
    pub process: ProcessConfig,
    /// Transcript destinations.
    pub transcripts: TranscriptPaths,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            max_cycles: 50,
            max_total_commands: 5_000,
            rules: LibraryRules::default(),
            generator: GeneratorConfig::default(),
            cycle: CycleConfig::default(),
            inventory: InventoryConfig::default(),
            process: ProcessConfig::default(),
            transcripts: TranscriptPaths::default(),
        }
    }
}

impl DriverConfig {
    /// Reject parameters no run could honour.
    pub fn validate(&self) -> Result<(), DriverError> {
        self.generator.validate()?;
        self.cycle.validate()?;
        self.inventory.validate()?;
        if self.process.line_timeout.is_zero() || self.process.poll_interval.is_zero() {
            return Err(DriverError::Config("timeouts must be positive".into()));
        }
        if self.max_cycles == 0 || self.max_total_commands == 0 {
            return Err(DriverError::Config("run limits must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(DriverConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let config = DriverConfig { max_cycles: 0, ..Default::default() };
        assert!(config.validate().unwrap_err().is_config());

        let mut config = DriverConfig::default();
        config.process.line_timeout = Duration::ZERO;
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn round_paths_get_a_suffix() {
        let paths = TranscriptPaths { input: Some("in.log".into()), output: None };
        let round = paths.for_round(2);
        assert_eq!(round.input, Some(PathBuf::from("in.log.2")));
        assert_eq!(round.output, None);
    }
}
