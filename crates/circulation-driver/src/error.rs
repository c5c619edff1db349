//! Driver error types.
//!
//! Errors split into two camps: the simulator misbehaved (it answered
//! illegally, fell silent, or died), or the harness could not do its job
//! (bad configuration, unwritable transcript, unlaunchable program). Only the
//! first camp says anything about the simulator.

use std::{io, path::PathBuf, time::Duration};

use circulation_harness::{ConfigError, ReplayError, Violation};
use circulation_model::ModelError;

/// Errors that end a run.
#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    /// Invalid run parameters
    #[error("configuration error: {0}")]
    Config(String),

    /// Simulator could not be started
    #[error("cannot launch {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Writing to the simulator failed, usually because it exited
    #[error("cannot write to simulator: {0}")]
    Write(#[source] io::Error),

    /// No output line arrived in time
    #[error("simulator timed out after {waited:?} waiting for a line")]
    Timeout {
        /// How long the driver waited
        waited: Duration,
    },

    /// Simulator exited while output was still expected
    #[error("simulator exited unexpectedly ({status})")]
    Exited {
        /// Exit status as reported by the OS
        status: String,
    },

    /// First line of a response could not be framed
    #[error("malformed response header for `{command}`: {line:?}")]
    MalformedHeader {
        /// Command being answered
        command: String,
        /// Offending line
        line: String,
    },

    /// Simulator answered illegally
    #[error("{0}")]
    Violation(Box<Violation>),

    /// Transcript file could not be written or read
    #[error("transcript {path}: {source}")]
    Transcript {
        /// File involved
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Generated inventory rejected by the model
    #[error("inventory: {0}")]
    Inventory(#[from] ModelError),

    /// Recorded transcript did not check out
    #[error("replay: {0}")]
    Replay(#[from] ReplayError),
}

impl DriverError {
    /// Invalid run parameters.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Simulator stopped answering, by silence or by exiting.
    pub fn is_unresponsive(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Exited { .. } | Self::Write(_))
    }

    /// Simulator answered, but wrongly.
    pub fn is_violation(&self) -> bool {
        matches!(self, Self::Violation(_) | Self::MalformedHeader { .. })
            || matches!(self, Self::Replay(e) if e.is_violation())
    }

    /// The failure says something about the simulator rather than the
    /// harness.
    pub fn blames_simulator(&self) -> bool {
        self.is_unresponsive() || self.is_violation()
    }
}

impl From<ConfigError> for DriverError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<Violation> for DriverError {
    fn from(violation: Violation) -> Self {
        Self::Violation(Box::new(violation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let timeout = DriverError::Timeout { waited: Duration::from_secs(1) };
        assert!(timeout.is_unresponsive());
        assert!(timeout.blames_simulator());

        let config = DriverError::Config("bad".into());
        assert!(config.is_config());
        assert!(!config.blames_simulator());

        let header = DriverError::MalformedHeader { command: "[2025-01-01] OPEN".into(), line: "x".into() };
        assert!(header.is_violation());
    }
}
