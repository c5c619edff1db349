//! Harness error types.

use circulation_model::ModelError;
use circulation_proto::ProtocolError;

use crate::checker::Violation;

/// Invalid generation parameters.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Probability outside `[0, 1]`
    #[error("{name} must be within [0, 1], got {value}")]
    Probability {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// Negative or non-finite selection weight
    #[error("{name} must be a non-negative number, got {value}")]
    NegativeWeight {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// Lower bound above upper bound
    #[error("{name}: minimum {min} exceeds maximum {max}")]
    EmptyRange {
        /// Parameter name
        name: &'static str,
        /// Lower bound
        min: u64,
        /// Upper bound
        max: u64,
    },

    /// Student pool empty or wider than four digits
    #[error("student pool must hold 1..=9999 ids, got {size}")]
    StudentPool {
        /// Requested size
        size: u32,
    },

    /// Title count zero or beyond the ISBN space
    #[error("title count must be within 1..=30000, got {titles}")]
    TitleCount {
        /// Requested count
        titles: usize,
    },
}

/// Failure to check a recorded transcript.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// Input log does not start with a valid inventory handshake
    #[error("handshake: {0}")]
    Handshake(#[source] ProtocolError),

    /// Handshake names an invalid inventory
    #[error("inventory: {0}")]
    Inventory(#[source] ModelError),

    /// Input log holds a line that is not a command
    #[error("input line {line_no}: {source}")]
    Command {
        /// 1-based line number in the input log
        line_no: usize,
        /// Decoding failure
        source: ProtocolError,
    },

    /// Output log is inconsistent with the commands
    #[error("{0}")]
    Violation(Box<Violation>),
}

impl ReplayError {
    /// Whether the simulator's output, rather than the input log, is at fault.
    pub fn is_violation(&self) -> bool {
        matches!(self, Self::Violation(_))
    }
}

impl From<Violation> for ReplayError {
    fn from(violation: Violation) -> Self {
        Self::Violation(Box::new(violation))
    }
}
