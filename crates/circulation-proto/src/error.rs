//! Protocol errors.

use std::fmt;

use thiserror::Error;

/// Kind of response line being decoded, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Outcome of a user request.
    UserOp,
    /// Credit query answer.
    Credit,
    /// First line of a trace query answer.
    TraceHeader,
    /// One move of a trace query answer.
    TraceEntry,
    /// First line of an OPEN/CLOSE answer.
    TidyCount,
    /// One relocation of an OPEN/CLOSE answer.
    TidyMove,
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UserOp => "user operation",
            Self::Credit => "credit query",
            Self::TraceHeader => "trace header",
            Self::TraceEntry => "trace entry",
            Self::TidyCount => "tidy count",
            Self::TidyMove => "tidy move",
        })
    }
}

/// Errors decoding or encoding protocol lines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Command line does not follow the command grammar
    #[error("malformed command: {line:?}")]
    MalformedCommand {
        /// Offending line
        line: String,
    },

    /// Response line does not follow the grammar for its kind
    #[error("malformed {kind} line ({reason}): {line:?}")]
    MalformedLine {
        /// Expected kind of line
        kind: LineKind,
        /// What is wrong with it
        reason: &'static str,
        /// Offending line
        line: String,
    },

    /// Date token is not `[YYYY-MM-DD]`
    #[error("invalid date token {token:?}")]
    InvalidDate {
        /// Offending token
        token: String,
    },

    /// Line count header is not a non-negative integer
    #[error("invalid line count {line:?}")]
    InvalidCount {
        /// Offending line
        line: String,
    },

    /// Inventory handshake is inconsistent
    #[error("malformed inventory: {reason}")]
    MalformedInventory {
        /// What is wrong with it
        reason: String,
    },
}

impl ProtocolError {
    /// Whether the error concerns message framing rather than line content.
    pub fn is_framing(&self) -> bool {
        matches!(self, Self::InvalidCount { .. })
    }

    pub(crate) fn line(kind: LineKind, reason: &'static str, line: &str) -> Self {
        Self::MalformedLine { kind, reason, line: line.to_owned() }
    }
}
