//! Model errors.
//!
//! Mutators fail only when asked to perform a transition the current state
//! cannot support. Callers validate eligibility first, so any of these
//! surfacing at runtime points at a bookkeeping bug rather than a bad SUT.

use thiserror::Error;

use crate::types::{CopyId, Isbn, Location, StudentId};

/// Errors raised by the library model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Inventory line is not `<ISBN> <count>`
    #[error("malformed inventory line: {line:?}")]
    InvalidInventoryLine {
        /// Offending line
        line: String,
    },

    /// ISBN does not start with a known book class
    #[error("unknown book type in ISBN {isbn}")]
    UnknownBookType {
        /// Offending ISBN
        isbn: Isbn,
    },

    /// ISBN listed twice in the inventory
    #[error("ISBN {isbn} listed more than once")]
    DuplicateIsbn {
        /// Offending ISBN
        isbn: Isbn,
    },

    /// Copy id not in the inventory
    #[error("unknown copy {copy}")]
    UnknownCopy {
        /// Offending copy id
        copy: CopyId,
    },

    /// Copy is not where the transition requires it to be
    #[error("cannot {action} copy {copy}: it is at {actual}")]
    WrongLocation {
        /// Copy being moved
        copy: CopyId,
        /// Where it actually is
        actual: Location,
        /// Attempted transition
        action: &'static str,
    },

    /// Copy is not held by the student
    #[error("copy {copy} is not held by {student}")]
    NotHeld {
        /// Copy id
        copy: CopyId,
        /// Student expected to hold it
        student: StudentId,
    },

    /// Type A copies are never lent
    #[error("copy {copy} is reference-only and cannot be lent")]
    NotLendable {
        /// Copy id
        copy: CopyId,
    },

    /// The library cannot move copies there on its own
    #[error("{location} is not a library-internal location")]
    NotTidyLocation {
        /// Requested destination
        location: Location,
    },

    /// A dated transition was requested before the clock started
    #[error("library clock not started")]
    ClockNotStarted,
}

impl ModelError {
    /// Whether the error comes from the inventory handshake rather than a
    /// later transition.
    pub fn is_inventory(&self) -> bool {
        matches!(
            self,
            Self::InvalidInventoryLine { .. } | Self::UnknownBookType { .. } | Self::DuplicateIsbn { .. }
        )
    }
}
