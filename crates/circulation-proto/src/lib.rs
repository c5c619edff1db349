//! Line protocol spoken with library circulation simulators.
//!
//! Everything is newline-terminated UTF-8 text. The harness sends an
//! [`Inventory`] handshake, then one [`Command`] per line; the simulator
//! answers each command with one or more lines framed by [`ResponseShape`].

mod command;
mod date;
mod error;
mod framing;
mod inventory;
mod response;

pub use command::{Command, Request, Verb};
pub use date::{Bracketed, parse_bracketed};
pub use error::{LineKind, ProtocolError};
pub use framing::{FrameError, ResponseShape, split_frames};
pub use inventory::Inventory;
pub use response::{CreditLine, Status, TidyMove, TraceEntry, TraceHeader, UserOpLine, parse_count};
