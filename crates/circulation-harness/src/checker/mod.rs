//! Response checking.
//!
//! The checker walks a batch of commands and the simulator's output in
//! lock-step. For each command it advances the model clock, frames the
//! response with the same rule the driver uses, decodes it, compares it to
//! what the model allows and finally applies the accepted effect. The batch
//! is judged on a scratch copy of the model which replaces the caller's only
//! when every response was consistent.

mod queries;
mod tidy;
mod user_ops;

use std::fmt;

use circulation_model::{LibrarySystem, ModelError};
use circulation_proto::{Command, ProtocolError, Request, split_frames};
use tracing::debug;

use crate::invariants::InvariantRegistry;

/// Outcome of checking one batch.
pub type Verdict = Result<(), Violation>;

/// Category of an inconsistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// Output ended early or a count line could not be decoded.
    Framing,
    /// A line does not follow the response grammar.
    Format,
    /// A line does not echo the command or disagrees with the model's
    /// prediction.
    Mismatch,
    /// The simulator granted, refused or moved something the rules forbid.
    Illegal,
    /// Output continued after the last response.
    Extraneous,
    /// The model itself ended up inconsistent.
    Internal,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Framing => "framing",
            Self::Format => "format",
            Self::Mismatch => "mismatch",
            Self::Illegal => "illegal",
            Self::Extraneous => "extraneous output",
            Self::Internal => "internal",
        })
    }
}

/// First inconsistency found in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Category.
    pub kind: ViolationKind,
    /// Expected versus actual, in words.
    pub message: String,
    /// Command whose response is at fault.
    pub command: Option<String>,
    /// Offending output line.
    pub line: Option<String>,
}

impl Violation {
    pub(crate) fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), command: None, line: None }
    }

    pub(crate) fn format(error: &ProtocolError) -> Self {
        Self::new(ViolationKind::Format, error.to_string())
    }

    pub(crate) fn mismatch(message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Mismatch, message)
    }

    pub(crate) fn illegal(message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Illegal, message)
    }

    pub(crate) fn internal(error: &ModelError) -> Self {
        Self::new(ViolationKind::Internal, error.to_string())
    }

    pub(crate) fn at_line(mut self, line: &str) -> Self {
        self.line.get_or_insert_with(|| line.to_owned());
        self
    }

    fn for_command(mut self, command: &Command) -> Self {
        self.command.get_or_insert_with(|| command.to_string());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(command) = &self.command {
            write!(f, "\n  command: {command}")?;
        }
        if let Some(line) = &self.line {
            write!(f, "\n  output:  {line}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Violation {}

/// Judges simulator output against the library model.
pub struct Checker {
    invariants: InvariantRegistry,
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker {
    /// Checker that also verifies the standard model invariants after every
    /// batch.
    pub fn new() -> Self {
        Self { invariants: InvariantRegistry::standard() }
    }

    /// Checker with a custom invariant set.
    pub fn with_invariants(invariants: InvariantRegistry) -> Self {
        Self { invariants }
    }

    /// Check `output` as the simulator's answer to `commands`.
    ///
    /// On success `library` is advanced past the batch. On failure it is
    /// left untouched.
    pub fn check_batch(
        &self,
        library: &mut LibrarySystem,
        commands: &[Command],
        output: &[String],
    ) -> Verdict {
        let (frames, leftover) =
            split_frames(commands.iter().map(Command::shape), output).map_err(|e| {
                let violation = Violation::new(ViolationKind::Framing, e.to_string());
                match commands.get(e.index()) {
                    Some(command) => violation.for_command(command),
                    None => violation,
                }
            })?;
        if leftover > 0 {
            return Err(Violation::new(
                ViolationKind::Extraneous,
                format!("{leftover} lines after the last response"),
            )
            .at_line(&output[output.len() - leftover]));
        }

        let mut scratch = library.clone();
        for (command, frame) in commands.iter().zip(frames) {
            scratch.advance_time_to(command.date);
            judge(&mut scratch, command, frame).map_err(|v| v.for_command(command))?;
        }

        if let Err(violations) = self.invariants.check_all(&scratch) {
            let messages: Vec<String> = violations.iter().map(ToString::to_string).collect();
            return Err(Violation::new(ViolationKind::Internal, messages.join("; ")));
        }

        debug!(commands = commands.len(), lines = output.len(), "batch consistent");
        *library = scratch;
        Ok(())
    }
}

/// Check one framed response and apply its effect.
fn judge(library: &mut LibrarySystem, command: &Command, frame: &[String]) -> Verdict {
    let date = command.date;
    match &command.request {
        Request::Open => {
            library.apply_open(date);
            tidy::check(library, date, frame, tidy::Phase::Open)
        },
        Request::Close => {
            library.apply_close(date);
            tidy::check(library, date, frame, tidy::Phase::Close)
        },
        Request::QueryCredit { student } => queries::credit(library, date, student, frame),
        Request::QueryTrace { copy, .. } => queries::trace(library, date, copy, frame),
        request => user_ops::check(library, date, request, frame),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, n).unwrap()
    }

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    fn commands(raw: &[&str]) -> Vec<Command> {
        raw.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn library() -> LibrarySystem {
        let mut library = LibrarySystem::default();
        library.initialize(["A-0001 1", "B-0001 2", "C-0001 1"]).unwrap();
        library
    }

    fn opened() -> LibrarySystem {
        let mut library = library();
        Checker::new()
            .check_batch(&mut library, &commands(&["[2025-01-01] OPEN"]), &lines(&["0"]))
            .unwrap();
        library
    }

    #[test]
    fn accepts_consistent_day() {
        let mut library = opened();
        let batch = commands(&[
            "[2025-01-01] 23370001 borrowed B-0001",
            "[2025-01-01] 23370001 queried B-0001-01",
            "[2025-01-01] 23370002 read A-0001",
            "[2025-01-01] 23370002 restored A-0001-01",
            "[2025-01-01] 23370002 queried credit score",
            "[2025-01-01] CLOSE",
        ]);
        let output = lines(&[
            "[2025-01-01] [accept] 23370001 borrowed B-0001-01",
            "[2025-01-01] B-0001-01 moving trace: 1",
            "1 [2025-01-01] from bs to user",
            "[2025-01-01] [accept] 23370002 read A-0001-01",
            "[2025-01-01] [accept] 23370002 restored A-0001-01",
            "[2025-01-01] 23370002 110",
            "0",
        ]);
        assert_eq!(Checker::new().check_batch(&mut library, &batch, &output), Ok(()));
        assert_eq!(library.copy("B-0001-01").unwrap().holder(), Some("23370001"));
        assert_eq!(library.credit_of("23370002"), 110);
    }

    #[test]
    fn illegal_acceptance_leaves_model_untouched() {
        let mut library = opened();
        let before = library.clone();
        let batch = commands(&[
            "[2025-01-01] 23370001 borrowed B-0001",
            "[2025-01-01] 23370001 borrowed B-0001",
        ]);
        let output = lines(&[
            "[2025-01-01] [accept] 23370001 borrowed B-0001-01",
            "[2025-01-01] [accept] 23370001 borrowed B-0001-02",
        ]);

        let violation = Checker::new().check_batch(&mut library, &batch, &output).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::Illegal);
        assert_eq!(violation.command.as_deref(), Some("[2025-01-01] 23370001 borrowed B-0001"));
        assert_eq!(library.copy("B-0001-01").unwrap().location(), before.copy("B-0001-01").unwrap().location());
        assert!(library.student("23370001").is_none());
    }

    #[test]
    fn wrongful_rejection_is_illegal() {
        let mut library = opened();
        let batch = commands(&["[2025-01-01] 23370001 borrowed B-0001"]);
        let output = lines(&["[2025-01-01] [reject] 23370001 borrowed B-0001"]);
        let violation = Checker::new().check_batch(&mut library, &batch, &output).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::Illegal);
    }

    #[test]
    fn rightful_rejection_passes() {
        let mut library = opened();
        let batch = commands(&[
            "[2025-01-01] 23370001 borrowed A-0001",
            "[2025-01-01] 23370001 picked C-0001",
            "[2025-01-01] 23370001 returned B-0001-01",
        ]);
        let output = lines(&[
            "[2025-01-01] [reject] 23370001 borrowed A-0001",
            "[2025-01-01] [reject] 23370001 picked C-0001",
            "[2025-01-01] [reject] 23370001 returned B-0001-01 not overdue",
        ]);
        let violation = Checker::new().check_batch(&mut library, &batch, &output).unwrap_err();
        // returns are never refused
        assert_eq!(violation.kind, ViolationKind::Illegal);
        assert_eq!(violation.command.as_deref(), Some("[2025-01-01] 23370001 returned B-0001-01"));

        assert_eq!(Checker::new().check_batch(&mut library, &batch[..2], &output[..2]), Ok(()));
    }

    #[test]
    fn framing_errors() {
        let mut library = opened();
        let batch = commands(&["[2025-01-02] OPEN"]);

        let violation = Checker::new().check_batch(&mut library, &batch, &lines(&["two"])).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::Framing);

        let violation = Checker::new().check_batch(&mut library, &batch, &lines(&["1"])).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::Framing);

        let violation = Checker::new().check_batch(&mut library, &batch, &[]).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::Framing);

        let violation =
            Checker::new().check_batch(&mut library, &batch, &lines(&["0", "surplus"])).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::Extraneous);
        assert_eq!(violation.line.as_deref(), Some("surplus"));
    }

    #[test]
    fn echo_must_match_command() {
        let mut library = opened();
        let batch = commands(&["[2025-01-01] 23370001 ordered B-0001"]);
        for bad in [
            "[2025-01-02] [accept] 23370001 ordered B-0001",
            "[2025-01-01] [accept] 23370009 ordered B-0001",
            "[2025-01-01] [accept] 23370001 borrowed B-0001",
            "[2025-01-01] [accept] 23370001 ordered B-0002",
        ] {
            let violation =
                Checker::new().check_batch(&mut library, &batch, &lines(&[bad])).unwrap_err();
            assert_eq!(violation.kind, ViolationKind::Mismatch, "{bad}");
        }
    }

    #[test]
    fn credit_query_reflects_overdue_penalties() {
        let mut library = opened();
        Checker::new()
            .check_batch(
                &mut library,
                &commands(&["[2025-01-01] 23370001 borrowed B-0001"]),
                &lines(&["[2025-01-01] [accept] 23370001 borrowed B-0001-01"]),
            )
            .unwrap();

        let query = commands(&["[2025-02-02] 23370001 queried credit score"]);
        let stale = lines(&["[2025-02-02] 23370001 100"]);
        let violation = Checker::new().check_batch(&mut library, &query, &stale).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::Mismatch);

        let fresh = lines(&["[2025-02-02] 23370001 85"]);
        assert_eq!(Checker::new().check_batch(&mut library, &query, &fresh), Ok(()));
        assert_eq!(library.today(), Some(day(1) + chrono::Duration::days(32)));
    }

    #[test]
    fn low_credit_read_of_type_a_is_illegal() {
        let mut library = opened();
        Checker::new()
            .check_batch(
                &mut library,
                &commands(&["[2025-01-01] 23370001 borrowed B-0001"]),
                &lines(&["[2025-01-01] [accept] 23370001 borrowed B-0001-01"]),
            )
            .unwrap();

        // thirteen overdue days, due date included, bring 100 down to 35
        let query = commands(&["[2025-02-12] 23370001 queried credit score"]);
        Checker::new().check_batch(&mut library, &query, &lines(&["[2025-02-12] 23370001 35"])).unwrap();

        let read = commands(&["[2025-02-12] 23370001 read A-0001"]);
        let before = library.clone();
        let violation = Checker::new()
            .check_batch(&mut library, &read, &lines(&["[2025-02-12] [accept] 23370001 read A-0001-01"]))
            .unwrap_err();
        assert_eq!(violation.kind, ViolationKind::Illegal);
        assert_eq!(library.copy("A-0001-01").unwrap().location(), before.copy("A-0001-01").unwrap().location());

        let refused = lines(&["[2025-02-12] [reject] 23370001 read A-0001"]);
        assert_eq!(Checker::new().check_batch(&mut library, &read, &refused), Ok(()));
    }

    #[test]
    fn pickup_on_deadline_day_is_granted_without_penalty() {
        let mut library = opened();
        Checker::new()
            .check_batch(
                &mut library,
                &commands(&["[2025-01-01] 23370001 ordered C-0001", "[2025-01-01] CLOSE"]),
                &lines(&["[2025-01-01] [accept] 23370001 ordered C-0001", "0"]),
            )
            .unwrap();

        // set aside at the second day's OPEN, so the last pickup day is the sixth
        Checker::new()
            .check_batch(
                &mut library,
                &commands(&["[2025-01-02] OPEN", "[2025-01-02] CLOSE"]),
                &lines(&["1", "[2025-01-02] move C-0001-01 from bs to ao for 23370001", "0"]),
            )
            .unwrap();
        let deadline = library.copy("C-0001-01").unwrap().reservation().unwrap().deadline;
        assert_eq!(deadline, day(6));

        let batch = commands(&[
            "[2025-01-06] OPEN",
            "[2025-01-06] 23370001 picked C-0001",
            "[2025-01-06] 23370001 queried credit score",
        ]);
        let output = lines(&[
            "0",
            "[2025-01-06] [accept] 23370001 picked C-0001-01",
            "[2025-01-06] 23370001 100",
        ]);
        assert_eq!(Checker::new().check_batch(&mut library, &batch, &output), Ok(()));
        assert_eq!(library.copy("C-0001-01").unwrap().holder(), Some("23370001"));

        let later = commands(&["[2025-01-08] 23370001 queried credit score"]);
        let output = lines(&["[2025-01-08] 23370001 100"]);
        assert_eq!(Checker::new().check_batch(&mut library, &later, &output), Ok(()));
    }
}
