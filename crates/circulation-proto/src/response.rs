//! Response lines printed by the simulator.
//!
//! ```text
//! [2025-01-01] [accept] 23370001 borrowed B-0001-01
//! [2025-01-01] [accept] 23370001 returned B-0001-01 not overdue
//! [2025-01-01] 23370001 110
//! [2025-01-01] B-0001-01 moving trace: 2
//! 1 [2025-01-01] from bs to user
//! [2025-01-02] move C-0002-01 from bs to ao for 23370001
//! ```
//!
//! Decoders check the grammar only. Whether a line is consistent with the
//! command that caused it is left to the caller.

use std::fmt;

use chrono::NaiveDate;
use circulation_model::{CopyId, Location, StudentId};

use crate::{
    command::Verb,
    date::{Bracketed, parse_bracketed},
    error::{LineKind, ProtocolError},
};

/// Whether a user request was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Granted.
    Accept,
    /// Refused.
    Reject,
}

impl Status {
    fn token(self) -> &'static str {
        match self {
            Self::Accept => "[accept]",
            Self::Reject => "[reject]",
        }
    }
}

/// Outcome of a user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOpLine {
    /// Echoed date.
    pub date: NaiveDate,
    /// Granted or refused.
    pub status: Status,
    /// Echoed student.
    pub student: StudentId,
    /// Echoed action.
    pub verb: Verb,
    /// Copy id handed out, or the requested ISBN when refused.
    pub target: String,
    /// For returns: whether the copy was overdue.
    pub overdue: Option<bool>,
}

impl UserOpLine {
    /// Decode a user-operation line.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let err = |reason| ProtocolError::line(LineKind::UserOp, reason, line);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 5 {
            return Err(err("too few fields"));
        }

        let date = parse_bracketed(tokens[0]).map_err(|_| err("bad date"))?;
        let status = match tokens[1] {
            "[accept]" => Status::Accept,
            "[reject]" => Status::Reject,
            _ => return Err(err("status must be [accept] or [reject]")),
        };
        let verb = Verb::parse(tokens[3]).ok_or_else(|| err("unknown action"))?;
        let overdue = match (verb, &tokens[5..]) {
            (Verb::Returned, ["overdue"]) => Some(true),
            (Verb::Returned, ["not", "overdue"]) => Some(false),
            (Verb::Returned, _) => return Err(err("return must state overdue or not overdue")),
            (_, []) => None,
            (_, _) => return Err(err("unexpected trailing fields")),
        };

        Ok(Self {
            date,
            status,
            student: tokens[2].to_owned(),
            verb,
            target: tokens[4].to_owned(),
            overdue,
        })
    }
}

impl fmt::Display for UserOpLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            Bracketed(self.date),
            self.status.token(),
            self.student,
            self.verb,
            self.target
        )?;
        match self.overdue {
            Some(true) => f.write_str(" overdue"),
            Some(false) => f.write_str(" not overdue"),
            None => Ok(()),
        }
    }
}

/// Answer to a credit query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditLine {
    /// Echoed date.
    pub date: NaiveDate,
    /// Echoed student.
    pub student: StudentId,
    /// Reported credit.
    pub credit: i64,
}

impl CreditLine {
    /// Decode a credit line.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let err = |reason| ProtocolError::line(LineKind::Credit, reason, line);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [date, student, credit] = tokens.as_slice() else {
            return Err(err("expected 3 fields"));
        };
        Ok(Self {
            date: parse_bracketed(date).map_err(|_| err("bad date"))?,
            student: (*student).to_owned(),
            credit: credit.parse().map_err(|_| err("credit is not an integer"))?,
        })
    }
}

impl fmt::Display for CreditLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", Bracketed(self.date), self.student, self.credit)
    }
}

/// First line of a trace query answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceHeader {
    /// Echoed date.
    pub date: NaiveDate,
    /// Echoed copy.
    pub copy: CopyId,
    /// Number of entries that follow.
    pub count: usize,
}

impl TraceHeader {
    /// Decode a trace header.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let err = |reason| ProtocolError::line(LineKind::TraceHeader, reason, line);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [date, copy, "moving", "trace:", count] = tokens.as_slice() else {
            return Err(err("expected `[date] <copy> moving trace: <n>`"));
        };
        Ok(Self {
            date: parse_bracketed(date).map_err(|_| err("bad date"))?,
            copy: (*copy).to_owned(),
            count: count.parse().map_err(|_| err("count is not a non-negative integer"))?,
        })
    }
}

impl fmt::Display for TraceHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} moving trace: {}", Bracketed(self.date), self.copy, self.count)
    }
}

/// One move in a trace query answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    /// 1-based position in the trace.
    pub seq: usize,
    /// Day of the move.
    pub date: NaiveDate,
    /// Origin.
    pub from: Location,
    /// Destination.
    pub to: Location,
}

impl TraceEntry {
    /// Decode a trace entry.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let err = |reason| ProtocolError::line(LineKind::TraceEntry, reason, line);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [seq, date, "from", from, "to", to] = tokens.as_slice() else {
            return Err(err("expected `<n> [date] from <loc> to <loc>`"));
        };
        Ok(Self {
            seq: seq.parse().map_err(|_| err("sequence is not an integer"))?,
            date: parse_bracketed(date).map_err(|_| err("bad date"))?,
            from: Location::from_code(from).ok_or_else(|| err("unknown origin"))?,
            to: Location::from_code(to).ok_or_else(|| err("unknown destination"))?,
        })
    }
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} from {} to {}", self.seq, Bracketed(self.date), self.from, self.to)
    }
}

/// One library-initiated relocation in an OPEN/CLOSE answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TidyMove {
    /// Day of the move.
    pub date: NaiveDate,
    /// Moved copy.
    pub copy: CopyId,
    /// Origin.
    pub from: Location,
    /// Destination.
    pub to: Location,
    /// Student the copy is set aside for; present exactly when moving to
    /// the appointment office.
    pub student: Option<StudentId>,
}

impl TidyMove {
    /// Decode a tidy move.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let err = |reason| ProtocolError::line(LineKind::TidyMove, reason, line);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (date, copy, from, to, student) = match tokens.as_slice() {
            [date, "move", copy, "from", from, "to", to] => (*date, *copy, *from, *to, None),
            [date, "move", copy, "from", from, "to", to, "for", student] => {
                (*date, *copy, *from, *to, Some((*student).to_owned()))
            },
            _ => return Err(err("expected `[date] move <copy> from <loc> to <loc> [for <student>]`")),
        };

        let location = |code: &str| {
            Location::from_code(code)
                .filter(|loc| loc.is_tidy_location())
                .ok_or_else(|| err("not a library location"))
        };
        let from = location(from)?;
        let to = location(to)?;
        match (to, &student) {
            (Location::AppointmentOffice, None) => {
                return Err(err("move to ao must name the student"));
            },
            (Location::AppointmentOffice, Some(_)) | (_, None) => {},
            (_, Some(_)) => return Err(err("only moves to ao name a student")),
        }

        Ok(Self {
            date: parse_bracketed(date).map_err(|_| err("bad date"))?,
            copy: copy.to_owned(),
            from,
            to,
            student,
        })
    }
}

impl fmt::Display for TidyMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} move {} from {} to {}", Bracketed(self.date), self.copy, self.from, self.to)?;
        match &self.student {
            Some(student) => write!(f, " for {student}"),
            None => Ok(()),
        }
    }
}

/// Decode the count line of an OPEN/CLOSE answer.
pub fn parse_count(line: &str) -> Result<usize, ProtocolError> {
    line.trim().parse().map_err(|_| ProtocolError::InvalidCount { line: line.to_owned() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()
    }

    #[test]
    fn user_op_lines() {
        let line = UserOpLine::parse("[2025-01-02] [accept] 23370001 borrowed B-0001-01").unwrap();
        assert_eq!(line.status, Status::Accept);
        assert_eq!(line.verb, Verb::Borrowed);
        assert_eq!(line.target, "B-0001-01");
        assert_eq!(line.overdue, None);

        let line =
            UserOpLine::parse("[2025-01-02] [accept] 23370001 returned B-0001-01 not overdue")
                .unwrap();
        assert_eq!(line.overdue, Some(false));
        assert_eq!(line.to_string(), "[2025-01-02] [accept] 23370001 returned B-0001-01 not overdue");

        let line = UserOpLine::parse("[2025-01-02] [accept] 23370001 returned B-0001-01 overdue")
            .unwrap();
        assert_eq!(line.overdue, Some(true));
    }

    #[test]
    fn user_op_rejects_bad_shapes() {
        for line in [
            "[2025-01-02] [accept] 23370001 borrowed",
            "[2025-01-02] [maybe] 23370001 borrowed B-0001",
            "[2025-01-02] [accept] 23370001 borrowed B-0001-01 extra",
            "[2025-01-02] [accept] 23370001 returned B-0001-01",
            "[2025-01-02] [accept] 23370001 returned B-0001-01 late",
            "2025-01-02 [accept] 23370001 borrowed B-0001",
        ] {
            assert!(UserOpLine::parse(line).is_err(), "accepted {line:?}");
        }
    }

    #[test]
    fn credit_and_trace_lines() {
        let credit = CreditLine::parse("[2025-01-02] 23370001 95").unwrap();
        assert_eq!(credit.credit, 95);
        assert!(CreditLine::parse("[2025-01-02] 23370001 lots").is_err());

        let header = TraceHeader::parse("[2025-01-02] B-0001-01 moving trace: 2").unwrap();
        assert_eq!(header.count, 2);
        assert_eq!(header.to_string(), "[2025-01-02] B-0001-01 moving trace: 2");
        assert!(TraceHeader::parse("[2025-01-02] B-0001-01 trace: 2").is_err());

        let entry = TraceEntry::parse("1 [2025-01-02] from bs to user").unwrap();
        assert_eq!(entry, TraceEntry {
            seq: 1,
            date: date(),
            from: Location::Bookshelf,
            to: Location::User,
        });
        assert!(TraceEntry::parse("1 [2025-01-02] from shelf to user").is_err());
    }

    #[test]
    fn tidy_lines() {
        let mv = TidyMove::parse("[2025-01-02] move C-0002-01 from bs to ao for 23370001").unwrap();
        assert_eq!(mv.to, Location::AppointmentOffice);
        assert_eq!(mv.student.as_deref(), Some("23370001"));
        assert_eq!(mv.to_string(), "[2025-01-02] move C-0002-01 from bs to ao for 23370001");

        let mv = TidyMove::parse("[2025-01-02] move C-0002-01 from bro to hbs").unwrap();
        assert_eq!((mv.from, mv.to), (Location::BorrowReturnOffice, Location::HotBookshelf));

        assert!(TidyMove::parse("[2025-01-02] move C-0002-01 from bs to ao").is_err());
        assert!(TidyMove::parse("[2025-01-02] move C-0002-01 from bs to rr for 23370001").is_err());
        assert!(TidyMove::parse("[2025-01-02] move C-0002-01 from user to bs").is_err());

        assert_eq!(parse_count("3"), Ok(3));
        assert!(parse_count("-1").is_err());
        assert!(parse_count("[2025-01-02] OPEN").is_err());
    }
}
