//! Command lines sent to the simulator.
//!
//! ```text
//! [2025-01-01] OPEN
//! [2025-01-01] 23370001 borrowed B-0001
//! [2025-01-01] 23370001 returned B-0001-02
//! [2025-01-01] 23370001 queried B-0001-02
//! [2025-01-01] 23370001 queried credit score
//! ```

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use circulation_model::{CopyId, Isbn, StudentId, is_copy_id, is_isbn};

use crate::{
    date::{Bracketed, parse_bracketed},
    error::ProtocolError,
    framing::ResponseShape,
};

/// User action verbs shared by commands and their responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Take a copy home.
    Borrowed,
    /// Bring a lent copy back.
    Returned,
    /// Ask for a title to be set aside.
    Ordered,
    /// Collect a set-aside copy.
    Picked,
    /// Take a copy into the reading room.
    Read,
    /// Hand a reading-room copy back.
    Restored,
}

impl Verb {
    /// Wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Borrowed => "borrowed",
            Self::Returned => "returned",
            Self::Ordered => "ordered",
            Self::Picked => "picked",
            Self::Read => "read",
            Self::Restored => "restored",
        }
    }

    /// Parse the wire spelling.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "borrowed" => Self::Borrowed,
            "returned" => Self::Returned,
            "ordered" => Self::Ordered,
            "picked" => Self::Picked,
            "read" => Self::Read,
            "restored" => Self::Restored,
            _ => return None,
        })
    }

    /// Whether the command names a copy id rather than an ISBN.
    pub fn targets_copy(self) -> bool {
        matches!(self, Self::Returned | Self::Restored)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a command asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Request {
    /// Start of a library day.
    Open,
    /// End of a library day.
    Close,
    /// Borrow some copy of a title.
    Borrow {
        /// Requesting student
        student: StudentId,
        /// Requested title
        isbn: Isbn,
    },
    /// Return a lent copy.
    Return {
        /// Requesting student
        student: StudentId,
        /// Copy brought back
        copy: CopyId,
    },
    /// Order a title for later pickup.
    Order {
        /// Requesting student
        student: StudentId,
        /// Requested title
        isbn: Isbn,
    },
    /// Pick up an ordered title.
    Pick {
        /// Requesting student
        student: StudentId,
        /// Ordered title
        isbn: Isbn,
    },
    /// Read some copy of a title in the reading room.
    Read {
        /// Requesting student
        student: StudentId,
        /// Requested title
        isbn: Isbn,
    },
    /// Hand back a reading-room copy.
    Restore {
        /// Requesting student
        student: StudentId,
        /// Copy handed back
        copy: CopyId,
    },
    /// Movement history of a copy.
    QueryTrace {
        /// Requesting student
        student: StudentId,
        /// Queried copy
        copy: CopyId,
    },
    /// Credit score of the requesting student.
    QueryCredit {
        /// Requesting student
        student: StudentId,
    },
}

impl Request {
    /// Student issuing the request, `None` for OPEN/CLOSE.
    pub fn student(&self) -> Option<&str> {
        match self {
            Self::Open | Self::Close => None,
            Self::Borrow { student, .. }
            | Self::Return { student, .. }
            | Self::Order { student, .. }
            | Self::Pick { student, .. }
            | Self::Read { student, .. }
            | Self::Restore { student, .. }
            | Self::QueryTrace { student, .. }
            | Self::QueryCredit { student } => Some(student.as_str()),
        }
    }

    /// Verb of a user action, `None` for OPEN/CLOSE and queries.
    pub fn verb(&self) -> Option<Verb> {
        match self {
            Self::Borrow { .. } => Some(Verb::Borrowed),
            Self::Return { .. } => Some(Verb::Returned),
            Self::Order { .. } => Some(Verb::Ordered),
            Self::Pick { .. } => Some(Verb::Picked),
            Self::Read { .. } => Some(Verb::Read),
            Self::Restore { .. } => Some(Verb::Restored),
            Self::Open | Self::Close | Self::QueryTrace { .. } | Self::QueryCredit { .. } => None,
        }
    }

    /// ISBN or copy id the request is about.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Borrow { isbn, .. }
            | Self::Order { isbn, .. }
            | Self::Pick { isbn, .. }
            | Self::Read { isbn, .. } => Some(isbn.as_str()),
            Self::Return { copy, .. } | Self::Restore { copy, .. } | Self::QueryTrace { copy, .. } => {
                Some(copy.as_str())
            },
            Self::Open | Self::Close | Self::QueryCredit { .. } => None,
        }
    }

    /// Whether this is OPEN or CLOSE.
    pub fn is_tidy(&self) -> bool {
        matches!(self, Self::Open | Self::Close)
    }

    fn user_action(verb: Verb, student: StudentId, target: String) -> Self {
        match verb {
            Verb::Borrowed => Self::Borrow { student, isbn: target },
            Verb::Returned => Self::Return { student, copy: target },
            Verb::Ordered => Self::Order { student, isbn: target },
            Verb::Picked => Self::Pick { student, isbn: target },
            Verb::Read => Self::Read { student, isbn: target },
            Verb::Restored => Self::Restore { student, copy: target },
        }
    }
}

/// A dated command line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    /// Simulated date.
    pub date: NaiveDate,
    /// Requested operation.
    pub request: Request,
}

impl Command {
    /// Build a command.
    pub fn new(date: NaiveDate, request: Request) -> Self {
        Self { date, request }
    }

    /// OPEN on `date`.
    pub fn open(date: NaiveDate) -> Self {
        Self::new(date, Request::Open)
    }

    /// CLOSE on `date`.
    pub fn close(date: NaiveDate) -> Self {
        Self::new(date, Request::Close)
    }

    /// How the simulator's answer to this command is framed.
    pub fn shape(&self) -> ResponseShape {
        ResponseShape::of(&self.request)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = Bracketed(self.date);
        match &self.request {
            Request::Open => write!(f, "{date} OPEN"),
            Request::Close => write!(f, "{date} CLOSE"),
            Request::QueryTrace { student, copy } => write!(f, "{date} {student} queried {copy}"),
            Request::QueryCredit { student } => write!(f, "{date} {student} queried credit score"),
            request => {
                // user actions always carry a verb, student and target
                let verb = request.verb().map_or("", Verb::as_str);
                let student = request.student().unwrap_or_default();
                let target = request.target().unwrap_or_default();
                write!(f, "{date} {student} {verb} {target}")
            },
        }
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let malformed = || ProtocolError::MalformedCommand { line: line.to_owned() };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((first, rest)) = tokens.split_first() else {
            return Err(malformed());
        };
        let date = parse_bracketed(first)?;

        let request = match rest {
            ["OPEN"] => Request::Open,
            ["CLOSE"] => Request::Close,
            [student, "queried", "credit", "score"] => {
                Request::QueryCredit { student: (*student).to_owned() }
            },
            [student, "queried", copy] if is_copy_id(copy) => Request::QueryTrace {
                student: (*student).to_owned(),
                copy: (*copy).to_owned(),
            },
            [student, verb, target] => {
                let verb = Verb::parse(verb).ok_or_else(malformed)?;
                let well_formed = if verb.targets_copy() { is_copy_id(target) } else { is_isbn(target) };
                if !well_formed {
                    return Err(malformed());
                }
                Request::user_action(verb, (*student).to_owned(), (*target).to_owned())
            },
            _ => return Err(malformed()),
        };
        Ok(Self { date, request })
    }
}
