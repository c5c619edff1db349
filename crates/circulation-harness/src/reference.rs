//! A correct simulator built on the library model.
//!
//! [`ReferenceLibrary`] answers every command the way a conforming simulator
//! may: the lowest-numbered shelved copy is handed out, CLOSE moves nothing,
//! and OPEN clears the offices, sorts the shelves by hotness and sets aside
//! one copy for every pending order it can serve. Model-based tests feed its
//! answers to the checker, and the driver ships it as a stand-alone binary.

use chrono::{Duration, NaiveDate};
use circulation_model::{LibraryRules, LibrarySystem, Location, ModelError, Student};
use circulation_proto::{
    Command, CreditLine, Inventory, Request, Status, TidyMove, TraceEntry, TraceHeader, UserOpLine,
    Verb,
};

/// In-process simulator that always answers legally.
#[derive(Debug, Clone, Default)]
pub struct ReferenceLibrary {
    library: LibrarySystem,
}

impl ReferenceLibrary {
    /// Empty library under `rules`.
    pub fn new(rules: LibraryRules) -> Self {
        Self { library: LibrarySystem::new(rules) }
    }

    /// Library stocked from a handshake inventory.
    pub fn from_inventory(rules: LibraryRules, inventory: &Inventory) -> Result<Self, ModelError> {
        let mut reference = Self::new(rules);
        reference.library.initialize(inventory.entry_lines())?;
        Ok(reference)
    }

    /// Current model state.
    pub fn library(&self) -> &LibrarySystem {
        &self.library
    }

    /// Answer one command, returning every response line.
    pub fn respond(&mut self, command: &Command) -> Result<Vec<String>, ModelError> {
        let date = command.date;
        self.library.advance_time_to(date);

        let lines = match &command.request {
            Request::Open => {
                self.library.apply_open(date);
                let moves = self.tidy_on_open(date)?;
                count_and(moves)
            },
            Request::Close => {
                self.library.apply_close(date);
                vec!["0".to_owned()]
            },
            Request::Borrow { student, isbn } => {
                let granted = match self.library.can_borrow(student, isbn) {
                    Ok(()) => Some(self.first_shelved(isbn)?),
                    Err(_) => None,
                };
                if let Some(copy) = &granted {
                    self.library.apply_borrow(student, copy)?;
                }
                vec![user_op(date, student, Verb::Borrowed, granted, isbn)]
            },
            Request::Return { student, copy } => {
                let overdue = match self.library.can_return(student, copy) {
                    Ok(()) => Some(self.library.apply_return(student, copy)?),
                    Err(_) => None,
                };
                let line = UserOpLine {
                    date,
                    status: if overdue.is_some() { Status::Accept } else { Status::Reject },
                    student: student.clone(),
                    verb: Verb::Returned,
                    target: copy.clone(),
                    overdue: Some(overdue.unwrap_or(false)),
                };
                vec![line.to_string()]
            },
            Request::Order { student, isbn } => {
                let granted = self.library.can_order(student, isbn).is_ok();
                if granted {
                    self.library.apply_order(student, isbn);
                }
                vec![user_op(date, student, Verb::Ordered, granted.then(|| isbn.clone()), isbn)]
            },
            Request::Pick { student, isbn } => {
                let granted = match self.library.can_pick(student, isbn) {
                    Ok(()) => self
                        .library
                        .student(student)
                        .and_then(|s| s.order().reserved())
                        .map(|(copy, _)| copy.to_owned()),
                    Err(_) => None,
                };
                if let Some(copy) = &granted {
                    self.library.apply_pick(student, copy)?;
                }
                vec![user_op(date, student, Verb::Picked, granted, isbn)]
            },
            Request::Read { student, isbn } => {
                let granted = match self.library.can_read(student, isbn) {
                    Ok(()) => Some(self.first_shelved(isbn)?),
                    Err(_) => None,
                };
                if let Some(copy) = &granted {
                    self.library.apply_read(student, copy)?;
                }
                vec![user_op(date, student, Verb::Read, granted, isbn)]
            },
            Request::Restore { student, copy } => {
                let granted = self.library.can_restore(student, copy).is_ok();
                if granted {
                    self.library.apply_restore(student, copy)?;
                }
                vec![user_op(date, student, Verb::Restored, granted.then(|| copy.clone()), copy)]
            },
            Request::QueryTrace { copy, .. } => {
                let trace = self.library.trace(copy);
                let header = TraceHeader { date, copy: copy.clone(), count: trace.len() };
                std::iter::once(header.to_string())
                    .chain((1..).zip(trace).map(|(seq, mv)| {
                        TraceEntry { seq, date: mv.date, from: mv.from, to: mv.to }.to_string()
                    }))
                    .collect()
            },
            Request::QueryCredit { student } => {
                let credit = i64::from(self.library.credit_of(student));
                vec![CreditLine { date, student: student.clone(), credit }.to_string()]
            },
        };
        Ok(lines)
    }

    fn first_shelved(&self, isbn: &str) -> Result<String, ModelError> {
        self.library
            .shelved_copies(isbn)
            .next()
            .map(str::to_owned)
            .ok_or_else(|| ModelError::UnknownCopy { copy: format!("{isbn}-??") })
    }

    /// Morning tidy: expired reservations and office copies go back to the
    /// right shelf, shelves are re-sorted by hotness, pending orders are
    /// served from the shelves.
    fn tidy_on_open(&mut self, today: NaiveDate) -> Result<Vec<TidyMove>, ModelError> {
        let mut moves = Vec::new();

        let stale: Vec<(String, Location)> = self
            .library
            .copies()
            .filter(|c| match c.location() {
                Location::AppointmentOffice => c.reservation().is_none_or(|r| r.deadline < today),
                Location::BorrowReturnOffice | Location::ReadingRoom => true,
                _ => false,
            })
            .map(|c| (c.id().to_owned(), c.location()))
            .collect();
        for (copy, from) in stale {
            let to = self.shelf_for(&copy);
            self.relocate(today, &copy, from, to, &mut moves)?;
        }

        let misplaced: Vec<(String, Location, Location)> = self
            .library
            .copies()
            .filter_map(|c| {
                let hot = self.library.is_hot(c.isbn());
                match (c.location(), hot) {
                    (Location::Bookshelf, true) => Some(Location::HotBookshelf),
                    (Location::HotBookshelf, false) => Some(Location::Bookshelf),
                    _ => None,
                }
                .map(|to| (c.id().to_owned(), c.location(), to))
            })
            .collect();
        for (copy, from, to) in misplaced {
            self.relocate(today, &copy, from, to, &mut moves)?;
        }

        let pending: Vec<(String, String)> = self
            .library
            .students()
            .filter_map(|s: &Student| Some((s.id().to_owned(), s.order().pending_isbn()?.to_owned())))
            .collect();
        let deadline = today + Duration::days(self.library.rules().pickup_window_days - 1);
        for (student, isbn) in pending {
            let Some(copy) = self.library.shelved_copies(&isbn).next().map(str::to_owned) else {
                continue;
            };
            let from = self.library.copy(&copy).map_or(Location::Bookshelf, |c| c.location());
            self.library.apply_tidy_move(&copy, from, Location::AppointmentOffice)?;
            self.library.apply_reservation_at_ao(&copy, &student, deadline)?;
            moves.push(TidyMove {
                date: today,
                copy,
                from,
                to: Location::AppointmentOffice,
                student: Some(student),
            });
        }
        Ok(moves)
    }

    fn shelf_for(&self, copy: &str) -> Location {
        let hot = self.library.copy(copy).is_some_and(|c| self.library.is_hot(c.isbn()));
        if hot { Location::HotBookshelf } else { Location::Bookshelf }
    }

    fn relocate(
        &mut self,
        date: NaiveDate,
        copy: &str,
        from: Location,
        to: Location,
        moves: &mut Vec<TidyMove>,
    ) -> Result<(), ModelError> {
        self.library.apply_tidy_move(copy, from, to)?;
        moves.push(TidyMove { date, copy: copy.to_owned(), from, to, student: None });
        Ok(())
    }
}

fn user_op(date: NaiveDate, student: &str, verb: Verb, granted: Option<String>, asked: &str) -> String {
    let (status, target) = match granted {
        Some(target) => (Status::Accept, target),
        None => (Status::Reject, asked.to_owned()),
    };
    UserOpLine { date, status, student: student.to_owned(), verb, target, overdue: None }.to_string()
}

fn count_and(moves: Vec<TidyMove>) -> Vec<String> {
    std::iter::once(moves.len().to_string()).chain(moves.iter().map(ToString::to_string)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::Checker;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, n).unwrap()
    }

    fn reference() -> ReferenceLibrary {
        let inventory = Inventory::new(vec![("B-0001".into(), 2), ("C-0001".into(), 1)]);
        ReferenceLibrary::from_inventory(LibraryRules::default(), &inventory).unwrap()
    }

    #[test]
    fn hands_out_lowest_copy() {
        let mut reference = reference();
        reference.respond(&Command::open(day(1))).unwrap();
        let borrow: Command = "[2025-01-01] 23370001 borrowed B-0001".parse().unwrap();
        assert_eq!(
            reference.respond(&borrow).unwrap(),
            ["[2025-01-01] [accept] 23370001 borrowed B-0001-01"]
        );
        let again: Command = "[2025-01-01] 23370001 borrowed B-0001".parse().unwrap();
        assert_eq!(
            reference.respond(&again).unwrap(),
            ["[2025-01-01] [reject] 23370001 borrowed B-0001"]
        );
    }

    #[test]
    fn open_serves_pending_orders() {
        let mut reference = reference();
        reference.respond(&Command::open(day(1))).unwrap();
        reference.respond(&"[2025-01-01] 23370002 ordered C-0001".parse().unwrap()).unwrap();
        reference.respond(&Command::close(day(1))).unwrap();

        let lines = reference.respond(&Command::open(day(2))).unwrap();
        assert_eq!(lines, ["1", "[2025-01-02] move C-0001-01 from bs to ao for 23370002"]);

        let pick = reference.respond(&"[2025-01-02] 23370002 picked C-0001".parse().unwrap()).unwrap();
        assert_eq!(pick, ["[2025-01-02] [accept] 23370002 picked C-0001-01"]);
    }

    #[test]
    fn answers_pass_the_checker() {
        let mut reference = reference();
        let mut model = reference.library().clone();
        let checker = Checker::new();
        let script = [
            "[2025-01-01] OPEN",
            "[2025-01-01] 23370001 borrowed B-0001",
            "[2025-01-01] 23370002 read B-0001",
            "[2025-01-01] 23370003 ordered C-0001",
            "[2025-01-01] CLOSE",
            "[2025-01-03] OPEN",
            "[2025-01-03] 23370001 returned B-0001-01",
            "[2025-01-03] 23370001 queried B-0001-02",
            "[2025-01-03] 23370002 queried credit score",
            "[2025-01-03] CLOSE",
            "[2025-01-04] OPEN",
        ];
        for line in script {
            let command: Command = line.parse().unwrap();
            let output = reference.respond(&command).unwrap();
            checker
                .check_batch(&mut model, std::slice::from_ref(&command), &output)
                .unwrap_or_else(|v| panic!("{v}"));
        }
        // unrestored reading cost 23370002 ten points
        assert_eq!(model.credit_of("23370002"), 90);
        // nothing was borrowed on the 3rd, so B-0001 cooled down overnight
        assert_eq!(model.copy("B-0001-01").unwrap().location(), Location::Bookshelf);
        assert_eq!(model.copy("B-0001-02").unwrap().location(), Location::Bookshelf);
        assert_eq!(model.copy("C-0001-01").unwrap().location(), Location::AppointmentOffice);
    }
}
