//! OPEN/CLOSE tidy responses.

use chrono::{Duration, NaiveDate};
use circulation_model::{LibrarySystem, Location};
use circulation_proto::{TidyMove, parse_count};

use super::{Verdict, Violation, ViolationKind};

/// Which end of the day the moves belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
    Open,
    Close,
}

impl Phase {
    /// First day an order set aside now can be picked up.
    fn effective(self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Open => today,
            Self::Close => today + Duration::days(1),
        }
    }

    /// Whether a reservation with `deadline` still pins its copy.
    fn still_reserved(self, today: NaiveDate, deadline: NaiveDate) -> bool {
        match self {
            Self::Open => today <= deadline,
            Self::Close => today < deadline,
        }
    }
}

pub(super) fn check(library: &mut LibrarySystem, date: NaiveDate, frame: &[String], phase: Phase) -> Verdict {
    let Some((header, moves)) = frame.split_first() else {
        return Err(Violation::new(ViolationKind::Framing, "missing move count"));
    };
    let count = parse_count(header).map_err(|e| Violation::format(&e).at_line(header))?;
    if count != moves.len() {
        return Err(Violation::new(
            ViolationKind::Framing,
            format!("announced {count} moves, framed {}", moves.len()),
        ));
    }

    for line in moves {
        apply_move(library, date, line, phase).map_err(|v| v.at_line(line))?;
    }
    if phase == Phase::Open {
        after_open(library, date)?;
    }
    Ok(())
}

fn apply_move(library: &mut LibrarySystem, today: NaiveDate, line: &str, phase: Phase) -> Verdict {
    let mv = TidyMove::parse(line).map_err(|e| Violation::format(&e))?;
    if mv.date != today {
        return Err(Violation::mismatch(format!("move dated {} during {today}", mv.date)));
    }
    let copy = library
        .copy(&mv.copy)
        .ok_or_else(|| Violation::illegal(format!("unknown copy {}", mv.copy)))?;
    if mv.from == mv.to {
        return Err(Violation::illegal(format!("{} moved from {} to itself", mv.copy, mv.from)));
    }
    if copy.location() != mv.from {
        return Err(Violation::illegal(format!(
            "{} is at {}, not {}",
            mv.copy,
            copy.location(),
            mv.from
        )));
    }
    if let Some(reservation) = copy.reservation() {
        if phase.still_reserved(today, reservation.deadline) {
            return Err(Violation::illegal(format!(
                "{} is reserved for {} until {}",
                mv.copy, reservation.student, reservation.deadline
            )));
        }
    }

    let reserve_for = if mv.to == Location::AppointmentOffice {
        let student = mv.student.as_deref().unwrap_or_default();
        let view = library.student_view(student);
        if view.order().pending_isbn() != Some(copy.isbn()) {
            return Err(Violation::illegal(format!(
                "{} set aside for {student}, who has no pending order for {}",
                mv.copy,
                copy.isbn()
            )));
        }
        Some(student.to_owned())
    } else {
        None
    };

    library.apply_tidy_move(&mv.copy, mv.from, mv.to).map_err(|e| Violation::internal(&e))?;
    if let Some(student) = reserve_for {
        let window = library.rules().pickup_window_days;
        let deadline = phase.effective(today) + Duration::days(window - 1);
        library
            .apply_reservation_at_ao(&mv.copy, &student, deadline)
            .map_err(|e| Violation::internal(&e))?;
    }
    Ok(())
}

/// State every OPEN must leave behind.
fn after_open(library: &LibrarySystem, today: NaiveDate) -> Verdict {
    let stranded = |location: Location| {
        library.copies_at(location).next().map(|copy| {
            Violation::illegal(format!("{} left at {location} after opening", copy.id()))
        })
    };
    if let Some(violation) =
        stranded(Location::BorrowReturnOffice).or_else(|| stranded(Location::ReadingRoom))
    {
        return Err(violation);
    }

    for copy in library.copies_at(Location::AppointmentOffice) {
        if let Some(reservation) = copy.reservation().filter(|r| r.deadline < today) {
            return Err(Violation::illegal(format!(
                "{} still held for {} after the {} deadline",
                copy.id(),
                reservation.student,
                reservation.deadline
            )));
        }
    }

    for copy in library.copies_at(Location::HotBookshelf) {
        if !library.is_hot(copy.isbn()) {
            return Err(Violation::illegal(format!("{} is on the hot shelf but not hot", copy.id())));
        }
    }
    for copy in library.copies_at(Location::Bookshelf) {
        if library.is_hot(copy.isbn()) {
            return Err(Violation::illegal(format!("{} is hot but on the regular shelf", copy.id())));
        }
    }
    Ok(())
}
