//! Standard invariant checks.
//!
//! These capture bookkeeping the model must never lose, independent of any
//! particular request sequence.

use std::collections::BTreeSet;

use circulation_model::{BookType, LibrarySystem, Location, OrderState, Placement};

use super::{Invariant, InvariantResult};

/// The shelf index lists exactly the copies located on a shelf.
///
/// Borrow and read pick from the index, so a stale entry would hand out a
/// copy that is not there.
pub struct ShelfIndexConsistency;

impl Invariant for ShelfIndexConsistency {
    fn name(&self) -> &'static str {
        "ShelfIndexConsistency"
    }

    fn check(&self, library: &LibrarySystem) -> InvariantResult {
        let mut indexed = BTreeSet::new();
        for (isbn, copy) in library.shelf_index() {
            let Some(entry) = library.copy(copy) else {
                return Err(self.violation(format!("index lists unknown copy {copy}")));
            };
            if entry.isbn() != isbn {
                return Err(self.violation(format!("{copy} indexed under {isbn}")));
            }
            if !indexed.insert(copy) {
                return Err(self.violation(format!("{copy} indexed twice")));
            }
        }

        let shelved: BTreeSet<&str> =
            library.copies().filter(|c| c.location().is_shelf()).map(|c| c.id()).collect();
        if let Some(missing) = shelved.difference(&indexed).next() {
            return Err(self.violation(format!("{missing} is shelved but not indexed")));
        }
        if let Some(stale) = indexed.difference(&shelved).next() {
            return Err(self.violation(format!("{stale} is indexed but not shelved")));
        }
        Ok(())
    }
}

/// Every credit lies within the clamp.
pub struct CreditBounds;

impl Invariant for CreditBounds {
    fn name(&self) -> &'static str {
        "CreditBounds"
    }

    fn check(&self, library: &LibrarySystem) -> InvariantResult {
        let rules = library.rules();
        for student in library.students() {
            if !(rules.min_credit..=rules.max_credit).contains(&student.credit()) {
                return Err(self.violation(format!(
                    "student {} has credit {} outside [{}, {}]",
                    student.id(),
                    student.credit(),
                    rules.min_credit,
                    rules.max_credit
                )));
            }
        }
        Ok(())
    }
}

/// Loans and lent copies describe the same facts.
///
/// A type-B loan must point at a type-B copy lent to its holder, a type-C
/// loan at a lent copy of the ISBN it is filed under. Every lent copy must
/// appear as exactly one loan.
pub struct LoanConsistency;

impl Invariant for LoanConsistency {
    fn name(&self) -> &'static str {
        "LoanConsistency"
    }

    fn check(&self, library: &LibrarySystem) -> InvariantResult {
        let mut lent = BTreeSet::new();
        for student in library.students() {
            let filed = student
                .held_b()
                .map(|loan| (BookType::B, None, loan))
                .into_iter()
                .chain(student.held_c().iter().map(|(isbn, loan)| (BookType::C, Some(isbn.as_str()), loan)));

            for (book_type, isbn, loan) in filed {
                let Some(copy) = library.copy(&loan.copy) else {
                    return Err(self.violation(format!("{} holds unknown copy {}", student.id(), loan.copy)));
                };
                let holder_ok = matches!(copy.placement(), Placement::User(h) if h == student.id());
                if !holder_ok {
                    return Err(self.violation(format!(
                        "{} records a loan of {}, which is at {}",
                        student.id(),
                        loan.copy,
                        copy.location()
                    )));
                }
                if copy.book_type() != book_type || isbn.is_some_and(|isbn| isbn != copy.isbn()) {
                    return Err(self.violation(format!(
                        "{} files {} under the wrong title or type",
                        student.id(),
                        loan.copy
                    )));
                }
                if !lent.insert(copy.id()) {
                    return Err(self.violation(format!("{} is lent twice", loan.copy)));
                }
            }
        }

        for copy in library.copies_at(Location::User) {
            if !lent.contains(copy.id()) {
                return Err(self.violation(format!("{} is with a user but no loan records it", copy.id())));
            }
        }
        Ok(())
    }
}

/// A reserved order points at an appointment-office copy reserved for the
/// same student with the same deadline.
pub struct ReservationConsistency;

impl Invariant for ReservationConsistency {
    fn name(&self) -> &'static str {
        "ReservationConsistency"
    }

    fn check(&self, library: &LibrarySystem) -> InvariantResult {
        for student in library.students() {
            let OrderState::Reserved { copy, deadline } = student.order() else {
                continue;
            };
            let reservation = library.copy(copy).and_then(|c| c.reservation());
            let consistent =
                reservation.is_some_and(|r| r.student == student.id() && r.deadline == *deadline);
            if !consistent {
                return Err(self.violation(format!(
                    "{} expects {copy} reserved until {deadline}, found {:?}",
                    student.id(),
                    reservation
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    #[test]
    fn empty_library_passes() {
        let library = LibrarySystem::default();
        assert!(ShelfIndexConsistency.check(&library).is_ok());
        assert!(CreditBounds.check(&library).is_ok());
        assert!(LoanConsistency.check(&library).is_ok());
        assert!(ReservationConsistency.check(&library).is_ok());
    }

    #[test]
    fn reservation_survives_until_cleared() {
        let mut library = LibrarySystem::default();
        library.initialize(["C-0001 1"]).unwrap();
        library.apply_open(day());
        library.apply_order("23370001", "C-0001");
        library.apply_tidy_move("C-0001-01", Location::Bookshelf, Location::AppointmentOffice).unwrap();
        library.apply_reservation_at_ao("C-0001-01", "23370001", day()).unwrap();
        assert!(ReservationConsistency.check(&library).is_ok());

        library.apply_tidy_move("C-0001-01", Location::AppointmentOffice, Location::Bookshelf).unwrap();
        assert!(ReservationConsistency.check(&library).is_ok());
        assert!(ShelfIndexConsistency.check(&library).is_ok());
    }

    #[test]
    fn violation_names_the_invariant() {
        let violation = CreditBounds.violation("boom".into());
        assert_eq!(violation.to_string(), "CreditBounds: boom");
    }
}
