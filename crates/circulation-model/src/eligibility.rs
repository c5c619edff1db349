//! Eligibility predicates.
//!
//! Each predicate answers whether a request must be granted and, when it
//! must not, why. Predicates never mutate the model; a student that has never
//! been seen is judged as a fresh one.

use thiserror::Error;

use crate::{
    library::LibrarySystem,
    student::Student,
    types::{BookType, CopyId, Isbn, Location},
};

/// Outcome of an eligibility check.
pub type Eligibility = Result<(), Ineligible>;

/// Reason a request must be refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Ineligible {
    /// Credit below the threshold for this request
    #[error("credit {credit} is below the required {required}")]
    InsufficientCredit {
        /// Student's credit
        credit: i32,
        /// Threshold
        required: i32,
    },

    /// Credit too low to read this class of title
    #[error("credit {credit} does not allow reading type {book_type} titles")]
    CannotRead {
        /// Student's credit
        credit: i32,
        /// Class of the title
        book_type: BookType,
    },

    /// Type A titles are never lent or ordered
    #[error("type A titles are reference-only")]
    ReferenceOnly,

    /// ISBN does not name a known book class
    #[error("{isbn} is not a valid ISBN")]
    UnknownTitle {
        /// Offending ISBN
        isbn: Isbn,
    },

    /// Every copy is off the shelves
    #[error("no copy of {isbn} is on a shelf")]
    NoShelvedCopy {
        /// Requested ISBN
        isbn: Isbn,
    },

    /// Already holding a type-B copy
    #[error("already holds type B copy {copy}")]
    HoldsTypeB {
        /// Held copy
        copy: CopyId,
    },

    /// Already holding a copy of this type-C title
    #[error("already holds copy {copy} of this title")]
    HoldsSameTitle {
        /// Held copy
        copy: CopyId,
    },

    /// An order is pending or waiting for pickup
    #[error("an order is already in progress")]
    OrderInFlight,

    /// Nothing waits at the appointment office
    #[error("no copy is reserved for pickup")]
    NoReservation,

    /// Reserved copy is of a different title
    #[error("reserved copy {copy} is not a copy of {isbn}")]
    ReservationMismatch {
        /// Reserved copy
        copy: CopyId,
        /// Requested ISBN
        isbn: Isbn,
    },

    /// Reserved copy is not waiting at the appointment office for this student
    #[error("copy {copy} is not waiting at the appointment office for this student")]
    NotReservedHere {
        /// Reserved copy
        copy: CopyId,
    },

    /// Pickup deadline passed
    #[error("pickup deadline {deadline} has passed")]
    PickupExpired {
        /// Last pickup day
        deadline: chrono::NaiveDate,
    },

    /// Already reading another copy today
    #[error("already reading {copy} today")]
    AlreadyReading {
        /// Copy being read
        copy: CopyId,
    },

    /// Named copy does not exist
    #[error("unknown copy {copy}")]
    UnknownCopy {
        /// Offending copy id
        copy: CopyId,
    },

    /// Named copy belongs to another title
    #[error("copy {copy} is not a copy of {isbn}")]
    WrongTitle {
        /// Named copy
        copy: CopyId,
        /// Requested ISBN
        isbn: Isbn,
    },

    /// Named copy is not on a shelf
    #[error("copy {copy} is not on a shelf (at {location})")]
    NotOnShelf {
        /// Named copy
        copy: CopyId,
        /// Where it is
        location: Location,
    },

    /// Copy is not lent to this student
    #[error("copy {copy} is not held by this student")]
    NotHeld {
        /// Named copy
        copy: CopyId,
    },

    /// Copy is not this student's reading for today
    #[error("copy {copy} is not being read by this student today")]
    NotReading {
        /// Named copy
        copy: CopyId,
    },
}

impl LibrarySystem {
    /// Whether `student` may borrow some shelved copy of `isbn`.
    pub fn can_borrow(&self, student: &str, isbn: &str) -> Eligibility {
        let book_type = title_type(isbn)?;
        let view = self.student_view(student);
        self.require_credit(&view, self.rules().borrow_min_credit)?;
        if !self.has_shelved_copy(isbn) {
            return Err(Ineligible::NoShelvedCopy { isbn: isbn.to_owned() });
        }
        if book_type == BookType::A {
            return Err(Ineligible::ReferenceOnly);
        }
        conflicting_hold(&view, isbn, book_type)
    }

    /// Whether `student` may borrow the specific copy `copy` of `isbn`.
    pub fn can_borrow_copy(&self, student: &str, isbn: &str, copy: &str) -> Eligibility {
        let book_type = title_type(isbn)?;
        let view = self.student_view(student);
        self.require_credit(&view, self.rules().borrow_min_credit)?;
        if book_type == BookType::A {
            return Err(Ineligible::ReferenceOnly);
        }
        self.require_shelved(isbn, copy)?;
        conflicting_hold(&view, isbn, book_type)
    }

    /// Whether `student` may order `isbn`.
    pub fn can_order(&self, student: &str, isbn: &str) -> Eligibility {
        let book_type = title_type(isbn)?;
        let view = self.student_view(student);
        self.require_credit(&view, self.rules().order_min_credit)?;
        if book_type == BookType::A {
            return Err(Ineligible::ReferenceOnly);
        }
        if view.order().is_active() {
            return Err(Ineligible::OrderInFlight);
        }
        conflicting_hold(&view, isbn, book_type)
    }

    /// Whether `student` may pick up their reserved copy of `isbn` today.
    pub fn can_pick(&self, student: &str, isbn: &str) -> Eligibility {
        let book_type = title_type(isbn)?;
        let view = self.student_view(student);
        let Some((reserved, deadline)) = view.order().reserved() else {
            return Err(Ineligible::NoReservation);
        };
        let copy = self
            .copy(reserved)
            .ok_or_else(|| Ineligible::UnknownCopy { copy: reserved.to_owned() })?;
        if copy.isbn() != isbn {
            return Err(Ineligible::ReservationMismatch {
                copy: reserved.to_owned(),
                isbn: isbn.to_owned(),
            });
        }
        if copy.reservation().is_none_or(|r| r.student != student) {
            return Err(Ineligible::NotReservedHere { copy: reserved.to_owned() });
        }
        if self.today().is_some_and(|today| today > deadline) {
            return Err(Ineligible::PickupExpired { deadline });
        }
        self.require_credit(&view, self.rules().pick_min_credit)?;
        conflicting_hold(&view, isbn, book_type)
    }

    /// Whether `student` may take some shelved copy of `isbn` into the
    /// reading room.
    pub fn can_read(&self, student: &str, isbn: &str) -> Eligibility {
        let book_type = title_type(isbn)?;
        let view = self.student_view(student);
        self.require_read_credit(&view, book_type)?;
        if !self.has_shelved_copy(isbn) {
            return Err(Ineligible::NoShelvedCopy { isbn: isbn.to_owned() });
        }
        not_reading(&view)
    }

    /// Whether `student` may read the specific copy `copy` of `isbn`.
    pub fn can_read_copy(&self, student: &str, isbn: &str, copy: &str) -> Eligibility {
        let book_type = title_type(isbn)?;
        let view = self.student_view(student);
        self.require_read_credit(&view, book_type)?;
        self.require_shelved(isbn, copy)?;
        not_reading(&view)
    }

    /// Whether `student` may return `copy`.
    pub fn can_return(&self, student: &str, copy: &str) -> Eligibility {
        let entry =
            self.copy(copy).ok_or_else(|| Ineligible::UnknownCopy { copy: copy.to_owned() })?;
        if entry.location() != Location::User || entry.holder() != Some(student) {
            return Err(Ineligible::NotHeld { copy: copy.to_owned() });
        }
        Ok(())
    }

    /// Whether `student` may restore `copy` from the reading room.
    pub fn can_restore(&self, student: &str, copy: &str) -> Eligibility {
        let entry =
            self.copy(copy).ok_or_else(|| Ineligible::UnknownCopy { copy: copy.to_owned() })?;
        let reading = self.student(student).and_then(Student::reading_today);
        if entry.location() != Location::ReadingRoom
            || entry.holder() != Some(student)
            || reading != Some(copy)
        {
            return Err(Ineligible::NotReading { copy: copy.to_owned() });
        }
        Ok(())
    }

    fn require_credit(&self, student: &Student, required: i32) -> Eligibility {
        if student.credit() < required {
            return Err(Ineligible::InsufficientCredit { credit: student.credit(), required });
        }
        Ok(())
    }

    fn require_read_credit(&self, student: &Student, book_type: BookType) -> Eligibility {
        if !self.rules().may_read(book_type, student.credit()) {
            return Err(Ineligible::CannotRead { credit: student.credit(), book_type });
        }
        Ok(())
    }

    fn require_shelved(&self, isbn: &str, copy: &str) -> Eligibility {
        let entry =
            self.copy(copy).ok_or_else(|| Ineligible::UnknownCopy { copy: copy.to_owned() })?;
        if entry.isbn() != isbn {
            return Err(Ineligible::WrongTitle { copy: copy.to_owned(), isbn: isbn.to_owned() });
        }
        if !entry.location().is_shelf() {
            return Err(Ineligible::NotOnShelf { copy: copy.to_owned(), location: entry.location() });
        }
        Ok(())
    }
}

fn title_type(isbn: &str) -> Result<BookType, Ineligible> {
    BookType::of_isbn(isbn).ok_or_else(|| Ineligible::UnknownTitle { isbn: isbn.to_owned() })
}

fn conflicting_hold(student: &Student, isbn: &str, book_type: BookType) -> Eligibility {
    match book_type {
        BookType::B => match student.held_b() {
            Some(loan) => Err(Ineligible::HoldsTypeB { copy: loan.copy.clone() }),
            None => Ok(()),
        },
        BookType::C => match student.held_c().get(isbn) {
            Some(loan) => Err(Ineligible::HoldsSameTitle { copy: loan.copy.clone() }),
            None => Ok(()),
        },
        BookType::A => Ok(()),
    }
}

fn not_reading(student: &Student) -> Eligibility {
    match student.reading_today() {
        Some(copy) => Err(Ineligible::AlreadyReading { copy: copy.to_owned() }),
        None => Ok(()),
    }
}
