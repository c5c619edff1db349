//! Physical book copies and their movement history.

use chrono::NaiveDate;

use crate::types::{BookType, CopyId, Isbn, Location, StudentId};

/// Appointment-office reservation of a copy for one student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Student the copy is held for.
    pub student: StudentId,
    /// Last day the copy may be picked up.
    pub deadline: NaiveDate,
}

/// Current placement of a copy.
///
/// Holder and reservation data only exist on the variants where they make
/// sense, so a copy can never carry a holder while sitting on a shelf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Regular bookshelf.
    Bookshelf,
    /// Hot bookshelf.
    HotBookshelf,
    /// Borrow/return office.
    BorrowReturnOffice,
    /// Appointment office, possibly held for a student.
    AppointmentOffice(Option<Reservation>),
    /// Reading room, normally with the student reading it.
    ReadingRoom(Option<StudentId>),
    /// Lent to a student.
    User(StudentId),
}

impl Placement {
    /// Placement for `location` with no attached holder or reservation.
    ///
    /// A user placement requires a holder, so `Location::User` yields `None`.
    pub fn unattended(location: Location) -> Option<Self> {
        match location {
            Location::Bookshelf => Some(Self::Bookshelf),
            Location::HotBookshelf => Some(Self::HotBookshelf),
            Location::BorrowReturnOffice => Some(Self::BorrowReturnOffice),
            Location::AppointmentOffice => Some(Self::AppointmentOffice(None)),
            Location::ReadingRoom => Some(Self::ReadingRoom(None)),
            Location::User => None,
        }
    }

    /// Location of this placement.
    pub fn location(&self) -> Location {
        match self {
            Self::Bookshelf => Location::Bookshelf,
            Self::HotBookshelf => Location::HotBookshelf,
            Self::BorrowReturnOffice => Location::BorrowReturnOffice,
            Self::AppointmentOffice(_) => Location::AppointmentOffice,
            Self::ReadingRoom(_) => Location::ReadingRoom,
            Self::User(_) => Location::User,
        }
    }
}

/// One recorded relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    /// Day of the move.
    pub date: NaiveDate,
    /// Origin.
    pub from: Location,
    /// Destination.
    pub to: Location,
}

/// A physical copy of a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookCopy {
    id: CopyId,
    isbn: Isbn,
    book_type: BookType,
    seq: u32,
    placement: Placement,
    trace: Vec<Move>,
}

impl BookCopy {
    pub(crate) fn new(id: CopyId, isbn: Isbn, book_type: BookType, seq: u32) -> Self {
        Self { id, isbn, book_type, seq, placement: Placement::Bookshelf, trace: Vec::new() }
    }

    /// Copy id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// ISBN of the title.
    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    /// Book class.
    pub fn book_type(&self) -> BookType {
        self.book_type
    }

    /// Sequence number within the title.
    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Current placement.
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Current location.
    pub fn location(&self) -> Location {
        self.placement.location()
    }

    /// Student holding the copy (lent or reading), if any.
    pub fn holder(&self) -> Option<&str> {
        match &self.placement {
            Placement::User(s) => Some(s.as_str()),
            Placement::ReadingRoom(s) => s.as_deref(),
            _ => None,
        }
    }

    /// Active appointment-office reservation, if any.
    pub fn reservation(&self) -> Option<&Reservation> {
        match &self.placement {
            Placement::AppointmentOffice(r) => r.as_ref(),
            _ => None,
        }
    }

    /// Movement history, oldest first.
    pub fn trace(&self) -> &[Move] {
        &self.trace
    }

    /// Relocate the copy, recording the move when the location changes.
    pub(crate) fn relocate(&mut self, date: NaiveDate, placement: Placement) {
        let from = self.location();
        let to = placement.location();
        if from != to {
            self.trace.push(Move { date, from, to });
        }
        self.placement = placement;
    }

    /// Attach a reservation. Returns `false` unless the copy is at the
    /// appointment office.
    pub(crate) fn reserve(&mut self, reservation: Reservation) -> bool {
        match &mut self.placement {
            Placement::AppointmentOffice(r) => {
                *r = Some(reservation);
                true
            },
            _ => false,
        }
    }

    /// Drop the reservation while leaving the copy at the appointment office.
    pub(crate) fn clear_reservation(&mut self) {
        if let Placement::AppointmentOffice(r) = &mut self.placement {
            *r = None;
        }
    }
}
