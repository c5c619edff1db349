//! Identifiers, book classes and locations.
//!
//! ISBNs look like `B-0042`; the leading letter is the book class. Copy ids
//! append a two-digit sequence number: `B-0042-03`.

use std::fmt;

/// Student identifier as it appears on the wire.
pub type StudentId = String;

/// ISBN of a title (`<type>-<NNNN>`).
pub type Isbn = String;

/// Identifier of a physical copy (`<ISBN>-<NN>`).
pub type CopyId = String;

/// Book class, derived from the first character of the ISBN.
///
/// Class A titles are reference-only (read in the reading room, never lent),
/// B titles may be held one at a time, and C titles one copy per ISBN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BookType {
    /// Reference-only.
    A,
    /// Lendable, one held copy per student.
    B,
    /// Lendable, one held copy per ISBN per student.
    C,
}

impl BookType {
    /// All classes in order.
    pub const ALL: [Self; 3] = [Self::A, Self::B, Self::C];

    /// Class of an ISBN, or `None` if the leading letter is unknown.
    pub fn of_isbn(isbn: &str) -> Option<Self> {
        match isbn.chars().next()? {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            _ => None,
        }
    }

    /// Class letter.
    pub fn letter(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
        }
    }
}

impl fmt::Display for BookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Where a copy physically is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    /// Regular bookshelf (`bs`).
    Bookshelf,
    /// Hot bookshelf for recently popular titles (`hbs`).
    HotBookshelf,
    /// Borrow/return office (`bro`).
    BorrowReturnOffice,
    /// Appointment office holding ordered copies (`ao`).
    AppointmentOffice,
    /// Reading room (`rr`).
    ReadingRoom,
    /// With a student (`user`).
    User,
}

impl Location {
    /// Every location, in wire-code order.
    pub const ALL: [Self; 6] = [
        Self::Bookshelf,
        Self::HotBookshelf,
        Self::BorrowReturnOffice,
        Self::AppointmentOffice,
        Self::ReadingRoom,
        Self::User,
    ];

    /// Wire short code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Bookshelf => "bs",
            Self::HotBookshelf => "hbs",
            Self::BorrowReturnOffice => "bro",
            Self::AppointmentOffice => "ao",
            Self::ReadingRoom => "rr",
            Self::User => "user",
        }
    }

    /// Parse a wire short code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|loc| loc.code() == code)
    }

    /// Shelf locations a student can take copies from.
    pub fn is_shelf(self) -> bool {
        matches!(self, Self::Bookshelf | Self::HotBookshelf)
    }

    /// Locations the library may move copies between on its own.
    pub fn is_tidy_location(self) -> bool {
        self != Self::User
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Build the copy id for the `seq`-th copy of `isbn`.
pub fn copy_id(isbn: &str, seq: u32) -> CopyId {
    format!("{isbn}-{seq:02}")
}

/// Whether `s` is shaped like an ISBN (`<A|B|C>-<digits>`).
pub fn is_isbn(s: &str) -> bool {
    let Some((prefix, digits)) = s.split_once('-') else {
        return false;
    };
    prefix.len() == 1
        && BookType::of_isbn(prefix).is_some()
        && !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Whether `s` is shaped like a copy id (`<ISBN>-<digits>`).
pub fn is_copy_id(s: &str) -> bool {
    isbn_of_copy(s).is_some()
}

/// ISBN part of a copy id, if `s` is shaped like one.
pub fn isbn_of_copy(s: &str) -> Option<&str> {
    let (isbn, seq) = s.rsplit_once('-')?;
    (is_isbn(isbn) && !seq.is_empty() && seq.bytes().all(|b| b.is_ascii_digit())).then_some(isbn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_type_from_isbn() {
        assert_eq!(BookType::of_isbn("A-0001"), Some(BookType::A));
        assert_eq!(BookType::of_isbn("C-9999"), Some(BookType::C));
        assert_eq!(BookType::of_isbn("D-0001"), None);
        assert_eq!(BookType::of_isbn(""), None);
    }

    #[test]
    fn location_codes_roundtrip() {
        for loc in Location::ALL {
            assert_eq!(Location::from_code(loc.code()), Some(loc));
        }
        assert_eq!(Location::from_code("shelf"), None);
        assert!(!Location::User.is_tidy_location());
        assert!(Location::HotBookshelf.is_shelf());
    }

    #[test]
    fn id_shapes() {
        assert_eq!(copy_id("B-0042", 3), "B-0042-03");
        assert!(is_isbn("B-0042"));
        assert!(!is_isbn("B-0042-03"));
        assert!(!is_isbn("X-0042"));
        assert!(is_copy_id("B-0042-03"));
        assert!(!is_copy_id("B-0042"));
        assert_eq!(isbn_of_copy("C-0001-12"), Some("C-0001"));
    }
}
