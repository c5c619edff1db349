//! Reference model of the library circulation rules.
//!
//! [`LibrarySystem`] tracks every copy and student, the library calendar and
//! the hot-title bookkeeping. It is deliberately free of I/O: a conformance
//! checker advances it only after judging a response consistent, and a
//! command generator reads it to pick plausible requests.
//!
//! # Daily accounting
//!
//! Time only moves forward through [`LibrarySystem::advance_time_to`]. Each
//! skipped day is processed individually because overdue penalties compound:
//!
//! ```
//! # use chrono::NaiveDate;
//! # use circulation_model::LibrarySystem;
//! let mut library = LibrarySystem::default();
//! library.initialize(["B-0001 1"]).unwrap();
//! let day = |d: i64| NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(d - 1);
//!
//! library.apply_open(day(1));
//! library.apply_borrow("23370001", "B-0001-01").unwrap();
//! library.advance_time_to(day(33));
//! assert_eq!(library.credit_of("23370001"), 85);
//! ```

mod copy;
mod eligibility;
mod error;
mod library;
mod rules;
mod student;
mod types;

pub use copy::{BookCopy, Move, Placement, Reservation};
pub use eligibility::{Eligibility, Ineligible};
pub use error::ModelError;
pub use library::LibrarySystem;
pub use rules::LibraryRules;
pub use student::{Loan, OrderState, Student};
pub use types::{
    BookType, CopyId, Isbn, Location, StudentId, copy_id, is_copy_id, is_isbn, isbn_of_copy,
};
