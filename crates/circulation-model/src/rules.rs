//! Circulation rules: loan periods, credit thresholds and credit deltas.

use crate::types::BookType;

/// Tunable rule set of the library.
///
/// Defaults follow the published circulation rules. Credit deltas are signed:
/// rewards positive, penalties negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRules {
    /// Loan period for type-B copies, in days.
    pub loan_days_b: i64,
    /// Loan period for type-C copies, in days.
    pub loan_days_c: i64,
    /// Days an ordered copy waits at the appointment office, counting the
    /// first day.
    pub pickup_window_days: i64,

    /// Credit of a newly seen student.
    pub initial_credit: i32,
    /// Lower credit clamp.
    pub min_credit: i32,
    /// Upper credit clamp.
    pub max_credit: i32,

    /// Minimum credit to borrow.
    pub borrow_min_credit: i32,
    /// Minimum credit to order.
    pub order_min_credit: i32,
    /// Minimum credit to pick up an ordered copy.
    pub pick_min_credit: i32,
    /// Minimum credit to read a type-A title.
    pub read_a_min_credit: i32,
    /// Type-B/C titles can be read while credit is strictly above this.
    pub read_floor_credit: i32,

    /// Returning a loan on or before its due date.
    pub on_time_return_bonus: i32,
    /// Restoring a reading-room copy on the day it was read.
    pub same_day_restore_bonus: i32,
    /// Reading without restoring before close.
    pub unrestored_read_penalty: i32,
    /// Day a loan becomes due.
    pub first_overdue_penalty: i32,
    /// Every following day the loan stays out.
    pub daily_overdue_penalty: i32,
    /// Reservation deadline passing without pickup.
    pub unpicked_order_penalty: i32,
}

impl Default for LibraryRules {
    fn default() -> Self {
        Self {
            loan_days_b: 30,
            loan_days_c: 60,
            pickup_window_days: 5,
            initial_credit: 100,
            min_credit: 0,
            max_credit: 180,
            borrow_min_credit: 60,
            order_min_credit: 100,
            pick_min_credit: 60,
            read_a_min_credit: 40,
            read_floor_credit: 0,
            on_time_return_bonus: 10,
            same_day_restore_bonus: 10,
            unrestored_read_penalty: -10,
            first_overdue_penalty: -5,
            daily_overdue_penalty: -5,
            unpicked_order_penalty: -15,
        }
    }
}

impl LibraryRules {
    /// Loan period for a book class. Type A is never lent.
    pub fn loan_days(&self, book_type: BookType) -> Option<i64> {
        match book_type {
            BookType::A => None,
            BookType::B => Some(self.loan_days_b),
            BookType::C => Some(self.loan_days_c),
        }
    }

    /// Clamp a credit value into the allowed range.
    pub fn clamp_credit(&self, credit: i32) -> i32 {
        credit.clamp(self.min_credit, self.max_credit)
    }

    /// Whether `credit` is enough to read a title of `book_type`.
    pub fn may_read(&self, book_type: BookType, credit: i32) -> bool {
        match book_type {
            BookType::A => credit >= self.read_a_min_credit,
            BookType::B | BookType::C => credit > self.read_floor_credit,
        }
    }
}
