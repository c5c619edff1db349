//! Per-student circulation state.

use std::{cell::Cell, collections::BTreeMap};

use chrono::NaiveDate;

use crate::types::{CopyId, Isbn, StudentId};

/// A lent copy and its due date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    /// The lent copy.
    pub copy: CopyId,
    /// Last day the copy can be returned without being overdue.
    pub due: NaiveDate,
}

/// Ordering state of a student.
///
/// A student has at most one order in flight: either still waiting for the
/// library to set a copy aside, or already waiting at the appointment office.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OrderState {
    /// Nothing ordered.
    #[default]
    Idle,
    /// Ordered, no copy set aside yet.
    Pending(Isbn),
    /// A copy waits at the appointment office.
    Reserved {
        /// The reserved copy.
        copy: CopyId,
        /// Last pickup day.
        deadline: NaiveDate,
    },
}

impl OrderState {
    /// Whether an order is pending or reserved.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// ISBN of a pending order.
    pub fn pending_isbn(&self) -> Option<&str> {
        match self {
            Self::Pending(isbn) => Some(isbn.as_str()),
            _ => None,
        }
    }

    /// Reserved copy and deadline.
    pub fn reserved(&self) -> Option<(&str, NaiveDate)> {
        match self {
            Self::Reserved { copy, deadline } => Some((copy.as_str(), *deadline)),
            _ => None,
        }
    }
}

/// A library patron.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    id: StudentId,
    pub(crate) credit: i32,
    pub(crate) held_b: Option<Loan>,
    pub(crate) held_c: BTreeMap<Isbn, Loan>,
    pub(crate) order: OrderState,
    pub(crate) reading_today: Option<CopyId>,
    // Advisory, written by command generation through a shared borrow.
    restore_generated: Cell<bool>,
}

impl Student {
    pub(crate) fn new(id: StudentId, credit: i32) -> Self {
        Self {
            id,
            credit,
            held_b: None,
            held_c: BTreeMap::new(),
            order: OrderState::Idle,
            reading_today: None,
            restore_generated: Cell::new(false),
        }
    }

    /// Student id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current credit score.
    pub fn credit(&self) -> i32 {
        self.credit
    }

    /// Held type-B loan.
    pub fn held_b(&self) -> Option<&Loan> {
        self.held_b.as_ref()
    }

    /// Held type-C loans keyed by ISBN.
    pub fn held_c(&self) -> &BTreeMap<Isbn, Loan> {
        &self.held_c
    }

    /// Every held loan, B first.
    pub fn loans(&self) -> impl Iterator<Item = &Loan> {
        self.held_b.iter().chain(self.held_c.values())
    }

    /// Order state.
    pub fn order(&self) -> &OrderState {
        &self.order
    }

    /// Copy read in the reading room today and not yet restored.
    pub fn reading_today(&self) -> Option<&str> {
        self.reading_today.as_deref()
    }

    /// Whether a restore command was already generated for today's reading.
    pub fn restore_generated(&self) -> bool {
        self.restore_generated.get()
    }

    /// Record that a restore command was generated for today's reading.
    ///
    /// Purely advisory: it only keeps command generation from issuing the
    /// same restore twice and never influences judgement.
    pub fn mark_restore_generated(&self) {
        self.restore_generated.set(true);
    }

    pub(crate) fn reset_daily(&mut self) {
        self.reading_today = None;
        self.restore_generated.set(false);
    }

    pub(crate) fn start_reading(&mut self, copy: CopyId) {
        self.reading_today = Some(copy);
        self.restore_generated.set(false);
    }
}
