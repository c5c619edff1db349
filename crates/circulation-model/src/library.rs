//! The library model: inventory, students, the calendar and every state
//! transition the circulation rules allow.
//!
//! Transitions are applied only after a response has been judged
//! consistent, so each mutator assumes eligibility was already checked and
//! reports a [`ModelError`] only when the bookkeeping itself cannot support
//! the request.
//!
//! Maps are ordered so that iteration, and therefore seeded command
//! generation, is reproducible.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
    mem,
};

use chrono::{Duration, NaiveDate};
use tracing::{debug, trace};

use crate::{
    copy::{BookCopy, Move, Placement, Reservation},
    error::ModelError,
    rules::LibraryRules,
    student::{Loan, OrderState, Student},
    types::{self, BookType, CopyId, Isbn, Location, StudentId},
};

/// Reference state of the whole library.
#[derive(Debug, Clone, Default)]
pub struct LibrarySystem {
    rules: LibraryRules,
    titles: BTreeMap<Isbn, BookType>,
    copies: BTreeMap<CopyId, BookCopy>,
    students: BTreeMap<StudentId, Student>,
    // ISBN -> copy number -> copy id, for copies on bs or hbs
    shelved: BTreeMap<Isbn, BTreeMap<u32, CopyId>>,
    today: Option<NaiveDate>,
    hot: BTreeSet<Isbn>,
    becoming_hot: BTreeSet<Isbn>,
    last_open: Option<NaiveDate>,
}

impl LibrarySystem {
    /// Empty library under `rules`.
    pub fn new(rules: LibraryRules) -> Self {
        Self { rules, ..Self::default() }
    }

    /// Load the inventory from `<ISBN> <count>` lines.
    ///
    /// Every copy starts on the regular bookshelf. Blank lines and zero
    /// counts are ignored.
    pub fn initialize<I, S>(&mut self, lines: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            let (isbn, count) = parse_inventory_line(line)?;
            self.add_title(isbn, count)?;
        }
        debug!(titles = self.titles.len(), copies = self.copies.len(), "inventory loaded");
        Ok(())
    }

    /// Add `count` copies of a new title.
    pub fn add_title(&mut self, isbn: &str, count: u32) -> Result<(), ModelError> {
        let book_type = BookType::of_isbn(isbn)
            .ok_or_else(|| ModelError::UnknownBookType { isbn: isbn.to_owned() })?;
        if !types::is_isbn(isbn) {
            return Err(ModelError::InvalidInventoryLine { line: isbn.to_owned() });
        }
        if count == 0 {
            return Ok(());
        }
        if self.titles.contains_key(isbn) {
            return Err(ModelError::DuplicateIsbn { isbn: isbn.to_owned() });
        }

        self.titles.insert(isbn.to_owned(), book_type);
        let shelf = self.shelved.entry(isbn.to_owned()).or_default();
        for seq in 1..=count {
            let id = types::copy_id(isbn, seq);
            shelf.insert(seq, id.clone());
            self.copies.insert(id.clone(), BookCopy::new(id, isbn.to_owned(), book_type, seq));
        }
        Ok(())
    }

    // Queries

    /// Rule set in force.
    pub fn rules(&self) -> &LibraryRules {
        &self.rules
    }

    /// Current date, `None` before the first command.
    pub fn today(&self) -> Option<NaiveDate> {
        self.today
    }

    /// Look up a copy.
    pub fn copy(&self, id: &str) -> Option<&BookCopy> {
        self.copies.get(id)
    }

    /// All copies, ordered by id.
    pub fn copies(&self) -> impl Iterator<Item = &BookCopy> {
        self.copies.values()
    }

    /// Copies currently at `location`.
    pub fn copies_at(&self, location: Location) -> impl Iterator<Item = &BookCopy> {
        self.copies.values().filter(move |c| c.location() == location)
    }

    /// Look up a student that has been seen before.
    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.get(id)
    }

    /// Students seen so far, ordered by id.
    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    /// The student's state, or the state a never-seen student would start
    /// with. Never creates the student.
    pub fn student_view(&self, id: &str) -> Cow<'_, Student> {
        match self.students.get(id) {
            Some(student) => Cow::Borrowed(student),
            None => Cow::Owned(Student::new(id.to_owned(), self.rules.initial_credit)),
        }
    }

    /// Credit of a student, initial credit if never seen.
    pub fn credit_of(&self, id: &str) -> i32 {
        self.students.get(id).map_or(self.rules.initial_credit, Student::credit)
    }

    /// Every ISBN in the inventory.
    pub fn isbns(&self) -> impl Iterator<Item = &str> {
        self.titles.keys().map(String::as_str)
    }

    /// ISBNs with at least one copy on a shelf.
    pub fn shelved_isbns(&self) -> impl Iterator<Item = &str> {
        self.shelved.iter().filter(|(_, shelf)| !shelf.is_empty()).map(|(isbn, _)| isbn.as_str())
    }

    /// Shelved copies of `isbn`, lowest copy number first.
    pub fn shelved_copies(&self, isbn: &str) -> impl Iterator<Item = &str> {
        self.shelved.get(isbn).into_iter().flat_map(|shelf| shelf.values().map(String::as_str))
    }

    /// Whether any copy of `isbn` is on a shelf.
    pub fn has_shelved_copy(&self, isbn: &str) -> bool {
        self.shelved.get(isbn).is_some_and(|shelf| !shelf.is_empty())
    }

    /// Whether `isbn` is hot for the current open period.
    pub fn is_hot(&self, isbn: &str) -> bool {
        self.hot.contains(isbn)
    }

    /// Movement history of a copy; empty for unknown copies.
    pub fn trace(&self, copy: &str) -> &[Move] {
        self.copies.get(copy).map(BookCopy::trace).unwrap_or_default()
    }

    /// Shelf index entries as `(isbn, copy)` pairs.
    pub fn shelf_index(&self) -> impl Iterator<Item = (&str, &str)> {
        self.shelved.iter().flat_map(|(isbn, shelf)| {
            shelf.values().map(move |copy| (isbn.as_str(), copy.as_str()))
        })
    }

    // Calendar

    /// Move the calendar forward to `date`.
    ///
    /// The first call only starts the clock. Afterwards every day in
    /// `(today, date]` is processed once, in order, so penalties compound
    /// day by day. Dates not after `today` are ignored.
    pub fn advance_time_to(&mut self, date: NaiveDate) {
        let Some(mut day) = self.today else {
            self.today = Some(date);
            return;
        };
        if date <= day {
            return;
        }
        while let Some(next) = day.succ_opt().filter(|next| *next <= date) {
            self.accrue_penalties(next);
            day = next;
        }
        self.today = Some(date);
    }

    fn accrue_penalties(&mut self, day: NaiveDate) {
        let mut penalties: Vec<(StudentId, i32)> = Vec::new();
        for student in self.students.values() {
            for loan in student.loans() {
                if loan.due == day {
                    penalties.push((student.id().to_owned(), self.rules.first_overdue_penalty));
                } else if loan.due < day {
                    penalties.push((student.id().to_owned(), self.rules.daily_overdue_penalty));
                }
            }
        }
        // The deadline day itself still allows pickup; the penalty lands once
        // it is over and the copy is still waiting.
        for reservation in self.copies.values().filter_map(BookCopy::reservation) {
            if reservation.deadline.succ_opt() == Some(day) {
                penalties.push((reservation.student.clone(), self.rules.unpicked_order_penalty));
            }
        }
        for (student, delta) in penalties {
            trace!(%day, %student, delta, "daily penalty");
            self.adjust_credit(&student, delta);
        }
    }

    /// Library opens on `date`.
    ///
    /// The first OPEN of a date promotes titles borrowed or read during the
    /// previous open period to hot. Reading sessions never carry over.
    pub fn apply_open(&mut self, date: NaiveDate) {
        self.advance_time_to(date);
        if self.last_open != Some(date) {
            self.hot = mem::take(&mut self.becoming_hot);
            self.last_open = Some(date);
        }
        for student in self.students.values_mut() {
            student.reset_daily();
        }
    }

    /// Library closes on `date`; unrestored readings are penalised.
    pub fn apply_close(&mut self, date: NaiveDate) {
        self.advance_time_to(date);
        let unrestored: Vec<StudentId> = self
            .students
            .values()
            .filter(|s| s.reading_today().is_some())
            .map(|s| s.id().to_owned())
            .collect();
        for student in unrestored {
            self.adjust_credit(&student, self.rules.unrestored_read_penalty);
        }
        for student in self.students.values_mut() {
            student.reset_daily();
        }
    }

    // Transitions

    /// Lend a shelved copy to `student`.
    pub fn apply_borrow(&mut self, student: &str, copy: &str) -> Result<(), ModelError> {
        let today = self.clock()?;
        let entry = self.copy_or_err(copy)?;
        if !entry.location().is_shelf() {
            return Err(wrong_location(entry, "borrow"));
        }
        let (isbn, book_type) = (entry.isbn().to_owned(), entry.book_type());
        let days = self.loan_days(copy, book_type)?;

        self.place(copy, Placement::User(student.to_owned()))?;
        self.lend(student, copy, &isbn, book_type, today + Duration::days(days));
        self.becoming_hot.insert(isbn);
        Ok(())
    }

    /// Take a lent copy back at the borrow/return office.
    ///
    /// Returns whether the copy came back overdue. On-time returns earn
    /// credit.
    pub fn apply_return(&mut self, student: &str, copy: &str) -> Result<bool, ModelError> {
        let today = self.clock()?;
        let entry = self.copy_or_err(copy)?;
        if entry.location() != Location::User || entry.holder() != Some(student) {
            return Err(ModelError::NotHeld { copy: copy.to_owned(), student: student.to_owned() });
        }
        let due = self
            .students
            .get(student)
            .and_then(|s| s.loans().find(|loan| loan.copy == copy).map(|loan| loan.due));
        let overdue = due.is_some_and(|due| today > due);

        if !overdue {
            self.adjust_credit(student, self.rules.on_time_return_bonus);
        }
        self.place(copy, Placement::BorrowReturnOffice)?;
        Ok(overdue)
    }

    /// Record an order for `isbn`.
    pub fn apply_order(&mut self, student: &str, isbn: &str) {
        self.student_mut(student).order = OrderState::Pending(isbn.to_owned());
    }

    /// Hand a reserved copy from the appointment office to `student`.
    pub fn apply_pick(&mut self, student: &str, copy: &str) -> Result<(), ModelError> {
        let today = self.clock()?;
        let entry = self.copy_or_err(copy)?;
        if entry.location() != Location::AppointmentOffice {
            return Err(wrong_location(entry, "pick up"));
        }
        let (isbn, book_type) = (entry.isbn().to_owned(), entry.book_type());
        let days = self.loan_days(copy, book_type)?;

        self.student_mut(student).order = OrderState::Idle;
        self.place(copy, Placement::User(student.to_owned()))?;
        self.lend(student, copy, &isbn, book_type, today + Duration::days(days));
        Ok(())
    }

    /// Take a shelved copy into the reading room.
    pub fn apply_read(&mut self, student: &str, copy: &str) -> Result<(), ModelError> {
        let entry = self.copy_or_err(copy)?;
        if !entry.location().is_shelf() {
            return Err(wrong_location(entry, "read"));
        }
        let isbn = entry.isbn().to_owned();

        self.place(copy, Placement::ReadingRoom(Some(student.to_owned())))?;
        self.student_mut(student).start_reading(copy.to_owned());
        self.becoming_hot.insert(isbn);
        Ok(())
    }

    /// Bring a reading-room copy to the borrow/return office.
    ///
    /// Returns whether the same-day restore bonus was granted.
    pub fn apply_restore(&mut self, student: &str, copy: &str) -> Result<bool, ModelError> {
        let entry = self.copy_or_err(copy)?;
        if entry.location() != Location::ReadingRoom {
            return Err(wrong_location(entry, "restore"));
        }
        self.place(copy, Placement::BorrowReturnOffice)?;

        let reader = self.student_mut(student);
        if reader.reading_today() != Some(copy) {
            return Ok(false);
        }
        reader.reading_today = None;
        self.adjust_credit(student, self.rules.same_day_restore_bonus);
        Ok(true)
    }

    /// Reserve an appointment-office copy for `student` until `deadline`.
    pub fn apply_reservation_at_ao(
        &mut self,
        copy: &str,
        student: &str,
        deadline: NaiveDate,
    ) -> Result<(), ModelError> {
        let entry = self
            .copies
            .get_mut(copy)
            .ok_or_else(|| ModelError::UnknownCopy { copy: copy.to_owned() })?;
        if !entry.reserve(Reservation { student: student.to_owned(), deadline }) {
            return Err(wrong_location(entry, "reserve"));
        }
        self.student_mut(student).order = OrderState::Reserved { copy: copy.to_owned(), deadline };
        Ok(())
    }

    /// Drop the reservation on an appointment-office copy, releasing the
    /// student's order if it pointed at this copy.
    pub fn clear_expired_reservation(&mut self, copy: &str) -> Result<(), ModelError> {
        let entry = self
            .copies
            .get_mut(copy)
            .ok_or_else(|| ModelError::UnknownCopy { copy: copy.to_owned() })?;
        let Some(reservation) = entry.reservation().cloned() else {
            return Ok(());
        };
        entry.clear_reservation();

        if let Some(student) = self.students.get_mut(&reservation.student) {
            if student.order.reserved().is_some_and(|(reserved, _)| reserved == copy) {
                student.order = OrderState::Idle;
            }
        }
        Ok(())
    }

    /// Library-initiated relocation of a copy between internal locations.
    pub fn apply_tidy_move(
        &mut self,
        copy: &str,
        from: Location,
        to: Location,
    ) -> Result<(), ModelError> {
        let entry = self.copy_or_err(copy)?;
        if entry.location() != from {
            return Err(wrong_location(entry, "move"));
        }
        let placement =
            Placement::unattended(to).ok_or(ModelError::NotTidyLocation { location: to })?;
        if from == Location::AppointmentOffice {
            self.clear_expired_reservation(copy)?;
        }
        self.place(copy, placement)
    }

    // Internals

    fn clock(&self) -> Result<NaiveDate, ModelError> {
        self.today.ok_or(ModelError::ClockNotStarted)
    }

    fn copy_or_err(&self, copy: &str) -> Result<&BookCopy, ModelError> {
        self.copies.get(copy).ok_or_else(|| ModelError::UnknownCopy { copy: copy.to_owned() })
    }

    fn loan_days(&self, copy: &str, book_type: BookType) -> Result<i64, ModelError> {
        self.rules
            .loan_days(book_type)
            .ok_or_else(|| ModelError::NotLendable { copy: copy.to_owned() })
    }

    fn student_mut(&mut self, id: &str) -> &mut Student {
        let credit = self.rules.initial_credit;
        self.students.entry(id.to_owned()).or_insert_with(|| Student::new(id.to_owned(), credit))
    }

    fn adjust_credit(&mut self, id: &str, delta: i32) {
        let rules = &self.rules;
        let student = self
            .students
            .entry(id.to_owned())
            .or_insert_with(|| Student::new(id.to_owned(), rules.initial_credit));
        let before = student.credit;
        student.credit = rules.clamp_credit(before + delta);
        trace!(student = id, before, after = student.credit, "credit adjusted");
    }

    fn lend(&mut self, student: &str, copy: &str, isbn: &str, book_type: BookType, due: NaiveDate) {
        let loan = Loan { copy: copy.to_owned(), due };
        let holder = self.student_mut(student);
        match book_type {
            BookType::B => holder.held_b = Some(loan),
            BookType::C => {
                holder.held_c.insert(isbn.to_owned(), loan);
            },
            BookType::A => {},
        }
    }

    /// Relocate a copy, keeping the shelf index and loan records in step.
    fn place(&mut self, copy: &str, placement: Placement) -> Result<(), ModelError> {
        let date = self.clock()?;
        let entry = self
            .copies
            .get_mut(copy)
            .ok_or_else(|| ModelError::UnknownCopy { copy: copy.to_owned() })?;
        let from = entry.location();
        let previous_holder = match entry.placement() {
            Placement::User(holder) => Some(holder.clone()),
            _ => None,
        };
        let (isbn, seq) = (entry.isbn().to_owned(), entry.seq());
        entry.relocate(date, placement);
        let to = entry.location();

        if from.is_shelf() && !to.is_shelf() {
            if let Some(shelf) = self.shelved.get_mut(&isbn) {
                shelf.remove(&seq);
            }
        }
        if to.is_shelf() && !from.is_shelf() {
            self.shelved.entry(isbn.clone()).or_default().insert(seq, copy.to_owned());
        }
        if to != Location::User {
            if let Some(student) = previous_holder.and_then(|h| self.students.get_mut(&h)) {
                if student.held_b.as_ref().is_some_and(|loan| loan.copy == copy) {
                    student.held_b = None;
                }
                if student.held_c.get(&isbn).is_some_and(|loan| loan.copy == copy) {
                    student.held_c.remove(&isbn);
                }
            }
        }
        Ok(())
    }
}

fn wrong_location(copy: &BookCopy, action: &'static str) -> ModelError {
    ModelError::WrongLocation { copy: copy.id().to_owned(), actual: copy.location(), action }
}

fn parse_inventory_line(line: &str) -> Result<(&str, u32), ModelError> {
    let invalid = || ModelError::InvalidInventoryLine { line: line.to_owned() };
    let mut parts = line.split_whitespace();
    let (Some(isbn), Some(count), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let count = count.parse().map_err(|_| invalid())?;
    Ok((isbn, count))
}
