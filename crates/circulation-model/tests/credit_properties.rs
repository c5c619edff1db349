//! Property-based tests for the library model.
//!
//! Arbitrary sequences of eligible requests are applied to a small library;
//! credit must stay clamped and the bookkeeping must stay consistent.

use chrono::{Duration, NaiveDate};
use circulation_model::{LibrarySystem, Location};
use proptest::prelude::*;

const STUDENTS: [&str; 3] = ["23370001", "23370002", "23370003"];
const ISBNS: [&str; 4] = ["A-0001", "B-0001", "B-0002", "C-0001"];

#[derive(Debug, Clone)]
enum Step {
    NextDay(i64),
    Close,
    Borrow(usize, usize),
    Return(usize),
    Read(usize, usize),
    Restore(usize),
    Order(usize, usize),
    Reshelve,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        2 => (1i64..40).prop_map(Step::NextDay),
        1 => Just(Step::Close),
        4 => (0..STUDENTS.len(), 0..ISBNS.len()).prop_map(|(s, i)| Step::Borrow(s, i)),
        3 => (0..STUDENTS.len()).prop_map(Step::Return),
        3 => (0..STUDENTS.len(), 0..ISBNS.len()).prop_map(|(s, i)| Step::Read(s, i)),
        2 => (0..STUDENTS.len()).prop_map(Step::Restore),
        1 => (0..STUDENTS.len(), 0..ISBNS.len()).prop_map(|(s, i)| Step::Order(s, i)),
        2 => Just(Step::Reshelve),
    ]
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn apply(library: &mut LibrarySystem, step: &Step) {
    let today = library.today().unwrap();
    match *step {
        Step::NextDay(days) => library.apply_open(today + Duration::days(days)),
        Step::Close => library.apply_close(today),
        Step::Borrow(s, i) => {
            let (student, isbn) = (STUDENTS[s], ISBNS[i]);
            if library.can_borrow(student, isbn).is_ok() {
                let copy = library.shelved_copies(isbn).next().unwrap().to_owned();
                library.apply_borrow(student, &copy).unwrap();
            }
        },
        Step::Return(s) => {
            let student = STUDENTS[s];
            let loan = library
                .student(student)
                .and_then(|st| st.loans().next().map(|loan| loan.copy.clone()));
            if let Some(copy) = loan {
                library.apply_return(student, &copy).unwrap();
            }
        },
        Step::Read(s, i) => {
            let (student, isbn) = (STUDENTS[s], ISBNS[i]);
            if library.can_read(student, isbn).is_ok() {
                let copy = library.shelved_copies(isbn).next().unwrap().to_owned();
                library.apply_read(student, &copy).unwrap();
            }
        },
        Step::Restore(s) => {
            let student = STUDENTS[s];
            let reading =
                library.student(student).and_then(|st| st.reading_today().map(str::to_owned));
            if let Some(copy) = reading.filter(|copy| library.can_restore(student, copy).is_ok()) {
                library.apply_restore(student, &copy).unwrap();
            }
        },
        Step::Order(s, i) => {
            let (student, isbn) = (STUDENTS[s], ISBNS[i]);
            if library.can_order(student, isbn).is_ok() {
                library.apply_order(student, isbn);
            }
        },
        Step::Reshelve => {
            let idle: Vec<(String, Location)> = library
                .copies()
                .filter(|c| {
                    matches!(c.location(), Location::BorrowReturnOffice | Location::ReadingRoom)
                })
                .map(|c| (c.id().to_owned(), c.location()))
                .collect();
            for (copy, from) in idle {
                library.apply_tidy_move(&copy, from, Location::Bookshelf).unwrap();
            }
        },
    }
}

proptest! {
    /// Credit never leaves [0, 180] whatever the request mix.
    #[test]
    fn prop_credit_stays_clamped(steps in prop::collection::vec(step_strategy(), 0..80)) {
        let mut library = LibrarySystem::default();
        library.initialize(["A-0001 1", "B-0001 2", "B-0002 1", "C-0001 2"]).unwrap();
        library.apply_open(start());

        for step in &steps {
            apply(&mut library, step);
            for student in library.students() {
                prop_assert!(
                    (0..=180).contains(&student.credit()),
                    "credit {} out of range after {:?}", student.credit(), step
                );
            }
        }
    }

    /// The shelf index mirrors copy locations and loans mirror holders.
    #[test]
    fn prop_bookkeeping_consistent(steps in prop::collection::vec(step_strategy(), 0..80)) {
        let mut library = LibrarySystem::default();
        library.initialize(["A-0001 1", "B-0001 2", "B-0002 1", "C-0001 2"]).unwrap();
        library.apply_open(start());

        for step in &steps {
            apply(&mut library, step);

            let indexed: Vec<&str> = library.shelf_index().map(|(_, copy)| copy).collect();
            let shelved: Vec<&str> = library
                .copies()
                .filter(|c| c.location().is_shelf())
                .map(|c| c.id())
                .collect();
            let mut indexed_sorted = indexed.clone();
            indexed_sorted.sort_unstable();
            prop_assert_eq!(indexed_sorted, shelved, "after {:?}", step);

            for student in library.students() {
                for loan in student.loans() {
                    let copy = library.copy(&loan.copy).unwrap();
                    prop_assert_eq!(copy.location(), Location::User);
                    prop_assert_eq!(copy.holder(), Some(student.id()));
                }
            }
            for copy in library.copies_at(Location::User) {
                let holder = library.student(copy.holder().unwrap()).unwrap();
                prop_assert!(holder.loans().any(|loan| loan.copy == copy.id()));
            }
        }
    }

    /// Penalties are charged once per day regardless of how the calendar is
    /// walked.
    #[test]
    fn prop_advance_is_path_independent(split in 1i64..60, total in 60i64..120) {
        let mut direct = LibrarySystem::default();
        direct.initialize(["B-0001 1"]).unwrap();
        direct.apply_open(start());
        direct.apply_borrow(STUDENTS[0], "B-0001-01").unwrap();
        let mut stepped = direct.clone();

        direct.advance_time_to(start() + Duration::days(total));
        stepped.advance_time_to(start() + Duration::days(split));
        stepped.advance_time_to(start() + Duration::days(split));
        stepped.advance_time_to(start() + Duration::days(total));

        prop_assert_eq!(direct.credit_of(STUDENTS[0]), stepped.credit_of(STUDENTS[0]));
    }
}
