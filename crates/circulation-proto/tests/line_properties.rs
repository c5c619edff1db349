//! Property-based tests for the line protocol.
//!
//! Encoded lines must decode to the same value, and decoders must return
//! errors rather than panic on arbitrary text.

use chrono::{Duration, NaiveDate};
use circulation_model::Location;
use circulation_proto::{
    Command, CreditLine, Request, ResponseShape, Status, TidyMove, TraceEntry, TraceHeader,
    UserOpLine, Verb,
};
use proptest::prelude::*;

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|d| NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Duration::days(d))
}

fn student_strategy() -> impl Strategy<Value = String> {
    (1u32..75).prop_map(|n| format!("2337{n:04}"))
}

fn isbn_strategy() -> impl Strategy<Value = String> {
    (prop::sample::select(vec!['A', 'B', 'C']), 0u32..10000)
        .prop_map(|(t, n)| format!("{t}-{n:04}"))
}

fn copy_strategy() -> impl Strategy<Value = String> {
    (isbn_strategy(), 1u32..100).prop_map(|(isbn, n)| format!("{isbn}-{n:02}"))
}

fn request_strategy() -> impl Strategy<Value = Request> {
    prop_oneof![
        Just(Request::Open),
        Just(Request::Close),
        (student_strategy(), isbn_strategy())
            .prop_map(|(student, isbn)| Request::Borrow { student, isbn }),
        (student_strategy(), copy_strategy())
            .prop_map(|(student, copy)| Request::Return { student, copy }),
        (student_strategy(), isbn_strategy())
            .prop_map(|(student, isbn)| Request::Order { student, isbn }),
        (student_strategy(), isbn_strategy())
            .prop_map(|(student, isbn)| Request::Pick { student, isbn }),
        (student_strategy(), isbn_strategy())
            .prop_map(|(student, isbn)| Request::Read { student, isbn }),
        (student_strategy(), copy_strategy())
            .prop_map(|(student, copy)| Request::Restore { student, copy }),
        (student_strategy(), copy_strategy())
            .prop_map(|(student, copy)| Request::QueryTrace { student, copy }),
        student_strategy().prop_map(|student| Request::QueryCredit { student }),
    ]
}

fn location_strategy() -> impl Strategy<Value = Location> {
    prop::sample::select(Location::ALL.to_vec())
}

proptest! {
    /// Every command decodes to itself.
    #[test]
    fn prop_command_lines_decode(date in date_strategy(), request in request_strategy()) {
        let command = Command::new(date, request);
        let line = command.to_string();
        prop_assert_eq!(line.parse::<Command>(), Ok(command));
    }

    /// User-operation lines decode to themselves, returns included.
    #[test]
    fn prop_user_op_lines_decode(
        date in date_strategy(),
        student in student_strategy(),
        target in copy_strategy(),
        accept in any::<bool>(),
        verb in prop::sample::select(vec![
            Verb::Borrowed, Verb::Returned, Verb::Ordered, Verb::Picked, Verb::Read, Verb::Restored,
        ]),
        overdue in any::<bool>(),
    ) {
        let line = UserOpLine {
            date,
            status: if accept { Status::Accept } else { Status::Reject },
            student,
            verb,
            target,
            overdue: (verb == Verb::Returned).then_some(overdue),
        };
        prop_assert_eq!(UserOpLine::parse(&line.to_string()), Ok(line));
    }

    /// Trace and tidy lines decode to themselves.
    #[test]
    fn prop_trace_and_tidy_lines_decode(
        date in date_strategy(),
        copy in copy_strategy(),
        seq in 1usize..500,
        from in location_strategy(),
        to in location_strategy(),
        student in student_strategy(),
    ) {
        let header = TraceHeader { date, copy: copy.clone(), count: seq };
        let framed = header.to_string();
        prop_assert_eq!(TraceHeader::parse(&framed), Ok(header));
        prop_assert_eq!(ResponseShape::Trace.frame_len(&framed), Ok(seq + 1));

        let entry = TraceEntry { seq, date, from, to };
        prop_assert_eq!(TraceEntry::parse(&entry.to_string()), Ok(entry));

        if from.is_tidy_location() && to.is_tidy_location() {
            let student = (to == Location::AppointmentOffice).then_some(student);
            let mv = TidyMove { date, copy, from, to, student };
            prop_assert_eq!(TidyMove::parse(&mv.to_string()), Ok(mv));
        }
    }

    /// Decoders never panic on arbitrary text.
    #[test]
    fn prop_decoders_total(line in "\\PC{0,80}") {
        let _ = line.parse::<Command>();
        let _ = UserOpLine::parse(&line);
        let _ = CreditLine::parse(&line);
        let _ = TraceHeader::parse(&line);
        let _ = TraceEntry::parse(&line);
        let _ = TidyMove::parse(&line);
        for shape in [ResponseShape::Single, ResponseShape::Tidy, ResponseShape::Trace] {
            let _ = shape.frame_len(&line);
        }
    }
}
