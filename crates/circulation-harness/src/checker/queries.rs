//! Credit and trace query responses.

use chrono::NaiveDate;
use circulation_model::LibrarySystem;
use circulation_proto::{CreditLine, TraceEntry, TraceHeader};

use super::{Verdict, Violation, ViolationKind};

pub(super) fn credit(library: &LibrarySystem, date: NaiveDate, student: &str, frame: &[String]) -> Verdict {
    let [line] = frame else {
        return Err(Violation::new(ViolationKind::Framing, "expected a single response line"));
    };
    let answer = CreditLine::parse(line).map_err(|e| Violation::format(&e).at_line(line))?;
    let expected = i64::from(library.credit_of(student));

    let mismatch = if answer.date != date {
        Some(format!("date {} does not echo {date}", answer.date))
    } else if answer.student != student {
        Some(format!("student {} does not echo {student}", answer.student))
    } else if answer.credit != expected {
        Some(format!("credit of {student} is {expected}, reported {}", answer.credit))
    } else {
        None
    };
    match mismatch {
        Some(message) => Err(Violation::mismatch(message).at_line(line)),
        None => Ok(()),
    }
}

pub(super) fn trace(library: &LibrarySystem, date: NaiveDate, copy: &str, frame: &[String]) -> Verdict {
    let Some((first, entries)) = frame.split_first() else {
        return Err(Violation::new(ViolationKind::Framing, "missing trace header"));
    };
    let header = TraceHeader::parse(first).map_err(|e| Violation::format(&e).at_line(first))?;
    if header.date != date {
        return Err(Violation::mismatch(format!("date {} does not echo {date}", header.date)).at_line(first));
    }
    if header.copy != copy {
        return Err(Violation::mismatch(format!("copy {} does not echo {copy}", header.copy)).at_line(first));
    }

    let expected = library.trace(copy);
    if header.count != expected.len() {
        return Err(Violation::mismatch(format!(
            "{copy} has moved {} times, reported {}",
            expected.len(),
            header.count
        ))
        .at_line(first));
    }

    for (seq, (line, mv)) in (1..).zip(entries.iter().zip(expected)) {
        let entry = TraceEntry::parse(line).map_err(|e| Violation::format(&e).at_line(line))?;
        let want = TraceEntry { seq, date: mv.date, from: mv.from, to: mv.to };
        if entry != want {
            return Err(Violation::mismatch(format!("expected trace entry `{want}`")).at_line(line));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, n).unwrap()
    }

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn unknown_copy_has_empty_trace() {
        let library = LibrarySystem::default();
        let frame = lines(&["[2025-01-01] A-0009-01 moving trace: 0"]);
        assert_eq!(trace(&library, day(1), "A-0009-01", &frame), Ok(()));
    }

    #[test]
    fn trace_entries_must_match_history() {
        let mut library = LibrarySystem::default();
        library.initialize(["B-0001 1"]).unwrap();
        library.apply_open(day(1));
        library.apply_borrow("23370001", "B-0001-01").unwrap();
        library.advance_time_to(day(3));
        library.apply_return("23370001", "B-0001-01").unwrap();

        let good = lines(&[
            "[2025-01-03] B-0001-01 moving trace: 2",
            "1 [2025-01-01] from bs to user",
            "2 [2025-01-03] from user to bro",
        ]);
        assert_eq!(trace(&library, day(3), "B-0001-01", &good), Ok(()));

        let mut swapped = good.clone();
        swapped[2] = "2 [2025-01-02] from user to bro".into();
        let violation = trace(&library, day(3), "B-0001-01", &swapped).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::Mismatch);

        let short = lines(&["[2025-01-03] B-0001-01 moving trace: 1", "1 [2025-01-01] from bs to user"]);
        assert!(trace(&library, day(3), "B-0001-01", &short).is_err());
    }

    #[test]
    fn unseen_student_has_initial_credit() {
        let library = LibrarySystem::default();
        let frame = lines(&["[2025-01-01] 23370042 100"]);
        assert_eq!(credit(&library, day(1), "23370042", &frame), Ok(()));
        let frame = lines(&["[2025-01-01] 23370042 99"]);
        assert!(credit(&library, day(1), "23370042", &frame).is_err());
    }
}
