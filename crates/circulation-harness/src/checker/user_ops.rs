//! Borrow, return, order, pick, read and restore responses.

use chrono::NaiveDate;
use circulation_model::{Eligibility, LibrarySystem, is_copy_id};
use circulation_proto::{Request, Status, UserOpLine};

use super::{Verdict, Violation, ViolationKind};

pub(super) fn check(
    library: &mut LibrarySystem,
    date: NaiveDate,
    request: &Request,
    frame: &[String],
) -> Verdict {
    let [line] = frame else {
        return Err(Violation::new(ViolationKind::Framing, "expected a single response line"));
    };
    let (Some(student), Some(verb)) = (request.student(), request.verb()) else {
        return Err(Violation::new(ViolationKind::Internal, "not a user action"));
    };
    let op = UserOpLine::parse(line).map_err(|e| Violation::format(&e).at_line(line))?;

    if op.date != date {
        return Err(Violation::mismatch(format!("date {} does not echo {date}", op.date)).at_line(line));
    }
    if op.student != student {
        return Err(Violation::mismatch(format!("student {} does not echo {student}", op.student))
            .at_line(line));
    }
    if op.verb != verb {
        return Err(Violation::mismatch(format!("action {} does not echo {verb}", op.verb)).at_line(line));
    }

    let verdict = match request {
        Request::Borrow { isbn, .. } => borrow(library, student, isbn, &op),
        Request::Return { copy, .. } => give_back(library, student, copy, &op),
        Request::Order { isbn, .. } => order(library, student, isbn, &op),
        Request::Pick { isbn, .. } => pick(library, student, isbn, &op),
        Request::Read { isbn, .. } => read(library, student, isbn, &op),
        Request::Restore { copy, .. } => restore(library, student, copy, &op),
        Request::Open | Request::Close | Request::QueryTrace { .. } | Request::QueryCredit { .. } => {
            Err(Violation::new(ViolationKind::Internal, "not a user action"))
        },
    };
    verdict.map_err(|v| v.at_line(line))
}

fn borrow(library: &mut LibrarySystem, student: &str, isbn: &str, op: &UserOpLine) -> Verdict {
    match op.status {
        Status::Reject => rejection(op, isbn, library.can_borrow(student, isbn), "borrow"),
        Status::Accept => {
            let copy = granted_copy(op)?;
            library
                .can_borrow_copy(student, isbn, copy)
                .map_err(|why| Violation::illegal(format!("borrow of {copy} granted, but {why}")))?;
            library.apply_borrow(student, copy).map_err(|e| Violation::internal(&e))
        },
    }
}

fn give_back(library: &mut LibrarySystem, student: &str, copy: &str, op: &UserOpLine) -> Verdict {
    echo_target(op, copy)?;
    if op.status == Status::Reject {
        return Err(Violation::illegal(format!("return of {copy} refused; returns are always accepted")));
    }
    library
        .can_return(student, copy)
        .map_err(|why| Violation::illegal(format!("return of {copy} accepted, but {why}")))?;
    let overdue = library.apply_return(student, copy).map_err(|e| Violation::internal(&e))?;
    if op.overdue != Some(overdue) {
        let expected = if overdue { "overdue" } else { "not overdue" };
        return Err(Violation::mismatch(format!("return of {copy} should be reported {expected}")));
    }
    Ok(())
}

fn order(library: &mut LibrarySystem, student: &str, isbn: &str, op: &UserOpLine) -> Verdict {
    echo_target(op, isbn)?;
    match op.status {
        Status::Reject => rejection(op, isbn, library.can_order(student, isbn), "order"),
        Status::Accept => {
            library
                .can_order(student, isbn)
                .map_err(|why| Violation::illegal(format!("order of {isbn} granted, but {why}")))?;
            library.apply_order(student, isbn);
            Ok(())
        },
    }
}

fn pick(library: &mut LibrarySystem, student: &str, isbn: &str, op: &UserOpLine) -> Verdict {
    match op.status {
        Status::Reject => rejection(op, isbn, library.can_pick(student, isbn), "pickup"),
        Status::Accept => {
            let copy = granted_copy(op)?;
            library
                .can_pick(student, isbn)
                .map_err(|why| Violation::illegal(format!("pickup of {isbn} granted, but {why}")))?;
            let reserved = library.student(student).and_then(|s| s.order().reserved()).map(|(c, _)| c);
            if reserved != Some(copy) {
                return Err(Violation::illegal(format!(
                    "handed out {copy}, but the copy reserved for {student} is {}",
                    reserved.unwrap_or("none")
                )));
            }
            library.apply_pick(student, copy).map_err(|e| Violation::internal(&e))
        },
    }
}

fn read(library: &mut LibrarySystem, student: &str, isbn: &str, op: &UserOpLine) -> Verdict {
    match op.status {
        Status::Reject => rejection(op, isbn, library.can_read(student, isbn), "read"),
        Status::Accept => {
            let copy = granted_copy(op)?;
            library
                .can_read_copy(student, isbn, copy)
                .map_err(|why| Violation::illegal(format!("reading of {copy} granted, but {why}")))?;
            library.apply_read(student, copy).map_err(|e| Violation::internal(&e))
        },
    }
}

fn restore(library: &mut LibrarySystem, student: &str, copy: &str, op: &UserOpLine) -> Verdict {
    echo_target(op, copy)?;
    let allowed = library.can_restore(student, copy);
    match op.status {
        Status::Reject if allowed.is_ok() => {
            Err(Violation::illegal(format!("restore of {copy} refused, but {student} is reading it")))
        },
        Status::Reject => Ok(()),
        Status::Accept => {
            allowed.map_err(|why| Violation::illegal(format!("restore of {copy} accepted, but {why}")))?;
            library.apply_restore(student, copy).map(drop).map_err(|e| Violation::internal(&e))
        },
    }
}

/// A refusal must echo the ISBN and be backed by the model.
fn rejection(op: &UserOpLine, isbn: &str, eligibility: Eligibility, action: &str) -> Verdict {
    echo_target(op, isbn)?;
    match eligibility {
        Err(_) => Ok(()),
        Ok(()) => Err(Violation::illegal(format!("{action} of {isbn} refused, but it should be granted"))),
    }
}

fn echo_target(op: &UserOpLine, expected: &str) -> Verdict {
    if op.target == expected {
        Ok(())
    } else {
        Err(Violation::mismatch(format!("target {} does not echo {expected}", op.target)))
    }
}

fn granted_copy(op: &UserOpLine) -> Result<&str, Violation> {
    if is_copy_id(&op.target) {
        Ok(&op.target)
    } else {
        Err(Violation::new(
            ViolationKind::Format,
            format!("granted {} must name a copy id, got {}", op.verb, op.target),
        ))
    }
}
