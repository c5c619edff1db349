//! Fuzz target for response line decoding
//!
//! Every response decoder and the frame length calculation get the same
//! arbitrary line. Looks for:
//! - Panics in bracketed-date or count parsing
//! - Overflow when a count line claims a huge number of follow-up lines
//!
//! Decoding should NEVER panic. Invalid lines return an error.

#![no_main]

use circulation_proto::{
    CreditLine, ResponseShape, TidyMove, TraceEntry, TraceHeader, UserOpLine, parse_count,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    let _ = UserOpLine::parse(line);
    let _ = CreditLine::parse(line);
    let _ = TraceHeader::parse(line);
    let _ = TraceEntry::parse(line);
    let _ = TidyMove::parse(line);
    let _ = parse_count(line);

    for shape in [ResponseShape::Single, ResponseShape::Tidy, ResponseShape::Trace] {
        if let Ok(len) = shape.frame_len(line) {
            assert!(len >= 1);
        }
    }
});
