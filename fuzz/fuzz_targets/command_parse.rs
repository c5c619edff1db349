//! Fuzz target for Command parsing
//!
//! Arbitrary text through the command grammar. Looks for:
//! - Panics on odd dates, ids or whitespace
//! - Commands whose printed form parses to something else
//!
//! Parsing should NEVER panic, and every accepted command must survive
//! printing and re-parsing unchanged.

#![no_main]

use circulation_proto::Command;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(command) = text.parse::<Command>() {
        let printed = command.to_string();
        let reparsed: Command = printed.parse().expect("printed command must parse");
        assert_eq!(reparsed, command);
    }
});
