//! Offline checking of recorded transcripts.
//!
//! A run with transcripts enabled leaves an input log (handshake followed by
//! every command) and an output log (every line the simulator printed).
//! [`check_transcript`] judges the pair after the fact as a single batch.

use circulation_model::{LibraryRules, LibrarySystem};
use circulation_proto::{Command, Inventory};
use tracing::debug;

use crate::{checker::Checker, error::ReplayError};

/// Check a recorded output log against its input log.
///
/// Blank input lines are skipped.
pub fn check_transcript<S: AsRef<str>>(
    input: &[S],
    output: &[String],
    rules: LibraryRules,
) -> Result<(), ReplayError> {
    let (inventory, consumed) = Inventory::parse_handshake(input).map_err(ReplayError::Handshake)?;
    let mut library = LibrarySystem::new(rules);
    library.initialize(inventory.entry_lines()).map_err(ReplayError::Inventory)?;

    let mut commands = Vec::new();
    for (offset, line) in input[consumed..].iter().enumerate() {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        let command: Command = line
            .parse()
            .map_err(|source| ReplayError::Command { line_no: consumed + offset + 1, source })?;
        commands.push(command);
    }
    debug!(titles = inventory.entries().len(), commands = commands.len(), "replaying transcript");

    Checker::new().check_batch(&mut library, &commands, output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    const INPUT: &[&str] = &[
        "1",
        "B-0001 1",
        "[2025-01-01] OPEN",
        "[2025-01-01] 23370001 borrowed B-0001",
        "",
        "[2025-01-01] CLOSE",
    ];

    #[test]
    fn consistent_transcript_passes() {
        let output = lines(&["0", "[2025-01-01] [accept] 23370001 borrowed B-0001-01", "0"]);
        assert_eq!(check_transcript(INPUT, &output, LibraryRules::default()), Ok(()));
    }

    #[test]
    fn inconsistent_output_is_a_violation() {
        let output = lines(&["0", "[2025-01-01] [accept] 23370001 borrowed B-0001-02", "0"]);
        let err = check_transcript(INPUT, &output, LibraryRules::default()).unwrap_err();
        assert!(err.is_violation());
    }

    #[test]
    fn bad_input_log_is_reported_by_line() {
        let input = ["1", "B-0001 1", "[2025-01-01] OPEN", "nonsense"];
        let err = check_transcript(&input[..], &lines(&["0"]), LibraryRules::default()).unwrap_err();
        assert!(matches!(err, ReplayError::Command { line_no: 4, .. }));

        let err = check_transcript(&["x"][..], &[], LibraryRules::default()).unwrap_err();
        assert!(matches!(err, ReplayError::Handshake(_)));
    }
}
