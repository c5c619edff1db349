//! Response framing.
//!
//! The simulator answers every command with a variable number of lines. The
//! first line of an OPEN/CLOSE answer is the count of tidy moves that follow;
//! the first line of a trace query answer ends with the count of entries that
//! follow; every other command gets exactly one line. Both the process driver
//! and the checker frame responses with [`ResponseShape::frame_len`] so they
//! cannot disagree.

use crate::{command::Request, error::ProtocolError, response::parse_count};

/// Framing class of a command's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Exactly one line.
    Single,
    /// Count line followed by that many tidy moves.
    Tidy,
    /// Trace header followed by as many entries as it announces.
    Trace,
}

impl ResponseShape {
    /// Framing class for a request.
    pub fn of(request: &Request) -> Self {
        match request {
            Request::Open | Request::Close => Self::Tidy,
            Request::QueryTrace { .. } => Self::Trace,
            _ => Self::Single,
        }
    }

    /// Total number of lines in a response, given its first line.
    pub fn frame_len(self, first: &str) -> Result<usize, ProtocolError> {
        let invalid = || ProtocolError::InvalidCount { line: first.to_owned() };
        let following = match self {
            Self::Single => return Ok(1),
            Self::Tidy => parse_count(first)?,
            Self::Trace => {
                first.split_whitespace().last().and_then(|t| t.parse().ok()).ok_or_else(invalid)?
            },
        };
        following.checked_add(1).ok_or_else(invalid)
    }
}

/// Split a flat list of output lines into one frame per shape.
///
/// Stops at the first frame that cannot be decoded or is cut short, and
/// reports how many lines were left over after the last frame.
pub fn split_frames<'a>(
    shapes: impl IntoIterator<Item = ResponseShape>,
    lines: &'a [String],
) -> Result<(Vec<&'a [String]>, usize), FrameError> {
    let mut frames = Vec::new();
    let mut cursor = 0;
    for (index, shape) in shapes.into_iter().enumerate() {
        let first = lines.get(cursor).ok_or(FrameError::Missing { index, needed: 1, got: 0 })?;
        let len = shape.frame_len(first).map_err(|source| FrameError::Header { index, source })?;
        let available = lines.len() - cursor;
        if available < len {
            return Err(FrameError::Missing { index, needed: len, got: available });
        }
        frames.push(&lines[cursor..cursor + len]);
        cursor += len;
    }
    Ok((frames, lines.len() - cursor))
}

/// Failure to split output into frames.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Header line of a frame could not be decoded
    #[error("response to command {index}: {source}")]
    Header {
        /// Position of the command in the batch
        index: usize,
        /// Decoding failure
        source: ProtocolError,
    },

    /// Output ended inside a frame
    #[error("response to command {index}: expected {needed} lines, only {got} available")]
    Missing {
        /// Position of the command in the batch
        index: usize,
        /// Lines the frame needs
        needed: usize,
        /// Lines left in the output
        got: usize,
    },
}

impl FrameError {
    /// Position of the command whose response could not be framed.
    pub fn index(&self) -> usize {
        match self {
            Self::Header { index, .. } | Self::Missing { index, .. } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn frame_lengths() {
        assert_eq!(ResponseShape::Single.frame_len("anything"), Ok(1));
        assert_eq!(ResponseShape::Tidy.frame_len("2"), Ok(3));
        assert_eq!(ResponseShape::Trace.frame_len("[2025-01-01] B-0001-01 moving trace: 0"), Ok(1));
        assert!(ResponseShape::Tidy.frame_len("two").is_err());
        assert!(ResponseShape::Trace.frame_len("[2025-01-01] B-0001-01 moving trace:").is_err());
    }

    #[test]
    fn splits_mixed_batch() {
        let output = lines(&[
            "1",
            "[2025-01-01] move B-0001-01 from bro to bs",
            "[2025-01-01] [accept] 23370001 borrowed B-0001-01",
            "[2025-01-01] B-0001-01 moving trace: 1",
            "1 [2025-01-01] from bs to user",
            "leftover",
        ]);
        let shapes = [ResponseShape::Tidy, ResponseShape::Single, ResponseShape::Trace];
        let (frames, leftover) = split_frames(shapes, &output).unwrap();
        assert_eq!(frames.iter().map(|f| f.len()).collect::<Vec<_>>(), [2, 1, 2]);
        assert_eq!(leftover, 1);
    }

    #[test]
    fn reports_short_output() {
        let output = lines(&["2", "[2025-01-01] move B-0001-01 from bro to bs"]);
        assert_eq!(
            split_frames([ResponseShape::Tidy], &output),
            Err(FrameError::Missing { index: 0, needed: 3, got: 2 })
        );
        assert!(matches!(
            split_frames([ResponseShape::Single, ResponseShape::Single], &output[..1]),
            Err(FrameError::Missing { index: 1, .. })
        ));
        let err = split_frames([ResponseShape::Single, ResponseShape::Tidy], &output).unwrap_err();
        assert_eq!(err.index(), 1);
    }
}
