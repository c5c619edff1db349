//! Inventory handshake.
//!
//! Before the first command the simulator receives the number of titles and
//! then one `<ISBN> <copies>` line per title. It answers nothing.

use circulation_model::{Isbn, is_isbn};

use crate::error::ProtocolError;

/// Titles and copy counts handed to the simulator at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    entries: Vec<(Isbn, u32)>,
}

impl Inventory {
    /// Inventory from `(isbn, copies)` pairs.
    pub fn new(entries: Vec<(Isbn, u32)>) -> Self {
        Self { entries }
    }

    /// `(isbn, copies)` pairs in handshake order.
    pub fn entries(&self) -> &[(Isbn, u32)] {
        &self.entries
    }

    /// Total number of copies.
    pub fn copies(&self) -> u64 {
        self.entries.iter().map(|(_, n)| u64::from(*n)).sum()
    }

    /// `<ISBN> <copies>` lines, as understood by the library model.
    pub fn entry_lines(&self) -> impl Iterator<Item = String> {
        self.entries.iter().map(|(isbn, n)| format!("{isbn} {n}"))
    }

    /// Full handshake: count line followed by the entry lines.
    pub fn handshake(&self) -> Vec<String> {
        std::iter::once(self.entries.len().to_string()).chain(self.entry_lines()).collect()
    }

    /// Decode a handshake from the start of `lines`.
    ///
    /// Returns the inventory and the number of lines consumed.
    pub fn parse_handshake<S: AsRef<str>>(lines: &[S]) -> Result<(Self, usize), ProtocolError> {
        let malformed = |reason: String| ProtocolError::MalformedInventory { reason };
        let first = lines.first().ok_or_else(|| malformed("missing title count".into()))?;
        let count: usize = first
            .as_ref()
            .trim()
            .parse()
            .map_err(|_| malformed(format!("bad title count {:?}", first.as_ref())))?;
        let body = lines
            .get(1..=count)
            .ok_or_else(|| malformed(format!("expected {count} title lines")))?;

        let mut entries = Vec::with_capacity(count);
        for line in body {
            let line = line.as_ref();
            let mut parts = line.split_whitespace();
            let entry = match (parts.next(), parts.next(), parts.next()) {
                (Some(isbn), Some(copies), None) if is_isbn(isbn) => {
                    copies.parse().ok().map(|n| (isbn.to_owned(), n))
                },
                _ => None,
            };
            entries.push(entry.ok_or_else(|| malformed(format!("bad title line {line:?}")))?);
        }
        Ok((Self { entries }, count + 1))
    }
}
