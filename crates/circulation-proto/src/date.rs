//! Bracketed `[YYYY-MM-DD]` date tokens.

use std::fmt;

use chrono::NaiveDate;

use crate::error::ProtocolError;

/// Formats a date as `[YYYY-MM-DD]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracketed(pub NaiveDate);

impl fmt::Display for Bracketed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.format("%Y-%m-%d"))
    }
}

/// Parse a `[YYYY-MM-DD]` token.
pub fn parse_bracketed(token: &str) -> Result<NaiveDate, ProtocolError> {
    token
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .and_then(|inner| NaiveDate::parse_from_str(inner, "%Y-%m-%d").ok())
        .ok_or_else(|| ProtocolError::InvalidDate { token: token.to_owned() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(Bracketed(date).to_string(), "[2025-03-07]");
        assert_eq!(parse_bracketed("[2025-03-07]"), Ok(date));
    }

    #[test]
    fn rejects_unbracketed() {
        assert!(parse_bracketed("2025-03-07").is_err());
        assert!(parse_bracketed("[2025-13-07]").is_err());
        assert!(parse_bracketed("[]").is_err());
    }
}
