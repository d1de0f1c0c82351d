//! Scanner Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A scanning error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scanning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Both variants are terminal for the stream that produced them; the scanner
/// reports end-of-input on every call that follows.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reading from the underlying byte stream failed.
    #[display("failed to read catalog stream")]
    Io,
    /// The byte stream is not valid UTF-8.
    #[display("catalog is not valid UTF-8 (near line {line})")]
    Decode {
        /// Line of the last token emitted before the invalid bytes.
        line: u64,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Io.to_string(), "failed to read catalog stream");
        assert_eq!(ErrorKind::Decode { line: 12 }.to_string(), "catalog is not valid UTF-8 (near line 12)");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Io.is_retryable());
        assert!(!ErrorKind::Decode { line: 1 }.is_retryable());
    }
}
