//! Decoding Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use crate::Compression;
use derive_more::{Display, Error};

/// A decoding error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for decoding operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The compressed stream is corrupt or truncated. Retrying the same
    /// input will not help.
    #[display("corrupt {_0} stream")]
    Corrupt(#[error(not(source))] Compression),
    /// The file content does not match the codec its name implies.
    #[display("expected {expected} data, found {found}")]
    Mismatch { expected: Compression, found: Compression },
    /// Reading the header or writing decoded output failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}
