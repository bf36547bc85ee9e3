//! Model Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A loading error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for loading operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a document could not be loaded.
///
/// Every variant is fatal for the document: nothing can be converted from it.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The document is not structurally valid CityJSON (bad JSON, duplicate
    /// keys, missing required members).
    #[display("malformed document: {_0}")]
    MalformedDocument(#[error(not(source))] String),
    /// The document declares a schema version outside the supported range.
    #[display("unsupported CityJSON version: {_0}")]
    UnsupportedVersion(#[error(not(source))] String),
    /// The document could not be read.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}
