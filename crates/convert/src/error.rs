//! Conversion Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A conversion error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The converter program could not be located.
    #[display("converter program not found: {_0}")]
    ConverterNotFound(#[error(not(source))] String),
    /// The converter ran but did not produce an artifact (geometry or format
    /// error in the model at this LOD).
    #[display("conversion failed: {_0}")]
    ConversionFailed(#[error(not(source))] String),
    /// Not a valid level of detail identifier.
    #[display("invalid level of detail: {_0}")]
    InvalidLod(#[error(not(source))] String),
    /// An argument template could not be compiled or rendered.
    #[display("invalid converter argument template")]
    Template,
    /// Spawning or waiting on the converter process failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}
