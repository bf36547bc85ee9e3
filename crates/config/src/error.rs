//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// None of these are retryable: the configuration has to be fixed.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The configuration file extension is not one of toml, yaml, yml, json.
    #[display("unsupported configuration format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// A value could not be parsed into the expected type.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// No level of detail configured.
    #[display("at least one level of detail must be configured")]
    NoLods,
    /// The same level of detail is listed twice.
    #[display("level of detail listed more than once: {_0}")]
    DuplicateLod(#[error(not(source))] String),
    /// A worker pool of zero cannot process anything.
    #[display("worker count must be greater than zero")]
    NoWorkers,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
