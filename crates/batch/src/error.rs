//! Batch Error Types
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.
//! Loader, converter and decompression errors are raised into these kinds so
//! a per-file outcome always says which stage failed.

use derive_more::{Display, Error};
use std::path::PathBuf;
use std::time::Duration;

/// A batch error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for batch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the stage a failure happened in.
///
/// ### Fatal to the run
/// - [`ErrorKind::DiscoveryEmpty`]
/// - [`ErrorKind::Discovery`]
///
/// ### Fatal to one file
/// - [`ErrorKind::Decompression`] (the file is excluded before the pool starts)
/// - [`ErrorKind::Load`]
/// - [`ErrorKind::Packaging`]
/// - [`ErrorKind::WorkerCrash`]
/// - [`ErrorKind::Timeout`]
/// - [`ErrorKind::Cancelled`] (reported as [`ErrorKind::Timeout`] by the pool)
///
/// ### Fatal to one LOD
/// - [`ErrorKind::Conversion`]
///
/// ### Never fatal
/// - [`ErrorKind::Cleanup`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No plain source document was left to process.
    #[display("no CityJSON documents found under {}", _0.display())]
    DiscoveryEmpty(#[error(not(source))] PathBuf),
    /// The root directory could not be walked.
    #[display("could not walk {}", _0.display())]
    Discovery(#[error(not(source))] PathBuf),
    #[display("decompression failed")]
    Decompression,
    #[display("document could not be loaded")]
    Load,
    #[display("conversion failed")]
    Conversion,
    #[display("archive could not be written")]
    Packaging,
    #[display("cleanup failed")]
    Cleanup,
    /// A work item panicked or was aborted.
    #[display("worker crashed: {_0}")]
    WorkerCrash(#[error(not(source))] String),
    #[display("timed out after {}s", _0.as_secs())]
    Timeout(#[error(not(source))] Duration),
    /// The work item was told to stop before it finished.
    #[display("cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Nothing is retried within a run; a failed file simply has no archive
    /// and is picked up again by the next run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::WorkerCrash(_) | Self::Packaging | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(ErrorKind::Timeout(Duration::from_secs(90)).to_string(), "timed out after 90s");
        assert_eq!(
            ErrorKind::DiscoveryEmpty(PathBuf::from("/data")).to_string(),
            "no CityJSON documents found under /data"
        );
    }

    #[test]
    fn retryable() {
        assert!(ErrorKind::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!ErrorKind::Load.is_retryable());
        assert!(!ErrorKind::DiscoveryEmpty(PathBuf::new()).is_retryable());
    }
}
