//! Best-effort removal of everything a work item leaves behind.
//!
//! Failures here are logged and counted but never change a file's outcome: a
//! leftover artifact costs disk space, not correctness.

use crate::discover::SourceDescriptor;
use crate::error::{ErrorKind, Result};
use cjifc_convert::Lod;
use exn::ResultExt;
use std::io;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: usize,
}

/// Remove one file. `Ok(false)` when there was nothing to remove.
pub async fn remove_file(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).or_raise(|| ErrorKind::Cleanup),
    }
}

/// Remove the artifact of every configured LOD and, when it is disposable,
/// the plain document.
///
/// Artifacts are removed whether or not their conversion reported success, so
/// partial output of a failed or killed converter goes too.
pub async fn cleanup(source: &SourceDescriptor, lods: &[Lod]) -> CleanupReport {
    let mut report = CleanupReport::default();
    let mut targets: Vec<_> = lods.iter().map(|lod| source.name.artifact(lod)).collect();
    if source.is_disposable()
        && let Some(plain) = &source.decompressed
    {
        targets.push(plain.clone());
    }
    for path in targets {
        match remove_file(&path).await {
            Ok(true) => report.removed += 1,
            Ok(false) => {},
            Err(e) => {
                report.failed += 1;
                tracing::warn!(path = %path.display(), error = ?e, "Could not remove file");
            },
        }
    }
    tracing::debug!(
        path = %source.original.display(),
        removed = report.removed,
        failed = report.failed,
        "Cleaned up"
    );
    report
}
