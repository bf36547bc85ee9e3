//! Resumability: an existing archive means the file is done.
//!
//! There is no lock file or index. Archives are renamed into place only once
//! complete, so seeing one is proof that a previous run finished the file.

use crate::cleanup;
use crate::discover::SourceDescriptor;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Proceed,
    Skip {
        archive: PathBuf,
        /// A leftover plain copy of the archived document was deleted.
        removed_stray: bool,
    },
}

/// Decide whether `source` still needs processing.
///
/// When the archive exists, a leftover decompressed copy is removed and
/// nothing else is touched.
pub async fn check(source: &SourceDescriptor) -> Gate {
    let archive = source.name.archive();
    if !exists(&archive).await {
        return Gate::Proceed;
    }
    let removed_stray = match source.decompressed.as_ref().filter(|_| source.is_disposable()) {
        Some(plain) => match cleanup::remove_file(plain).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(path = %plain.display(), error = ?e, "Could not remove stray copy");
                false
            },
        },
        None => false,
    };
    tracing::info!(path = %source.original.display(), archive = %archive.display(), removed_stray, "Skipped, already archived");
    Gate::Skip { archive, removed_stray }
}

/// Existence check that treats an unreadable path as absent.
pub(crate) async fn exists(path: &Path) -> bool {
    match tokio::fs::try_exists(path).await {
        Ok(exists) => exists,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not check for file");
            false
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn proceeds_without_archive() {
        let dir = tempfile::tempdir().unwrap();
        let source = SourceDescriptor::plain(dir.path().join("b.city.json")).unwrap();
        fs::write(dir.path().join("b.city.json"), b"{}").unwrap();
        assert_eq!(check(&source).await, Gate::Proceed);
        assert!(dir.path().join("b.city.json").exists());
    }

    #[tokio::test]
    async fn skips_and_removes_stray_copy() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = SourceDescriptor::compressed(dir.path().join("a.city.json.gz")).unwrap();
        source.decompressed = Some(dir.path().join("a.city.json"));
        fs::write(dir.path().join("a.city.json"), b"{}").unwrap();
        fs::write(dir.path().join("a.ifc.zip"), b"").unwrap();

        assert_eq!(
            check(&source).await,
            Gate::Skip { archive: dir.path().join("a.ifc.zip"), removed_stray: true }
        );
        assert!(!dir.path().join("a.city.json").exists());
        assert!(dir.path().join("a.ifc.zip").exists());
    }

    #[tokio::test]
    async fn skips_without_stray_copy() {
        let dir = tempfile::tempdir().unwrap();
        let source = SourceDescriptor::compressed(dir.path().join("a.city.json.gz")).unwrap();
        fs::write(dir.path().join("a.ifc.zip"), b"").unwrap();
        assert!(matches!(check(&source).await, Gate::Skip { removed_stray: false, .. }));
    }

    #[tokio::test]
    async fn skips_and_keeps_plain_input() {
        let dir = tempfile::tempdir().unwrap();
        let source = SourceDescriptor::plain(dir.path().join("b.city.json")).unwrap();
        fs::write(dir.path().join("b.city.json"), b"{}").unwrap();
        fs::write(dir.path().join("b.ifc.zip"), b"").unwrap();

        assert!(matches!(check(&source).await, Gate::Skip { removed_stray: false, .. }));
        assert!(dir.path().join("b.city.json").exists());
    }
}
