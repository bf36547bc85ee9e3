//! Finding source documents under a root directory.

use crate::error::{ErrorKind, Result};
use crate::naming::{COMPRESSED_SUFFIX, PLAIN_SUFFIX, SourceName};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Source documents found by [`discover`], each list sorted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Discovered {
    /// `*.city.json.gz`
    pub compressed: Vec<PathBuf>,
    /// `*.city.json`
    pub plain: Vec<PathBuf>,
}

/// One source document scheduled for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub name: SourceName,
    /// The path as found: the compressed original when there is one.
    pub original: PathBuf,
    pub compressed: bool,
    /// The plain document the pipeline reads. Set at discovery for plain
    /// sources and by the decompression pre-pass for compressed ones.
    pub decompressed: Option<PathBuf>,
}

impl SourceDescriptor {
    pub fn plain(path: PathBuf) -> Option<Self> {
        let name = SourceName::from_path(&path)?;
        Some(Self { name, original: path.clone(), compressed: false, decompressed: Some(path) })
    }

    pub fn compressed(path: PathBuf) -> Option<Self> {
        let name = SourceName::from_path(&path)?;
        Some(Self { name, original: path, compressed: true, decompressed: None })
    }

    /// Whether the plain document may be deleted once this file is done.
    ///
    /// Only a copy decompressed from a compressed original is. A plain-only
    /// input is the sole copy of its data and is never touched.
    pub fn is_disposable(&self) -> bool {
        self.compressed
    }
}

enum WalkEntry {
    Descend(PathBuf),
    Compressed(PathBuf),
    Plain(PathBuf),
    Skip,
}

/// Recursively collect compressed and plain source documents under `root`.
///
/// # Errors
/// [`ErrorKind::Discovery`] when `root` itself cannot be read. Unreadable
/// subdirectories are logged and skipped.
pub async fn discover(root: &Path) -> Result<Discovered> {
    let mut found = Discovered::default();
    let mut stack = vec![root.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = match fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(e) if current == root => return Err(e).or_raise(|| ErrorKind::Discovery(root.to_path_buf())),
            Err(e) => {
                tracing::warn!(path = %current.display(), error = %e, "Skipping unreadable directory");
                continue;
            },
        };
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(path = %current.display(), error = %e, "Failed to read directory entry");
                    break;
                },
            };
            match classify(&entry).await {
                WalkEntry::Descend(dir) => stack.push(dir),
                WalkEntry::Compressed(path) => found.compressed.push(path),
                WalkEntry::Plain(path) => found.plain.push(path),
                WalkEntry::Skip => {},
            }
        }
    }
    found.compressed.sort();
    found.plain.sort();
    tracing::debug!(
        root = %root.display(),
        compressed = found.compressed.len(),
        plain = found.plain.len(),
        "Discovery finished"
    );
    Ok(found)
}

async fn classify(entry: &fs::DirEntry) -> WalkEntry {
    let path = entry.path();
    let file_type = match entry.file_type().await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to stat entry");
            return WalkEntry::Skip;
        },
    };
    if file_type.is_dir() {
        return WalkEntry::Descend(path);
    }
    // Note: symlinks are not followed, which also rules out directory cycles.
    if !file_type.is_file() {
        return WalkEntry::Skip;
    }
    match path.file_name().and_then(|n| n.to_str()) {
        Some(n) if n.ends_with(COMPRESSED_SUFFIX) && SourceName::from_path(&path).is_some() => {
            WalkEntry::Compressed(path)
        },
        Some(n) if n.ends_with(PLAIN_SUFFIX) && SourceName::from_path(&path).is_some() => WalkEntry::Plain(path),
        _ => WalkEntry::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{}").unwrap();
        path
    }

    #[tokio::test]
    async fn finds_sources_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let a = touch(root, "a.city.json.gz");
        let b = touch(root, "b.city.json");
        let c = touch(root, "nested/deeper/c.city.json");
        touch(root, "notes.json");
        touch(root, "a.ifc.zip");
        touch(root, ".city.json");

        let found = discover(root).await.unwrap();
        assert_eq!(found.compressed, vec![a]);
        assert_eq!(found.plain, vec![b, c]);
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(&dir.path().join("missing")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Discovery(_)));
    }

    #[tokio::test]
    async fn empty_root_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(discover(dir.path()).await.unwrap(), Discovered::default());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let target = touch(dir.path(), "real/a.city.json");
        let links = dir.path().join("links");
        fs::create_dir(&links).unwrap();
        std::os::unix::fs::symlink(&target, links.join("b.city.json")).unwrap();
        std::os::unix::fs::symlink(dir.path(), links.join("loop")).unwrap();

        let found = discover(dir.path()).await.unwrap();
        assert_eq!(found.plain, vec![target]);
    }

    #[test]
    fn descriptors() {
        let plain = SourceDescriptor::plain(PathBuf::from("d/b.city.json")).unwrap();
        assert_eq!(plain.decompressed.as_deref(), Some(Path::new("d/b.city.json")));
        assert!(!plain.is_disposable());

        let compressed = SourceDescriptor::compressed(PathBuf::from("d/a.city.json.gz")).unwrap();
        assert_eq!(compressed.decompressed, None);
        assert!(compressed.is_disposable());

        assert_eq!(SourceDescriptor::plain(PathBuf::from("d/a.txt")), None);
    }
}
