//! Bundling succeeded artifacts into one `<name>.ifc.zip` per source.

use crate::error::{ErrorKind, Result};
use crate::naming::SourceName;
use crate::task::Cancel;
use cjifc_convert::Lod;
use exn::ResultExt;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::instrument;
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

/// Write `artifacts` into the archive of `name`.
///
/// Nothing is written when `artifacts` is empty. The archive is built as
/// `<name>.ifc.zip.part` and only renamed to its final path once complete,
/// so a failure never leaves a half-written archive that the next run would
/// mistake for a finished file. Members are named by their base file name.
///
/// `cancel` is checked while copying; a cancelled run removes its `.part`
/// file and fails with [`ErrorKind::Cancelled`].
#[instrument(skip_all, fields(archive = %name.archive().display(), members = artifacts.len()))]
pub fn package(name: &SourceName, artifacts: &[(Lod, PathBuf)], cancel: &Cancel) -> Result<Option<PathBuf>> {
    if artifacts.is_empty() {
        return Ok(None);
    }
    let mut seen = HashSet::new();
    if let Some((lod, _)) = artifacts.iter().find(|(lod, _)| !seen.insert(lod)) {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("more than one artifact for LOD {lod}")))
            .or_raise(|| ErrorKind::Packaging);
    }

    let archive = name.archive();
    let partial = name.partial_archive();
    let dir = partial.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let partial_name = partial.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    // A `.part` file can only be left over by a killed run.
    match std::fs::remove_file(&partial) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e).or_raise(|| ErrorKind::Packaging),
        _ => {},
    }
    let temp = tempfile::Builder::new()
        .prefix(partial_name)
        .rand_bytes(0)
        .tempfile_in(dir)
        .or_raise(|| ErrorKind::Packaging)?;

    let mut zip = ZipWriter::new(temp);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (lod, path) in artifacts {
        let member = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("artifact for LOD {lod} has no file name")))
            .or_raise(|| ErrorKind::Packaging)?;
        zip.start_file(member, options).or_raise(|| ErrorKind::Packaging)?;
        let artifact = File::open(path).or_raise(|| ErrorKind::Packaging)?;
        let copied = io::copy(&mut Cancellable { inner: artifact, cancel }, &mut zip);
        cancel.check()?;
        copied.or_raise(|| ErrorKind::Packaging)?;
    }
    let temp = zip.finish().or_raise(|| ErrorKind::Packaging)?;
    temp.as_file().sync_all().or_raise(|| ErrorKind::Packaging)?;
    cancel.check()?;
    temp.persist(&archive).or_raise(|| ErrorKind::Packaging)?;
    tracing::info!("Packaged");
    Ok(Some(archive))
}

/// Stops a copy as soon as the work item is cancelled.
struct Cancellable<'a, R> {
    inner: R,
    cancel: &'a Cancel,
}

impl<R: Read> Read for Cancellable<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(io::Error::other("cancelled"));
        }
        self.inner.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;

    fn lod(s: &str) -> Lod {
        s.parse().unwrap()
    }

    fn artifact(name: &SourceName, l: &str) -> (Lod, PathBuf) {
        let lod = lod(l);
        let path = name.artifact(&lod);
        fs::write(&path, format!("ISO-10303-21; LOD {l}")).unwrap();
        (lod, path)
    }

    fn members(archive: &Path) -> Vec<(String, String)> {
        let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
        (0..zip.len())
            .map(|i| {
                let mut file = zip.by_index(i).unwrap();
                let mut content = String::new();
                file.read_to_string(&mut content).unwrap();
                (file.name().to_string(), content)
            })
            .collect()
    }

    #[test]
    fn empty_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let name = SourceName::from_path(dir.path().join("a.city.json")).unwrap();
        assert_eq!(package(&name, &[], &Cancel::default()).unwrap(), None);
        assert!(!name.archive().exists());
    }

    #[test]
    fn members_are_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("tiles/north");
        fs::create_dir_all(&nested).unwrap();
        let name = SourceName::from_path(nested.join("a.city.json")).unwrap();
        let artifacts = vec![artifact(&name, "0"), artifact(&name, "2.2")];

        let archive = package(&name, &artifacts, &Cancel::default()).unwrap().unwrap();
        assert_eq!(archive, nested.join("a.ifc.zip"));
        assert_eq!(
            members(&archive),
            [
                ("a-0.ifc".to_string(), "ISO-10303-21; LOD 0".to_string()),
                ("a-2.2.ifc".to_string(), "ISO-10303-21; LOD 2.2".to_string()),
            ]
        );
        assert!(!name.partial_archive().exists());
    }

    #[test]
    fn duplicate_lod_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let name = SourceName::from_path(dir.path().join("a.city.json")).unwrap();
        let artifacts = vec![artifact(&name, "1.2"), artifact(&name, "1.2")];
        let err = package(&name, &artifacts, &Cancel::default()).unwrap_err();
        assert_eq!(*err, ErrorKind::Packaging);
        assert!(!name.archive().exists());
    }

    #[test]
    fn failure_leaves_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let name = SourceName::from_path(dir.path().join("a.city.json")).unwrap();
        let missing = (lod("1.3"), name.artifact(&lod("1.3")));
        let artifacts = vec![artifact(&name, "0"), missing];

        let err = package(&name, &artifacts, &Cancel::default()).unwrap_err();
        assert_eq!(*err, ErrorKind::Packaging);
        assert!(!name.archive().exists());
        assert!(!name.partial_archive().exists());
    }

    #[test]
    fn stale_partial_archive_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let name = SourceName::from_path(dir.path().join("a.city.json")).unwrap();
        fs::write(name.partial_archive(), b"killed mid-write").unwrap();

        package(&name, &[artifact(&name, "0")], &Cancel::default()).unwrap();
        assert_eq!(members(&name.archive()).len(), 1);
        assert!(!name.partial_archive().exists());
    }

    #[test]
    fn cancelled_packaging_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let name = SourceName::from_path(dir.path().join("a.city.json")).unwrap();
        let artifacts = vec![artifact(&name, "0"), artifact(&name, "2.2")];
        let cancel = Cancel::default();
        cancel.cancel();

        let err = package(&name, &artifacts, &cancel).unwrap_err();
        assert_eq!(*err, ErrorKind::Cancelled);
        assert!(!name.archive().exists());
        assert!(!name.partial_archive().exists());
    }
}
