//! The opt-in decompression pre-pass.
//!
//! Every compressed source without an archive is expanded into its plain
//! sibling before the worker pool starts. The plain file is written under a
//! temporary name in the same directory and renamed into place, so a crash
//! never leaves a truncated document that a later run would try to load.

use crate::discover::{Discovered, SourceDescriptor};
use crate::error::{ErrorKind, Result};
use crate::gate;
use crate::naming::SourceName;
use crate::task;
use cjifc_compress::Compression;
use exn::ResultExt;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::instrument;

/// Stream-decompress `source` into `target`, returning the bytes written.
///
/// The format is taken from the extension and must agree with the file's
/// magic bytes.
pub fn decompress_file(source: &Path, target: &Path) -> Result<u64> {
    let compression = Compression::from_path(source);
    let file = File::open(source).or_raise(|| ErrorKind::Decompression)?;
    let mut reader = BufReader::new(file);
    compression.verify_header(&mut reader).or_raise(|| ErrorKind::Decompression)?;

    let dir = target.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".cjifc-")
        .suffix(".city.json.tmp")
        .tempfile_in(dir)
        .or_raise(|| ErrorKind::Decompression)?;
    let written = compression.decode(reader, temp.as_file_mut()).or_raise(|| ErrorKind::Decompression)?;
    temp.persist(target).or_raise(|| ErrorKind::Decompression)?;
    Ok(written)
}

/// Decompress one compressed source into its plain sibling.
#[instrument(skip_all, fields(path = %source.original.display(), bytes))]
pub async fn decompress(mut source: SourceDescriptor) -> Result<SourceDescriptor> {
    let original = source.original.clone();
    let target = source.name.plain();
    let plain = target.clone();
    let written = task::blocking(move || decompress_file(&original, &target)).await??;
    tracing::Span::current().record("bytes", written);
    tracing::info!(target_path = %plain.display(), "Decompressed");
    source.decompressed = Some(plain);
    Ok(source)
}

/// Turn discovered paths into work items, running the decompression pre-pass
/// when `enabled`.
///
/// - A plain source is always a work item.
/// - A plain source with a compressed sibling is a leftover copy from an
///   earlier pre-pass; it is processed as the compressed source.
/// - A compressed source that is already archived is kept without a plain
///   copy, so the gate reports it as skipped without decompressing it.
/// - Any other compressed source is decompressed only when enabled. A failure
///   is logged and the file is excluded.
pub async fn prepare(found: Discovered, enabled: bool) -> Vec<SourceDescriptor> {
    let mut items: BTreeMap<SourceName, SourceDescriptor> = found
        .plain
        .into_iter()
        .filter_map(SourceDescriptor::plain)
        .map(|d| (d.name.clone(), d))
        .collect();

    for path in found.compressed {
        let Some(source) = SourceDescriptor::compressed(path) else {
            continue;
        };
        if let Some(existing) = items.get_mut(&source.name) {
            existing.original = source.original;
            existing.compressed = true;
            continue;
        }
        if gate::exists(&source.name.archive()).await {
            // Kept so the gate reports it as skipped.
            items.insert(source.name.clone(), source);
            continue;
        }
        if !enabled {
            tracing::debug!(path = %source.original.display(), "Compressed source ignored, decompression disabled");
            continue;
        }
        match decompress(source.clone()).await {
            Ok(source) => {
                items.insert(source.name.clone(), source);
            },
            Err(e) => {
                tracing::warn!(path = %source.original.display(), error = ?e, "Decompression failed, excluding file");
            },
        }
    }

    items.into_values().collect()
}
