//! Processing of one source document, start to finish.

use crate::cleanup;
use crate::discover::SourceDescriptor;
use crate::error::{Error, ErrorKind, Result};
use crate::gate::{self, Gate};
use crate::package;
use crate::task::{self, Cancel};
use cjifc_convert::{Converter, Lod, ProjectMetadata};
use cjifc_model::{Document, LoadOptions, Loader, Model};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Everything a work item needs, passed explicitly to every stage.
#[derive(Clone)]
pub struct PipelineContext {
    pub loader: Arc<dyn Loader>,
    pub converter: Arc<dyn Converter>,
    /// Exported in this order for every document.
    pub lods: Vec<Lod>,
    pub project: ProjectMetadata,
    pub load_options: LoadOptions,
    /// Run the decompression pre-pass.
    pub decompress: bool,
    /// Worker pool size.
    pub workers: usize,
    /// Per-file limit, `None` to wait forever. A running conversion is
    /// killed when it expires; a running load or packaging step is asked to
    /// stop and waited for.
    pub timeout: Option<Duration>,
}

impl PipelineContext {
    /// A context with the default LODs and project metadata, one worker per
    /// available core and no timeout.
    pub fn new(loader: Arc<dyn Loader>, converter: Arc<dyn Converter>) -> Self {
        Self {
            loader,
            converter,
            lods: Lod::defaults(),
            project: ProjectMetadata::default(),
            load_options: LoadOptions::default(),
            decompress: false,
            workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            timeout: None,
        }
    }
}

/// The result of converting one file at one LOD.
#[derive(Debug)]
pub struct ConversionOutcome {
    pub lod: Lod,
    pub artifact: PathBuf,
    pub result: Result<()>,
}

impl ConversionOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// A file that made it into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveResult {
    pub source: PathBuf,
    pub archive: PathBuf,
    /// LODs in the archive, in configured order.
    pub included: Vec<Lod>,
    /// LODs that failed to convert.
    pub failed: usize,
}

/// How processing of one file ended.
#[derive(Debug)]
pub enum FileOutcome {
    /// An archive already existed; nothing was loaded or converted.
    Skipped { source: PathBuf, archive: PathBuf },
    Archived(ArchiveResult),
    /// The document loaded but every LOD failed to convert.
    NoArtifacts { source: PathBuf, failed: usize },
    FailedToLoad { source: PathBuf, error: Error },
    /// Packaging failed, or the work item crashed or timed out.
    Failed { source: PathBuf, error: Error },
}

impl FileOutcome {
    pub fn source(&self) -> &Path {
        match self {
            Self::Skipped { source, .. }
            | Self::NoArtifacts { source, .. }
            | Self::FailedToLoad { source, .. }
            | Self::Failed { source, .. } => source,
            Self::Archived(result) => &result.source,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::NoArtifacts { .. } | Self::FailedToLoad { .. } | Self::Failed { .. })
    }
}

/// Gate, load, convert every LOD, package, clean up.
///
/// Never fails: every error is classified into the returned [`FileOutcome`].
/// Cleanup runs on every path past the gate, including after `cancel` fires,
/// which stops the file at its next stage boundary with
/// [`ErrorKind::Cancelled`].
#[instrument(skip_all, fields(path = %source.original.display()))]
pub async fn process_file(ctx: &PipelineContext, source: &SourceDescriptor, cancel: &Cancel) -> FileOutcome {
    if let Gate::Skip { archive, .. } = gate::check(source).await {
        return FileOutcome::Skipped { source: source.original.clone(), archive };
    }
    let outcome = convert_and_package(ctx, source, cancel).await;
    cleanup::cleanup(source, &ctx.lods).await;
    match &outcome {
        FileOutcome::Archived(result) => tracing::info!(
            archive = %result.archive.display(),
            included = result.included.len(),
            failed = result.failed,
            "Finished"
        ),
        FileOutcome::NoArtifacts { failed, .. } => tracing::warn!(failed, "No LOD converted, no archive written"),
        FileOutcome::FailedToLoad { error, .. } => tracing::warn!(error = ?error, "Failed to load"),
        FileOutcome::Failed { error, .. } => tracing::warn!(error = ?error, "Failed"),
        FileOutcome::Skipped { .. } => {},
    }
    outcome
}

async fn convert_and_package(ctx: &PipelineContext, source: &SourceDescriptor, cancel: &Cancel) -> FileOutcome {
    let original = source.original.clone();
    let Some(document) = source.decompressed.clone() else {
        let error = exn::Exn::from(ErrorKind::Decompression);
        return FileOutcome::Failed { source: original, error };
    };

    let model = match load(ctx, document).await {
        Ok(model) => model,
        Err(error) => return FileOutcome::FailedToLoad { source: original, error },
    };
    if let Err(error) = cancel.check() {
        return FileOutcome::Failed { source: original, error };
    }
    tracing::info!(
        version = %model.version,
        city_objects = model.city_objects,
        vertices = model.vertices,
        "Parsed"
    );

    let outcomes = convert_all(ctx, source, &model, cancel).await;
    // Only the artifacts on disk are needed from here on.
    drop(model);
    if let Err(error) = cancel.check() {
        return FileOutcome::Failed { source: original, error };
    }

    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    let succeeded: Vec<(Lod, PathBuf)> = outcomes
        .into_iter()
        .filter(ConversionOutcome::succeeded)
        .map(|o| (o.lod, o.artifact))
        .collect();
    if succeeded.is_empty() {
        return FileOutcome::NoArtifacts { source: original, failed };
    }

    let included: Vec<Lod> = succeeded.iter().map(|(lod, _)| lod.clone()).collect();
    let name = source.name.clone();
    let cancel = cancel.clone();
    let packaged = task::blocking(move || package::package(&name, &succeeded, &cancel))
        .await
        .and_then(|packaged| packaged);
    match packaged {
        Ok(Some(archive)) => FileOutcome::Archived(ArchiveResult { source: original, archive, included, failed }),
        Ok(None) => FileOutcome::NoArtifacts { source: original, failed },
        Err(error) => FileOutcome::Failed { source: original, error },
    }
}

async fn load(ctx: &PipelineContext, path: PathBuf) -> Result<Model> {
    let loader = Arc::clone(&ctx.loader);
    let options = ctx.load_options;
    task::blocking(move || {
        let document = Document::open(path)?;
        loader.load(document, options)
    })
    .await?
    .or_raise(|| ErrorKind::Load)
}

/// Convert `model` at every configured LOD, one after the other.
///
/// A failed LOD is recorded and the loop carries on. Cancelling drops the
/// running conversion and skips the LODs not yet started.
async fn convert_all(
    ctx: &PipelineContext,
    source: &SourceDescriptor,
    model: &Model,
    cancel: &Cancel,
) -> Vec<ConversionOutcome> {
    let mut outcomes = Vec::with_capacity(ctx.lods.len());
    for lod in &ctx.lods {
        if cancel.is_cancelled() {
            break;
        }
        let artifact = source.name.artifact(lod);
        let result = tokio::select! {
            converted = ctx.converter.convert(model, lod, &ctx.project, &artifact) => {
                converted.or_raise(|| ErrorKind::Conversion)
            },
            () = cancel.cancelled() => Err(exn::Exn::from(ErrorKind::Cancelled)),
        };
        match &result {
            Ok(()) => tracing::info!(%lod, artifact = %artifact.display(), "Converted"),
            Err(e) => tracing::warn!(%lod, error = ?e, "Conversion failed"),
        }
        outcomes.push(ConversionOutcome { lod: lod.clone(), artifact, result });
    }
    outcomes
}
