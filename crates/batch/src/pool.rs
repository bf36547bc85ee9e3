//! The fixed-size worker pool and the whole-run entry points.

use crate::cleanup;
use crate::decompress;
use crate::discover::{self, SourceDescriptor};
use crate::error::{ErrorKind, Result};
use crate::pipeline::{ArchiveResult, FileOutcome, PipelineContext, process_file};
use crate::task::{self, Cancel};
use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// Progress events emitted by [`batch`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete): exactly once, with the
///    number of work items after the decompression pre-pass.
/// 3. [`Processed`](Self::Processed): once per work item, in completion
///    order.
/// 4. [`Complete`](Self::Complete): exactly once.
///
/// A discovery error terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug)]
pub enum BatchEvent {
    Started,
    DiscoveryComplete(u64),
    Processed(FileOutcome),
    Complete,
}

/// Per-file outcomes in completion order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn record(&mut self, outcome: FileOutcome) {
        self.outcomes.push(outcome);
    }

    /// Files that ended with a newly written archive.
    pub fn processed(&self) -> usize {
        self.archives().count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, FileOutcome::Skipped { .. })).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn archives(&self) -> impl Iterator<Item = &ArchiveResult> {
        self.outcomes.iter().filter_map(|o| match o {
            FileOutcome::Archived(result) => Some(result),
            _ => None,
        })
    }
}

/// Stream [`BatchEvent`]s for a whole run over `root`.
///
/// # Errors
/// [`ErrorKind::Discovery`] when `root` cannot be walked and
/// [`ErrorKind::DiscoveryEmpty`] when no plain document is left to process.
/// Both end the stream. Per-file failures are reported as
/// [`FileOutcome`]s and never end it.
pub fn batch(root: PathBuf, ctx: Arc<PipelineContext>) -> impl Stream<Item = Result<BatchEvent>> {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(BatchEvent::Started);

        let found = match discover::discover(&root).await {
            Ok(found) => found,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        let sources = decompress::prepare(found, ctx.decompress).await;
        if sources.is_empty() {
            yield Err(exn::Exn::from(ErrorKind::DiscoveryEmpty(root)));
            return;
        }
        tracing::info!(root = %root.display(), files = sources.len(), workers = ctx.workers, "Discovery complete");
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield Ok(BatchEvent::DiscoveryComplete(u64::try_from(sources.len()).unwrap_or(0)));

        for await outcome in process(sources, ctx) {
            yield Ok(BatchEvent::Processed(outcome));
        }

        yield Ok(BatchEvent::Complete);
    })
}

/// Run `sources` through the pipeline, at most `ctx.workers` at a time,
/// yielding outcomes as work items finish.
///
/// Work items are started in the order given and refilled first in, first
/// out as slots free up.
pub fn process(sources: Vec<SourceDescriptor>, ctx: Arc<PipelineContext>) -> impl Stream<Item = FileOutcome> {
    stream!({
        let mut pending: VecDeque<_> = sources.into();
        let mut processing = FuturesUnordered::new();
        while processing.len() < ctx.workers.max(1)
            && let Some(source) = pending.pop_front()
        {
            processing.push(spawn(Arc::clone(&ctx), source));
        }
        while let Some(outcome) = processing.next().await {
            yield outcome;
            if let Some(source) = pending.pop_front() {
                processing.push(spawn(Arc::clone(&ctx), source));
            }
        }
    })
}

/// Run a whole batch and collect its report.
pub async fn run(root: PathBuf, ctx: Arc<PipelineContext>) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    let mut events = std::pin::pin!(batch(root, ctx));
    while let Some(event) = events.next().await {
        if let BatchEvent::Processed(outcome) = event? {
            report.record(outcome);
        }
    }
    tracing::info!(
        processed = report.processed(),
        skipped = report.skipped(),
        failed = report.failed(),
        "Batch complete"
    );
    Ok(report)
}

/// Start one work item on its own task.
///
/// The task boundary is where a panic anywhere in the pipeline is caught and
/// turned into a failed outcome, leaving the other work items untouched.
fn spawn(ctx: Arc<PipelineContext>, source: SourceDescriptor) -> impl Future<Output = FileOutcome> {
    let handle = tokio::spawn(run_item(Arc::clone(&ctx), source.clone()));
    async move {
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = if e.is_panic() {
                    task::panic_message(e.into_panic().as_ref())
                } else {
                    "task cancelled".to_string()
                };
                tracing::error!(path = %source.original.display(), %message, "Worker crashed");
                abandon(&ctx, &source).await;
                FileOutcome::Failed { source: source.original, error: exn::Exn::from(ErrorKind::WorkerCrash(message)) }
            },
        }
    }
}

/// Run one work item, enforcing the per-file timeout.
///
/// On expiry the item is cancelled rather than dropped and is awaited until it
/// has stopped, so its slot is not reused while its blocking work still runs.
/// The outcome it actually reached wins when it finished anyway.
async fn run_item(ctx: Arc<PipelineContext>, source: SourceDescriptor) -> FileOutcome {
    let cancel = Cancel::default();
    let mut work = std::pin::pin!(process_file(&ctx, &source, &cancel));
    let Some(limit) = ctx.timeout else {
        return work.await;
    };
    if let Ok(outcome) = tokio::time::timeout(limit, work.as_mut()).await {
        return outcome;
    }
    tracing::warn!(path = %source.original.display(), seconds = limit.as_secs(), "Timed out, stopping");
    cancel.cancel();
    match work.await {
        outcome @ (FileOutcome::Archived(_) | FileOutcome::Skipped { .. }) => outcome,
        _ => FileOutcome::Failed { source: source.original.clone(), error: exn::Exn::from(ErrorKind::Timeout(limit)) },
    }
}

/// Cleanup for a work item that crashed before its own cleanup step.
async fn abandon(ctx: &PipelineContext, source: &SourceDescriptor) {
    cleanup::cleanup(source, &ctx.lods).await;
}
