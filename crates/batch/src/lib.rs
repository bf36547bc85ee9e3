//! Resumable batch conversion of CityJSON documents into zipped IFC.
//!
//! For every `<name>.city.json` under a root directory (optionally produced
//! from `<name>.city.json.gz` by a decompression pre-pass) the pipeline:
//!
//! 1. skips the file when `<name>.ifc.zip` already exists ([`gate`]),
//! 2. loads the document once on a blocking thread,
//! 3. converts it at every configured LOD in turn, tolerating per-LOD
//!    failures,
//! 4. zips the artifacts that succeeded into `<name>.ifc.zip` ([`package`]),
//! 5. removes the per-LOD artifacts and any disposable plain copy
//!    ([`cleanup`]).
//!
//! Files are processed by a fixed-size pool ([`pool`]); outcomes are reported
//! in completion order. Only an empty discovery is fatal to a run.

pub mod cleanup;
pub mod decompress;
pub mod discover;
pub mod error;
pub mod gate;
pub mod naming;
pub mod package;
pub mod pipeline;
pub mod pool;
mod task;

pub use crate::discover::SourceDescriptor;
pub use crate::naming::SourceName;
pub use crate::pipeline::{ArchiveResult, ConversionOutcome, FileOutcome, PipelineContext, process_file};
pub use crate::pool::{BatchEvent, BatchReport, batch, process, run};
pub use crate::task::Cancel;
