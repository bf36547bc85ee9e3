//! Conversion of a loaded [`Model`](cjifc_model::Model) into one IFC artifact
//! per level of detail.
//!
//! [`Converter`] is the seam the batch pipeline calls once per (file, LOD)
//! pair. [`CommandConverter`] runs an external converter program in a child
//! process for every call, which keeps the CPU- and memory-heavy work out of
//! the batch process and lets a stuck conversion be killed.

mod command;
pub mod error;
mod lod;
mod project;

pub use crate::command::{CommandConverter, DEFAULT_ARGS, DEFAULT_PROGRAM};
pub use crate::lod::Lod;
pub use crate::project::ProjectMetadata;

use crate::error::Result;
use async_trait::async_trait;
use cjifc_model::Model;
use std::path::Path;

/// Writes one artifact for one level of detail.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert `model` at `lod`, writing the artifact to `output`.
    ///
    /// A failure only concerns this LOD; callers carry on with the next one.
    async fn convert(&self, model: &Model, lod: &Lod, project: &ProjectMetadata, output: &Path) -> Result<()>;
}
