use crate::models::SchemaVersion;
use std::path::{Path, PathBuf};

/// The part of a loaded city model that conversion needs.
///
/// Deliberately small: the parsed document tree it was derived from is gone
/// by the time a `Model` exists, so holding one across several conversion
/// passes costs next to nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    /// Plain source document the model was loaded from.
    pub source: PathBuf,
    pub version: SchemaVersion,
    /// Number of entries in `CityObjects`.
    pub city_objects: usize,
    /// Number of entries in `vertices`.
    pub vertices: usize,
}

impl Model {
    pub fn source(&self) -> &Path {
        &self.source
    }
}
