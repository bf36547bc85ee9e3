use crate::document::Document;
use crate::error::{ErrorKind, Result};
use crate::json;
use crate::models::{Model, SchemaVersion};
use exn::{OptionExt, ResultExt};
use serde_json::error::Category;
use serde_json::Value;
use std::path::PathBuf;
use tracing::instrument;

/// Options controlling how strictly a document is parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Accept objects that repeat a key (the last occurrence wins) instead of
    /// rejecting the document as malformed.
    pub ignore_duplicate_keys: bool,
}

/// Turns an open document into a [`Model`].
///
/// Implementations must be callable from several worker threads at once;
/// each call owns its document and returns a model owned by the caller.
pub trait Loader: Send + Sync {
    /// # Errors
    /// - [`ErrorKind::MalformedDocument`] for structurally invalid input.
    /// - [`ErrorKind::UnsupportedVersion`] for a version outside
    ///   [`SchemaVersion::SUPPORTED`].
    /// - [`ErrorKind::Io`] when the document cannot be read.
    fn load(&self, document: Document, options: LoadOptions) -> Result<Model>;
}

/// Loads CityJSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct CityJsonLoader;

impl Loader for CityJsonLoader {
    #[instrument(skip_all, fields(path = %document.path().display(), version, city_objects))]
    fn load(&self, mut document: Document, options: LoadOptions) -> Result<Model> {
        let source = document.path().to_path_buf();
        let raw = match json::from_reader(&mut document, options.ignore_duplicate_keys) {
            Ok(raw) => raw,
            Err(e) => {
                let kind = match e.classify() {
                    Category::Io => ErrorKind::Io,
                    Category::Syntax | Category::Data | Category::Eof => ErrorKind::MalformedDocument(e.to_string()),
                };
                return Err(e).or_raise(|| kind);
            },
        };
        drop(document);
        let model = inspect(source, &raw)?;
        // The parsed tree is proportional to the document; only the summary
        // survives into conversion.
        drop(raw);
        let span = tracing::Span::current();
        span.record("version", tracing::field::display(model.version));
        span.record("city_objects", model.city_objects);
        Ok(model)
    }
}

fn malformed(reason: impl Into<String>) -> ErrorKind {
    ErrorKind::MalformedDocument(reason.into())
}

fn inspect(source: PathBuf, raw: &Value) -> Result<Model> {
    let root = raw.as_object().ok_or_raise(|| malformed("document root is not an object"))?;
    if root.get("type").and_then(Value::as_str) != Some("CityJSON") {
        exn::bail!(malformed("`type` is not \"CityJSON\""));
    }
    let declared = root.get("version").and_then(Value::as_str).ok_or_raise(|| malformed("missing `version`"))?;
    let version: SchemaVersion =
        declared.parse().map_err(|_| exn::Exn::from(ErrorKind::UnsupportedVersion(declared.to_string())))?;
    if !version.is_supported() {
        exn::bail!(ErrorKind::UnsupportedVersion(declared.to_string()));
    }
    if version.is_deprecated() {
        tracing::warn!(path = %source.display(), %version, "CityJSON version is deprecated; consider upgrading");
    }
    let city_objects =
        root.get("CityObjects").and_then(Value::as_object).ok_or_raise(|| malformed("`CityObjects` is not an object"))?;
    let vertices = root.get("vertices").and_then(Value::as_array).ok_or_raise(|| malformed("`vertices` is not an array"))?;
    Ok(Model { source, version, city_objects: city_objects.len(), vertices: vertices.len() })
}
