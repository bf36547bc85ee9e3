//! Loading of CityJSON documents into a [`Model`].
//!
//! The [`Loader`] trait is the seam between the batch pipeline and whatever
//! parses documents. [`CityJsonLoader`] is the in-tree implementation: it
//! parses the whole document once, validates its structure and version, and
//! keeps only the lightweight summary that conversion needs. The parsed JSON
//! tree is released before [`Loader::load`] returns.

mod document;
pub mod error;
mod json;
mod loader;
pub mod models;

pub use crate::document::Document;
pub use crate::loader::{CityJsonLoader, LoadOptions, Loader};
pub use crate::models::{Model, SchemaVersion};
