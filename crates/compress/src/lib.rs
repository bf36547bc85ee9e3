//! Compressed CityJSON sources.
//!
//! City model tiles are commonly distributed as `<name>.city.json.gz`. This
//! crate detects the codec of a source ([`Compression::from_path`],
//! [`Compression::sniff`]), checks that a file really holds what its name
//! claims ([`Compression::verify_header`]) and decodes it as a stream
//! ([`Compression::decode`]) so a multi-gigabyte tile never has to fit in
//! memory.

mod detect;
pub mod error;
mod stream;

use derive_more::Display;

/// Codec of a source document.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum Compression {
    #[default]
    #[display("plain")]
    Plain,
    #[display("gzip")]
    Gzip,
}

#[cfg(test)]
mod tests {
    use crate::Compression;

    #[test]
    fn plain_by_default() {
        assert_eq!(Compression::default(), Compression::Plain);
        assert_eq!(Compression::Gzip.to_string(), "gzip");
    }
}
