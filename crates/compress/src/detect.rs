use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::BufRead;
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

impl Compression {
    /// Codec implied by the final extension: `.gz` (any case) or plain.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => Compression::Gzip,
            _ => Compression::Plain,
        }
    }

    /// Codec implied by the leading bytes of a file. Anything without a
    /// known magic number is plain.
    #[must_use]
    pub fn sniff(header: &[u8]) -> Self {
        if header.starts_with(&GZIP_MAGIC) { Compression::Gzip } else { Compression::Plain }
    }

    /// Check the buffered header of `reader` against `self` without consuming
    /// anything.
    ///
    /// # Errors
    /// [`ErrorKind::Mismatch`] when the content disagrees, for example a
    /// `.city.json.gz` that is really plain JSON.
    pub fn verify_header<R: BufRead>(&self, reader: &mut R) -> Result<()> {
        let header = reader.fill_buf().or_raise(|| ErrorKind::Io)?;
        let found = Self::sniff(header);
        if found != *self {
            exn::bail!(ErrorKind::Mismatch { expected: *self, found });
        }
        Ok(())
    }
}
