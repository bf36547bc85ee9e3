use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// An open handle to a source document, remembering where it came from.
pub struct Document {
    path: PathBuf,
    reader: Box<dyn Read + Send>,
}

impl Document {
    /// Open a document on disk with a buffered reader.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).or_raise(|| ErrorKind::Io)?;
        Ok(Self::new(path, BufReader::new(file)))
    }

    /// Wrap an arbitrary reader, e.g. in-memory content in tests.
    pub fn new(path: impl Into<PathBuf>, reader: impl Read + Send + 'static) -> Self {
        Self { path: path.into(), reader: Box::new(reader) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for Document {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Document::open(dir.path().join("absent.city.json")).err().unwrap();
        assert_eq!(*err, ErrorKind::Io);
    }

    #[test]
    fn reads_wrapped_content() {
        let mut document = Document::new("mem.city.json", Cursor::new(b"{}".to_vec()));
        let mut content = String::new();
        document.read_to_string(&mut content).unwrap();
        assert_eq!(content, "{}");
        assert_eq!(document.path(), Path::new("mem.city.json"));
    }
}
