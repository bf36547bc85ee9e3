use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use flate2::Compression as Level;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::io::{self, Read, Write};
use tracing::instrument;

const CHUNK: usize = 64 * 1024;

impl Compression {
    /// Wrap `inner` so reads yield decoded bytes. Concatenated gzip members
    /// decode as one stream.
    fn reader<'a, R: Read + 'a>(&self, inner: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::Plain => Box::new(inner),
            Compression::Gzip => Box::new(MultiGzDecoder::new(inner)),
        }
    }

    /// Decode everything from `reader` into `writer`, returning the number of
    /// decoded bytes.
    ///
    /// Failures while decoding are [`ErrorKind::Corrupt`]; failures while
    /// writing are [`ErrorKind::Io`].
    #[instrument(skip_all, fields(codec = %self, bytes))]
    pub fn decode<R: Read, W: Write>(&self, reader: R, mut writer: W) -> Result<u64> {
        let mut decoded = self.reader(reader);
        let mut chunk = vec![0u8; CHUNK];
        let mut total = 0u64;
        loop {
            let n = match decoded.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).or_raise(|| ErrorKind::Corrupt(*self)),
            };
            writer.write_all(&chunk[..n]).or_raise(|| ErrorKind::Io)?;
            total += n as u64;
        }
        writer.flush().or_raise(|| ErrorKind::Io)?;
        tracing::Span::current().record("bytes", total);
        Ok(total)
    }

    /// Encode `input` in memory, mostly for building fixtures.
    ///
    /// ```
    /// use cjifc_compress::Compression;
    ///
    /// let document = br#"{"type":"CityJSON","version":"2.0"}"#;
    /// let encoded = Compression::Gzip.encode(document).unwrap();
    /// let mut decoded = Vec::new();
    /// Compression::Gzip.decode(encoded.as_slice(), &mut decoded).unwrap();
    /// assert_eq!(decoded, document);
    /// ```
    pub fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::Plain => Ok(input.to_vec()),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Level::best());
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use crate::error::ErrorKind;
    use std::io;

    fn decode(codec: Compression, input: &[u8]) -> crate::error::Result<Vec<u8>> {
        let mut output = Vec::new();
        codec.decode(input, &mut output)?;
        Ok(output)
    }

    #[test]
    fn large_stream_is_decoded_in_chunks() {
        let original = vec![b'v'; 300_000];
        let encoded = Compression::Gzip.encode(&original).unwrap();
        let mut output = Vec::new();
        let bytes = Compression::Gzip.decode(encoded.as_slice(), &mut output).unwrap();
        assert_eq!(bytes, original.len() as u64);
        assert_eq!(output, original);
    }

    #[test]
    fn concatenated_members_decode_in_full() {
        let document = br#"{"type":"CityJSON","version":"2.0","CityObjects":{},"vertices":[]}"#;
        let (head, tail) = document.split_at(33);
        let mut encoded = Compression::Gzip.encode(head).unwrap();
        encoded.extend(Compression::Gzip.encode(tail).unwrap());
        assert_eq!(decode(Compression::Gzip, &encoded).unwrap(), document);
    }

    #[test]
    fn plain_passes_through() {
        assert_eq!(decode(Compression::Plain, b"{}").unwrap(), b"{}");
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = decode(Compression::Gzip, b"this was never gzip").unwrap_err();
        assert_eq!(*err, ErrorKind::Corrupt(Compression::Gzip));
    }

    #[test]
    fn truncated_stream_is_corrupt() {
        let encoded = Compression::Gzip.encode(&[b'x'; 8192]).unwrap();
        let err = decode(Compression::Gzip, &encoded[..encoded.len() / 2]).unwrap_err();
        assert_eq!(*err, ErrorKind::Corrupt(Compression::Gzip));
    }

    struct Full;
    impl io::Write for Full {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_io() {
        let encoded = Compression::Gzip.encode(b"{}").unwrap();
        let err = Compression::Gzip.decode(encoded.as_slice(), Full).unwrap_err();
        assert_eq!(*err, ErrorKind::Io);
    }
}
