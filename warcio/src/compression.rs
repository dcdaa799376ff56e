//! Handling of record compression.
//!
//! WARC files can be compressed, but the structure of the compressed data must be managed
//! to ensure a record can be accessed without decompressing every previous one in a file
//! (which may contain many records).
//!
//! Records are individually compressed so each can be the subject of random access: a
//! compressed file is a concatenation of gzip members, one per record. Provided the file offset
//! and compressed length of a record are known (as recorded in a [CDX index](crate::index)), a
//! reader can decompress that record alone.

use std::io::{Result as IoResult, Write};
use std::path::Path;

use flate2::write::GzEncoder;

/// The two magic bytes starting every gzip member.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// The supported methods of compressing a single [`Record`](crate::Record).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Compression {
    /// Uncompressed data
    None,
    /// `gzip` compression
    ///
    /// gzip uses DEFLATE compression which is relatively simple but doesn't have particularly good
    /// compression. Each record has a gzip header and footer that include some uninteresting
    /// fields but also include a checksum.
    Gzip,
}

impl Compression {
    /// Return the best guess of compression to be used for a file with the given name.
    ///
    /// A file that may be present is not accessed in any way; only the path is used to guess based
    /// on the name.
    ///
    /// ```
    /// # use warcio::Compression;
    /// assert_eq!(Compression::guess_for_filename("test.warc.gz"), Compression::Gzip);
    /// assert_eq!(Compression::guess_for_filename("test.warc"), Compression::None);
    /// ```
    pub fn guess_for_filename<P: AsRef<Path>>(path: P) -> Compression {
        match path.as_ref().extension() {
            Some(ext) if ext == "gz" => Compression::Gzip,
            _ => Compression::None,
        }
    }

    /// Identify the compression of data that begins with `prefix`, by looking for the gzip magic.
    ///
    /// ```
    /// # use warcio::Compression;
    /// assert_eq!(Compression::detect(b"\x1f\x8b\x08\x00"), Compression::Gzip);
    /// assert_eq!(Compression::detect(b"WARC/1.1\r\n"), Compression::None);
    /// ```
    pub fn detect(prefix: &[u8]) -> Compression {
        if prefix.starts_with(&GZIP_MAGIC) {
            Compression::Gzip
        } else {
            Compression::None
        }
    }
}

impl From<bool> for Compression {
    /// `true` selects gzip.
    fn from(gzip: bool) -> Self {
        if gzip {
            Compression::Gzip
        } else {
            Compression::None
        }
    }
}

/// Writes to an output stream with specified [`Compression`].
pub enum Writer<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> Writer<W> {
    /// Construct a writer to the given adapter with the given compression mode.
    pub fn new(dest: W, mode: Compression) -> Self {
        match mode {
            Compression::None => Self::Plain(dest),
            Compression::Gzip => Self::Gzip(GzEncoder::new(dest, flate2::Compression::best())),
        }
    }

    /// Gracefully close the writer (terminating a compressed stream) and return the output stream.
    pub fn finish(self) -> IoResult<W> {
        match self {
            Self::Plain(w) => Ok(w),
            Self::Gzip(gz) => gz.finish(),
        }
    }
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        match self {
            Writer::Plain(w) => w.write(buf),
            Writer::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> IoResult<()> {
        match self {
            Writer::Plain(w) => w.flush(),
            Writer::Gzip(w) => w.flush(),
        }
    }
}
