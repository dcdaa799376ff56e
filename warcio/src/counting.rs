//! Reader and writer wrappers that track their position in the underlying stream.
//!
//! Index offsets are positions in the raw (possibly compressed) source, so the parser reads
//! through a [`CountingReader`] and the writer writes through a [`CountingWriter`].

use std::io::{BufRead, Read, Result, Seek, SeekFrom, Write};

/// A reader wrapper that counts bytes consumed through it.
///
/// Bytes are counted when they are returned by [`Read::read`] or marked consumed with
/// [`BufRead::consume`]; data that has been buffered by [`BufRead::fill_buf`] but not consumed
/// does not count, so [`position`](Self::position) is exactly the offset of the next unread byte.
#[derive(Debug)]
pub struct CountingReader<R> {
    inner: R,
    position: u64,
}

impl<R> CountingReader<R> {
    /// Wrap `inner`, starting the count at zero.
    pub fn new(inner: R) -> Self {
        Self::with_position(inner, 0)
    }

    /// Wrap `inner`, whose next byte is at `position` in some larger stream.
    pub fn with_position(inner: R, position: u64) -> Self {
        CountingReader { inner, position }
    }

    /// The number of bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: BufRead> BufRead for CountingReader<R> {
    fn fill_buf(&mut self) -> Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
        self.position += amt as u64;
    }
}

/// Seeking moves the count by the distance the inner reader moved.
impl<R: Seek> Seek for CountingReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let before = self.inner.stream_position()?;
        let after = self.inner.seek(pos)?;
        if after >= before {
            self.position += after - before;
        } else {
            self.position = self.position.saturating_sub(before - after);
        }
        Ok(after)
    }
}

/// A writer wrapper that counts bytes written through it.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    bytes_written: u64,
}

impl<W> CountingWriter<W> {
    /// Create a new counting writer wrapping the given writer.
    pub fn new(inner: W) -> Self {
        CountingWriter {
            inner,
            bytes_written: 0,
        }
    }

    /// Get the total number of bytes written through this writer.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume this wrapper and return the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.inner.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}
