//! Sequential parsing of every record in a source.

use std::io::BufRead;

use crate::record::{Buffer, InvalidRecord, Record};
use crate::{Compression, CountingReader};

/// Reads a sequence of records from a byte source, tracking where each one starts.
///
/// Records are yielded one at a time by [`next`](Self::next), each borrowing the reader's input
/// until it is [finished](Record::finish). The sequence ends cleanly when the input is exhausted
/// exactly where a record would begin; the first error ends it for good, since offsets after a
/// corrupt record can't be trusted.
///
/// ```
/// # use warcio::{Compression, RecordReader};
/// let data = b"WARC/1.1\r\nWARC-Type: resource\r\nContent-Length: 2\r\n\r\nhi\r\n\r\n";
/// let mut reader = RecordReader::new(&data[..], Compression::None);
/// let mut record = reader.next().unwrap().unwrap();
/// assert_eq!(record.offset(), 0);
/// assert_eq!(record.read_fully().unwrap(), b"hi");
/// let (input, buffer) = record.finish().unwrap();
/// assert_eq!(input.position(), data.len() as u64);
/// reader.recycle_buffer(buffer);
/// assert!(reader.next().is_none());
/// ```
pub struct RecordReader<R> {
    input: CountingReader<R>,
    compression: Compression,
    buffer: Option<Buffer>,
    failed: bool,
}

impl<R: BufRead> RecordReader<R> {
    /// Read records from `input`, each compressed as specified.
    pub fn new(input: R, compression: Compression) -> Self {
        Self::with_counting(CountingReader::new(input), compression)
    }

    /// Read records from an input that may already have been partly read.
    ///
    /// Record offsets are reported relative to the input's current count.
    pub fn with_counting(input: CountingReader<R>, compression: Compression) -> Self {
        RecordReader {
            input,
            compression,
            buffer: None,
            failed: false,
        }
    }

    /// The offset of the next unread byte of input.
    pub fn position(&self) -> u64 {
        self.input.position()
    }

    /// Give back the buffer returned by [`Record::finish`] so the next record can reuse it.
    pub fn recycle_buffer(&mut self, buffer: Buffer) {
        self.buffer = Some(buffer);
    }

    /// Parse the next record, or return `None` at the end of the input.
    ///
    /// The record must be [finished](Record::finish) before the next call, or the following
    /// record will be read from somewhere inside it.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Result<Record<&mut CountingReader<R>>, InvalidRecord>> {
        if self.failed {
            return None;
        }

        match self.input.fill_buf() {
            Ok(buf) if buf.is_empty() => return None,
            Ok(_) => {}
            Err(e) => {
                self.failed = true;
                return Some(Err(e.into()));
            }
        }

        let offset = self.input.position();
        trace!("reading record at offset {}", offset);
        let buffer = self
            .buffer
            .take()
            .unwrap_or_else(|| Buffer::with_capacity(8 << 10));
        match Record::read_at(&mut self.input, buffer, self.compression, offset) {
            Ok(record) => Some(Ok(record)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    pub fn into_inner(self) -> R {
        self.input.into_inner()
    }
}
