//! Streaming access to parsed WARC records.
use std::cmp;
use std::fmt;
use std::io::prelude::*;
use std::io::{Error as IoError, SeekFrom};

use buf_redux::BufReader;
use thiserror::Error;

pub use buf_redux::Buffer;

use crate::header::{get_record_header, FieldKind, Header};
use crate::http::HttpHeaders;
use crate::{Compression, HeaderParseError};

/// The number of bytes to skip per read() call when closing a record.
///
/// Larger values require more memory but will reduce overhead.
const SKIP_BUF_LEN: usize = 4096;

/// The largest embedded HTTP header block that will be parsed out of a record.
///
/// Blocks that don't terminate within this many bytes are left in the payload unparsed.
const MAX_HTTP_HEAD_LEN: usize = 64 << 10;

/// An error in reading a record from an input stream.
///
/// Every variant describing malformed input carries the offset in the source where the
/// record began.
#[derive(Debug, Error)]
pub enum InvalidRecord {
    /// Where a record was expected to begin there was no valid version line, or the record
    /// did not end with the expected `CRLF CRLF` tail.
    #[error("malformed record at offset {offset}: expected {expected}, found {found:?}")]
    MalformedRecord {
        offset: u64,
        expected: String,
        found: String,
    },
    /// A header field had no colon, or the header block never ended with a blank line.
    #[error("malformed record header at offset {offset}")]
    MalformedHeader {
        offset: u64,
        #[source]
        source: HeaderParseError,
    },
    /// The record has no `Content-Length` but its type requires one.
    #[error("record at offset {offset} has no Content-Length")]
    MissingContentLength { offset: u64 },
    /// The `Content-Length` field is not a decimal integer.
    #[error("record at offset {offset} has invalid Content-Length {value:?}")]
    InvalidContentLength { offset: u64, value: String },
    /// Reached the end of the input stream where a record would start.
    #[error("unexpected end of input")]
    EndOfStream,
    /// Other I/O error.
    #[error("I/O error")]
    IoError(#[from] IoError),
}

impl InvalidRecord {
    fn from_header_error(e: HeaderParseError, offset: u64) -> Self {
        match e {
            HeaderParseError::IoError(e) => InvalidRecord::IoError(e),
            HeaderParseError::Truncated => InvalidRecord::EndOfStream,
            HeaderParseError::InvalidSignature(found) => InvalidRecord::MalformedRecord {
                offset,
                expected: "WARC/<version> line".to_owned(),
                found,
            },
            e @ HeaderParseError::MalformedField | e @ HeaderParseError::TooLong(_) => {
                InvalidRecord::MalformedHeader { offset, source: e }
            }
        }
    }
}

/// Errors reading the content of a record whose header was valid.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The input ended before the declared amount of content was read.
    #[error("content truncated: expected {expected} bytes but only {actual} were available")]
    Truncated { expected: u64, actual: u64 },
    /// The content was already read in full and the source cannot be rewound.
    #[error("record content was already consumed")]
    AlreadyConsumed,
    /// The record's source does not support seeking back to the start of its content.
    #[error("record source is not seekable")]
    NotSeekable,
    #[error("I/O error reading record content")]
    Io(#[from] IoError),
}

/// Errors that might occur when closing a record.
#[derive(Debug, Error)]
pub enum FinishError {
    /// The record tail (CRLF CRLF) was not present.
    ///
    /// This may be because the record is malformed and lacks the tail, or the
    /// input is truncated. Lenient applications may wish to ignore this error.
    #[error("missing record tail")]
    MissingTail,
    /// The input ended before the end of the record content.
    #[error("input ended with {remaining} bytes of record content unread")]
    Truncated { remaining: u64 },
    /// An I/O error occurred.
    #[error("I/O error closing record")]
    Io(#[from] IoError),
}

impl FinishError {
    /// Describe this failure to close the record starting at `offset` as a malformed record.
    pub fn into_invalid_record(self, offset: u64) -> InvalidRecord {
        match self {
            FinishError::MissingTail => InvalidRecord::MalformedRecord {
                offset,
                expected: "CRLF CRLF after record content".to_owned(),
                found: "other data or end of input".to_owned(),
            },
            FinishError::Truncated { remaining } => InvalidRecord::MalformedRecord {
                offset,
                expected: format!("{} more bytes of record content", remaining),
                found: "end of input".to_owned(),
            },
            FinishError::Io(e) => InvalidRecord::IoError(e),
        }
    }
}

#[derive(Debug)]
enum Input<R>
where
    R: BufRead,
{
    // The buffer is unused, stored only for uniformity so the input always owns the buffer.
    Plain(R, Buffer),
    Compressed(BufReader<flate2::bufread::GzDecoder<R>>),
}

impl<R> Input<R>
where
    R: BufRead,
{
    fn into_inner(self) -> (R, Buffer) {
        match self {
            Input::Plain(r, buf) => (r, buf),
            Input::Compressed(r) => {
                let (r, buf) = r.into_inner_with_buffer();
                (r.into_inner(), buf)
            }
        }
    }
}

impl<R> Read for Input<R>
where
    R: BufRead,
{
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Input::Plain(r, _) => r.read(buf),
            Input::Compressed(r) => r.read(buf),
        }
    }
}

impl<R> BufRead for Input<R>
where
    R: BufRead,
{
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        match self {
            Input::Plain(r, _) => r.fill_buf(),
            Input::Compressed(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            Input::Plain(r, _) => r.consume(amt),
            Input::Compressed(r) => r.consume(amt),
        }
    }
}

/// A streaming WARC record.
///
/// The header of the record is accessible via the public [`header`](Self::header) field, and
/// its payload through the [`Read`] and [`BufRead`] impls or [`read_fully`](Self::read_fully).
/// Content is never buffered in full: it is pulled from the underlying input as it is read.
///
/// When a `request`, `response` or `revisit` record holds an HTTP message, its HTTP header
/// block is parsed when the record is opened and made available as
/// [`http_headers`](Self::http_headers); reads then yield only the payload that follows it.
///
/// When done reading the payload, call [`finish`](Self::finish) to advance the underlying
/// reader past this record. The input stream is guaranteed to have been read to the end of the
/// record, including to the end of the compressed stream if the input is gzipped, when the
/// record is finished.
#[derive(Debug)]
pub struct Record<R>
where
    R: BufRead,
{
    /// The parsed record header.
    pub header: Header,
    http_headers: Option<HttpHeaders>,
    /// The record Content-Length in bytes
    content_length: u64,
    /// The number of bytes of the record block not yet taken from the input
    bytes_remaining: u64,
    /// Block bytes taken from the input while looking for an HTTP header block, but not yet read.
    pending: Vec<u8>,
    pending_pos: usize,
    input: Input<R>,
    offset: u64,
    consumed: bool,
    rewinder: Option<Rewinder<R>>,
}

/// Restores already-read content, for records whose input can seek back.
struct Rewinder<R: BufRead>(fn(&mut Record<R>) -> Result<(), ContentError>);

impl<R: BufRead> fmt::Debug for Rewinder<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Rewinder")
    }
}

impl<R> Record<R>
where
    R: BufRead,
{
    /// Read a record from an input stream.
    ///
    /// This allocates a new buffer on every invocation, which can be costly.
    /// If reading many records, prefer a [`RecordReader`](crate::RecordReader) which reuses
    /// one buffer across records.
    pub fn read_from(reader: R, compression: Compression) -> Result<Self, InvalidRecord> {
        let buffer = Buffer::with_capacity(8 << 10);
        Self::read_buffered_from(reader, buffer, compression)
    }

    /// Read a record from an input stream with a user-provided buffer.
    ///
    /// The provided buffer will be returned by [`finish`](Self::finish) so it can be reused by
    /// the caller. This needs to (slightly awkwardly) take ownership of the buffer because the
    /// current buffering API does not accept a mutable reference to a buffer.
    pub fn read_buffered_from(
        reader: R,
        buffer: Buffer,
        compression: Compression,
    ) -> Result<Self, InvalidRecord> {
        Self::read_at(reader, buffer, compression, 0)
    }

    /// Read a record that starts at `offset` in its source, for error reporting.
    pub(crate) fn read_at(
        reader: R,
        mut buffer: Buffer,
        compression: Compression,
        offset: u64,
    ) -> Result<Self, InvalidRecord> {
        let mut input = match compression {
            Compression::None => Input::Plain(reader, buffer),
            Compression::Gzip => {
                buffer.clear();
                Input::Compressed(BufReader::with_buffer(
                    buffer,
                    flate2::bufread::GzDecoder::new(reader),
                ))
            }
        };

        let header = get_record_header(&mut input)
            .map_err(|e| InvalidRecord::from_header_error(e, offset))?;
        let len = match header.get_field(FieldKind::ContentLength) {
            None => {
                let requires_length = header.record_kind().map_or(true, |k| k.requires_content());
                if requires_length {
                    return Err(InvalidRecord::MissingContentLength { offset });
                }
                debug!("record at offset {} has no Content-Length; assuming 0", offset);
                0
            }
            Some(_) => match header.content_length_lenient() {
                Some(n) => n,
                None => {
                    let value = header
                        .get_field_bytes(FieldKind::ContentLength)
                        .map(|v| String::from_utf8_lossy(v).into_owned())
                        .unwrap_or_default();
                    return Err(InvalidRecord::InvalidContentLength { offset, value });
                }
            },
        };

        let mut record = Record {
            http_headers: None,
            content_length: len,
            bytes_remaining: len,
            pending: Vec::new(),
            pending_pos: 0,
            header,
            input,
            offset,
            consumed: false,
            rewinder: None,
        };
        record.sniff_http_headers()?;
        Ok(record)
    }

    /// Parse an HTTP header block from the front of the content, if the record should have one.
    fn sniff_http_headers(&mut self) -> Result<(), IoError> {
        let kind = match self.header.record_kind() {
            Some(k) if k.carries_http() => k,
            _ => return Ok(()),
        };
        let is_http = self
            .header
            .get_field(FieldKind::ContentType)
            .map_or(false, |ct| {
                ct.trim_start()
                    .to_ascii_lowercase()
                    .starts_with("application/http")
            });
        if !is_http || self.content_length == 0 {
            return Ok(());
        }

        let mut searched: usize = 0;
        while self.bytes_remaining > 0 && self.pending.len() < MAX_HTTP_HEAD_LEN {
            let room = MAX_HTTP_HEAD_LEN - self.pending.len();
            let n = {
                let buf = self.input.fill_buf()?;
                let n = cmp::min(buf.len() as u64, self.bytes_remaining) as usize;
                let n = cmp::min(n, room);
                self.pending.extend_from_slice(&buf[..n]);
                n
            };
            if n == 0 {
                // Truncation is reported when the content is read
                break;
            }
            self.input.consume(n);
            self.bytes_remaining -= n as u64;

            // Resume the search a little before the new data in case the terminator straddles it
            let from = searched.saturating_sub(3);
            if self.pending[from..].windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
            searched = self.pending.len();
        }

        match HttpHeaders::parse(kind, &self.pending) {
            Ok((headers, n)) => {
                trace!("parsed {}-byte HTTP header block", n);
                self.http_headers = Some(headers);
                self.pending_pos = n;
            }
            Err(e) => {
                debug!(
                    "record at offset {} declares HTTP content but {}; leaving it in the payload",
                    self.offset, e
                );
            }
        }
        Ok(())
    }

    /// The embedded HTTP header block, if this record has one that parsed successfully.
    pub fn http_headers(&self) -> Option<&HttpHeaders> {
        self.http_headers.as_ref()
    }

    /// Get the expected length of the record block.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.content_length
    }

    /// The expected length of the payload: the block minus any parsed HTTP header block.
    pub fn payload_len(&self) -> u64 {
        self.content_length - self.http_head_len()
    }

    fn http_head_len(&self) -> u64 {
        if self.http_headers.is_some() {
            self.pending_pos as u64
        } else {
            0
        }
    }

    /// The offset of the record's version line in its source.
    ///
    /// Records opened directly with [`read_from`](Self::read_from) report zero.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn payload_remaining(&self) -> u64 {
        (self.pending.len() - self.pending_pos) as u64 + self.bytes_remaining
    }

    /// Read the rest of the payload into memory.
    ///
    /// Fails with [`ContentError::Truncated`] if the input ends before the declared length.
    ///
    /// A [rewindable](Self::rewindable) record returns the whole payload on every call, seeking
    /// back over anything already read. Otherwise content can only be read in full once: later
    /// calls fail with [`ContentError::AlreadyConsumed`].
    pub fn read_fully(&mut self) -> Result<Vec<u8>, ContentError> {
        if let Some(rewind) = self.rewinder.as_ref().map(|r| r.0) {
            if self.consumed || self.payload_remaining() < self.payload_len() {
                rewind(self)?;
            }
        } else if self.consumed {
            return Err(ContentError::AlreadyConsumed);
        }
        self.consumed = true;

        let expected = self.payload_len();
        let mut out = Vec::with_capacity(cmp::min(self.payload_remaining(), 1 << 20) as usize);
        loop {
            let n = {
                let buf = self.fill_buf()?;
                if buf.is_empty() {
                    break;
                }
                out.extend_from_slice(buf);
                buf.len()
            };
            self.consume(n);
        }

        let remaining = self.payload_remaining();
        if remaining > 0 {
            return Err(ContentError::Truncated {
                expected,
                actual: expected - remaining,
            });
        }
        Ok(out)
    }

    /// Advance the input reader past this record's payload and return the input.
    ///
    /// This method **must be called** if the caller wants to continue reading from
    /// the input following this record. If not, the input stream may be left somewhere in
    /// the middle of the record, and the exact location is not predictable.
    ///
    /// Expects there to be two newlines following the payload as specified by
    /// the WARC standard; if missing, [`FinishError::MissingTail`] will be returned. Regardless
    /// of the presence of a correct tail however, bytes will be consumed which may cause some
    /// of the following data to be lost.
    pub fn finish(mut self) -> Result<(R, Buffer), FinishError> {
        self.skip_to_tail()?;
        let Record { input, .. } = self;
        Ok(input.into_inner())
    }

    fn skip_to_tail(&mut self) -> Result<(), FinishError> {
        let mut buf = [0u8; SKIP_BUF_LEN];
        while self.bytes_remaining > 0 {
            let n = cmp::min(buf.len() as u64, self.bytes_remaining) as usize;
            match self.input.read(&mut buf[..n])? {
                0 => {
                    return Err(FinishError::Truncated {
                        remaining: self.bytes_remaining,
                    })
                }
                n => self.bytes_remaining -= n as u64,
            }
        }
        self.pending.clear();
        self.pending_pos = 0;

        let mut tail = [0u8; 4];
        if let Err(e) = self.input.read_exact(&mut tail[..]) {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                return Err(FinishError::MissingTail);
            }
            return Err(e.into());
        }
        if &tail[..] != b"\r\n\r\n" {
            return Err(FinishError::MissingTail);
        }

        // Advance the input to the very end of the compressed stream if compressed; this ensures
        // that the reader advances past the gzip trailer so a user won't trip over them when
        // trying to resume reading another record following this one.
        if let Input::Compressed(ref mut input) = self.input {
            loop {
                let n = input.fill_buf()?.len();
                if n == 0 {
                    break;
                }
                trace!("compressed record finish consuming {} extra bytes", n);
                input.consume(n);
            }
        }
        Ok(())
    }
}

impl<R> Record<R>
where
    R: BufRead + Seek,
{
    /// Let [`read_fully`](Self::read_fully) seek back and return the whole payload every time
    /// it is called.
    ///
    /// Compressed records can't seek and are returned unchanged.
    pub fn rewindable(mut self) -> Self {
        if let Input::Plain(..) = self.input {
            self.rewinder = Some(Rewinder(Self::rewind));
        }
        self
    }

    /// Seek back to the start of the record content so it can be read again.
    ///
    /// Only uncompressed inputs can be rewound; compressed records fail with
    /// [`ContentError::NotSeekable`].
    pub fn rewind(&mut self) -> Result<(), ContentError> {
        let taken = self.content_length - self.bytes_remaining;
        match self.input {
            Input::Plain(ref mut r, _) => {
                r.seek(SeekFrom::Current(-(taken as i64)))?;
            }
            Input::Compressed(_) => return Err(ContentError::NotSeekable),
        }

        self.bytes_remaining = self.content_length;
        self.pending.clear();
        self.pending_pos = 0;
        self.http_headers = None;
        self.consumed = false;
        self.sniff_http_headers()?;
        Ok(())
    }
}

/// Read data from the record payload.
impl<R> Read for Record<R>
where
    R: BufRead,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        if self.pending_pos < self.pending.len() {
            let n = (&self.pending[self.pending_pos..]).read(buf)?;
            self.pending_pos += n;
            return Ok(n);
        }

        let constrained = if (buf.len() as u64) > self.bytes_remaining {
            &mut buf[..self.bytes_remaining as usize]
        } else {
            buf
        };

        let n = self.input.read(constrained)?;
        self.bytes_remaining -= n as u64;
        Ok(n)
    }
}

/// Read data from the record payload, using the underlying input's buffer.
impl<R> BufRead for Record<R>
where
    R: BufRead,
{
    fn fill_buf(&mut self) -> Result<&[u8], IoError> {
        if self.pending_pos < self.pending.len() {
            return Ok(&self.pending[self.pending_pos..]);
        }

        let remaining = self.bytes_remaining;
        let buf = self.input.fill_buf()?;
        let out = if buf.len() as u64 > remaining {
            &buf[..remaining as usize]
        } else {
            buf
        };

        debug_assert!(out.len() as u64 <= remaining);
        Ok(out)
    }

    fn consume(&mut self, n: usize) {
        if self.pending_pos < self.pending.len() {
            debug_assert!(n <= self.pending.len() - self.pending_pos);
            self.pending_pos += n;
            return;
        }

        debug_assert!(n as u64 <= self.bytes_remaining);
        self.input.consume(n);
        self.bytes_remaining -= n as u64;
    }
}
