//! Serialization of records into WARC files.
//!
//! [`serialize`] turns one [`NewRecord`] into the exact bytes of a record. Because
//! `Content-Length` and the digests appear in the header but depend on the whole content, the
//! content of one record is held in memory while it is serialized; very large single records are
//! bounded by available memory.
//!
//! [`WarcWriter`] is a writing session for one output target. It writes a `warcinfo` record
//! describing the target before the first record, and reports where each record landed.

use std::io::{self, Read, Write};

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use rayon::prelude::*;
use thiserror::Error;

use crate::compression::Writer;
use crate::header::{FieldKind, Header};
use crate::new_record::{InvalidField, NewRecord};
use crate::{CountingWriter, Options};

/// Size of chunks read from record content.
const CONTENT_CHUNK_LEN: usize = 8 << 10;

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error(transparent)]
    InvalidField(#[from] InvalidField),
    #[error("I/O error serializing record")]
    Io(#[from] io::Error),
}

/// Where a record was written: its offset in the target and its length in bytes, both as
/// stored (compressed, if compression is enabled).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLocation {
    pub offset: u64,
    pub length: u64,
}

/// Writes exactly `limit` bytes of record block followed by the record tail.
struct RecordWriter<W> {
    limit: u64,
    written: u64,
    writer: W,
}

impl<W: Write> RecordWriter<W> {
    fn new(writer: W, content_length: u64) -> Self {
        RecordWriter {
            limit: content_length,
            written: 0,
            writer,
        }
    }

    /// Terminate the record with CRLF CRLF and return the inner writer.
    fn finish(mut self) -> io::Result<W> {
        if self.written < self.limit {
            error!(
                "record contents wrote only {} bytes but expected {}",
                self.written, self.limit
            );
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "record content is shorter than its Content-Length",
            ));
        }
        self.writer.write_all(b"\r\n\r\n")?;
        Ok(self.writer)
    }
}

impl<W: Write> Write for RecordWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        debug_assert!(self.written <= self.limit);
        let take = std::cmp::min(buf.len() as u64, self.limit - self.written);
        if take < buf.len() as u64 {
            warn!(
                "discarding {} bytes beyond record Content-Length",
                buf.len() as u64 - take
            );
        }

        let written = self.writer.write(&buf[..take as usize])?;
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Format the current time as a `WARC-Date`.
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn new_record_id() -> String {
    format!("<urn:uuid:{}>", uuid::Uuid::new_v4())
}

/// Serialize one record to bytes as configured by `options`.
///
/// The mandatory fields come first (`WARC-Type`, `WARC-Record-ID`, `WARC-Date`, then
/// `WARC-Target-URI` if present), followed by the caller's fields in the order given, and finally
/// `Content-Type` of an HTTP block, the digests and `Content-Length`. A record with HTTP headers
/// gets a `WARC-Payload-Digest` of the content after the HTTP block as well as a
/// `WARC-Block-Digest` of the whole block.
///
/// ```
/// # use warcio::{NewRecord, Options, RecordFields};
/// # use warcio::writer::serialize;
/// let fields = RecordFields {
///     url: Some("http://example.com/".into()),
///     date: Some("2000-01-01T00:00:00Z".into()),
///     record_id: Some("<urn:uuid:12345678-feb0-11e6-8f83-68a86d1772ce>".into()),
///     ..Default::default()
/// };
/// let record = NewRecord::create("resource", fields, None).unwrap();
/// let bytes = serialize(record, &Options::default()).unwrap();
/// assert!(bytes.starts_with(b"WARC/1.1\r\nWARC-Type: resource\r\n"));
/// assert!(bytes.ends_with(b"Content-Length: 0\r\n\r\n\r\n\r\n"));
/// ```
pub fn serialize(record: NewRecord, options: &Options) -> Result<Vec<u8>, SerializeError> {
    let NewRecord {
        kind,
        url,
        date,
        record_id,
        warc_headers,
        http_headers,
        content,
    } = record;

    let http_block = http_headers
        .as_ref()
        .map(|h| h.to_bytes(options.keep_headers_case));
    let mut block_digester = options.digest_algo.digester();
    let mut payload_digester = http_block.as_ref().map(|_| options.digest_algo.digester());
    if let Some(block) = &http_block {
        block_digester.handle_data(block);
    }

    let mut payload = Vec::new();
    if let Some(mut content) = content {
        let mut chunk = vec![0u8; CONTENT_CHUNK_LEN];
        loop {
            let n = match content.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            block_digester.handle_data(&chunk[..n]);
            if let Some(d) = payload_digester.as_mut() {
                d.handle_data(&chunk[..n]);
            }
            payload.extend_from_slice(&chunk[..n]);
        }
    }
    let content_length = http_block.as_ref().map_or(0, Vec::len) as u64 + payload.len() as u64;

    let mut header = Header::new(options.warc_version);
    header.set_field(FieldKind::Type, kind.as_ref());
    header.set_field(
        FieldKind::RecordId,
        record_id.unwrap_or_else(new_record_id),
    );
    header.set_field(FieldKind::Date, date.unwrap_or_else(now));
    if let Some(url) = url {
        header.set_field(FieldKind::TargetURI, url);
    }
    for (name, value) in warc_headers {
        header.set_field(name, value);
    }

    if http_block.is_some() {
        let expected = format!("application/http; msgtype={}", kind.http_msgtype());
        match header.get_field(FieldKind::ContentType) {
            None => {
                header.set_field(FieldKind::ContentType, expected);
            }
            Some(ct) if ct.trim_start().to_ascii_lowercase().starts_with("application/http") => {}
            Some(ct) => {
                return Err(InvalidField {
                    field: FieldKind::ContentType.as_ref().to_owned(),
                    reason: format!("{:?} conflicts with the record's HTTP headers", ct),
                }
                .into());
            }
        }
    }
    header.set_field(FieldKind::BlockDigest, block_digester.finish());
    if let Some(d) = payload_digester {
        header.set_field(FieldKind::PayloadDigest, d.finish());
    }
    header.set_field(FieldKind::ContentLength, content_length.to_string());

    let mut out = Writer::new(
        Vec::with_capacity(content_length as usize + 512),
        options.compression(),
    );
    header.write_to(&mut out, options.keep_headers_case)?;
    let mut body = RecordWriter::new(out, content_length);
    if let Some(block) = &http_block {
        body.write_all(block)?;
    }
    body.write_all(&payload)?;
    let out = body.finish()?;
    Ok(out.finish()?)
}

/// A writing session for one WARC output target.
///
/// The first record written is always preceded by a `warcinfo` record naming the software, the
/// WARC format version and the target. Records are written in the order they are submitted, and
/// each write reports the record's [location](RecordLocation) in the target.
///
/// ```
/// # use warcio::{NewRecord, Options, RecordFields, WarcWriter};
/// let mut writer = WarcWriter::new(Vec::new(), "out.warc", Options::default());
/// let record = NewRecord::create("resource", RecordFields {
///     url: Some("http://example.com/".into()),
///     ..Default::default()
/// }, None).unwrap();
/// let location = writer.write_record(record).unwrap();
/// assert!(location.offset > 0, "warcinfo comes first");
/// let bytes = writer.finish().unwrap();
/// assert_eq!(bytes.len() as u64, location.offset + location.length);
/// ```
pub struct WarcWriter<W: Write> {
    dest: CountingWriter<W>,
    options: Options,
    target_name: String,
    info: IndexMap<String, String>,
    started: bool,
}

impl<W: Write> WarcWriter<W> {
    /// Write records to `dest`, which is known to readers as `target_name`.
    ///
    /// The `warcinfo` record gets `WARC-Filename` set to the last `/`-separated component of
    /// `target_name`, and `isPartOf` set to the whole name.
    pub fn new<S: Into<String>>(dest: W, target_name: S, options: Options) -> Self {
        let target_name = target_name.into();
        let version = options.warc_version;
        let mut info = IndexMap::new();
        info.insert(
            "software".to_owned(),
            format!("warcio.rs/{}", env!("CARGO_PKG_VERSION")),
        );
        info.insert(
            "format".to_owned(),
            format!("WARC File Format {}.{}", version.major, version.minor),
        );
        info.insert("isPartOf".to_owned(), target_name.clone());

        WarcWriter {
            dest: CountingWriter::new(dest),
            options,
            target_name,
            info,
            started: false,
        }
    }

    /// Set a field of the `warcinfo` record, replacing any default for the same name.
    pub fn with_info<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.info.insert(name.into(), value.into());
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The number of bytes written to the target so far.
    pub fn bytes_written(&self) -> u64 {
        self.dest.bytes_written()
    }

    fn filename(&self) -> &str {
        self.target_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.target_name)
    }

    /// Write the `warcinfo` record if nothing has been written yet.
    fn start(&mut self) -> Result<(), SerializeError> {
        if self.started {
            return Ok(());
        }
        let info = NewRecord::create_info(self.filename(), &self.info)?;
        let bytes = serialize(info, &self.options)?;
        self.dest.write_all(&bytes)?;
        debug!(
            "wrote {}-byte warcinfo record for {}",
            bytes.len(),
            self.target_name
        );
        self.started = true;
        Ok(())
    }

    fn write_serialized(&mut self, bytes: &[u8]) -> Result<RecordLocation, SerializeError> {
        let offset = self.dest.bytes_written();
        self.dest.write_all(bytes)?;
        Ok(RecordLocation {
            offset,
            length: bytes.len() as u64,
        })
    }

    /// Serialize and write one record.
    pub fn write_record(&mut self, record: NewRecord) -> Result<RecordLocation, SerializeError> {
        self.start()?;
        let bytes = serialize(record, &self.options)?;
        self.write_serialized(&bytes)
    }

    /// Serialize a batch of records in parallel, then write them in the order given.
    ///
    /// If any record fails, the records before it have been written and the error is returned.
    pub fn write_batch(
        &mut self,
        records: Vec<NewRecord>,
    ) -> Result<Vec<RecordLocation>, SerializeError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        self.start()?;
        let options = &self.options;
        let serialized: Vec<Result<Vec<u8>, SerializeError>> = records
            .into_par_iter()
            .map(|record| serialize(record, options))
            .collect();

        let mut locations = Vec::with_capacity(serialized.len());
        for bytes in serialized {
            locations.push(self.write_serialized(&bytes?)?);
        }
        Ok(locations)
    }

    /// Flush and return the output.
    ///
    /// A writer that never wrote a record writes nothing, not even `warcinfo`.
    pub fn finish(mut self) -> io::Result<W> {
        self.dest.flush()?;
        Ok(self.dest.into_inner())
    }
}
