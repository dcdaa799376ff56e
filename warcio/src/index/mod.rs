//! Indexes locating records within WARC files.
//!
//! A [`CdxIndexer`] parses every record of one or more sources and yields a [`CdxEntry`] for each,
//! giving the record's URL, date and digest along with its offset and length in the source. Those
//! are exactly what [`random_access::read_record_at`](crate::random_access::read_record_at) needs
//! to retrieve the record again.
//!
//! Entries are written and read as [CDXJ](https://specs.webrecorder.net/cdxj/0.1.0/) lines.

use std::io::{self, BufRead};

use thiserror::Error;

use crate::header::FieldKind;
use crate::reader::RecordReader;
use crate::record::InvalidRecord;
use crate::{Compression, Options};

mod cdxj;

pub use cdxj::{surt, CdxjError};

/// The index entry for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdxEntry {
    /// The record's `WARC-Target-URI`, if any.
    pub url: Option<String>,
    /// The record's `WARC-Date`.
    pub date: Option<String>,
    /// Position of the record's first byte in its source.
    pub offset: u64,
    /// Length of the record as stored, from its version line through the tail (or the whole gzip
    /// member, if compressed).
    pub length: u64,
    /// Name of the source containing the record.
    pub filename: String,
    /// The `WARC-Payload-Digest` of the record, or its `WARC-Block-Digest` if it has no payload
    /// digest.
    pub digest: Option<String>,
}

#[derive(Debug, Error)]
pub enum IndexError {
    /// A source could not be opened or read.
    #[error("unable to read {filename}")]
    Source {
        filename: String,
        #[source]
        source: io::Error,
    },
    /// A source contains something other than well-formed records.
    #[error("invalid record in {filename}")]
    Record {
        filename: String,
        #[source]
        source: InvalidRecord,
    },
}

impl IndexError {
    fn from_record(filename: &str, e: InvalidRecord) -> Self {
        match e {
            InvalidRecord::IoError(source) => IndexError::Source {
                filename: filename.to_owned(),
                source,
            },
            source => IndexError::Record {
                filename: filename.to_owned(),
                source,
            },
        }
    }
}

/// Something an index can be built from: a name and a way to read it.
pub trait IndexSource {
    type Reader: BufRead;

    /// The name recorded as the [`filename`](CdxEntry::filename) of entries from this source.
    fn name(&self) -> String;

    fn open(self) -> io::Result<Self::Reader>;
}

/// An already-open reader with a name.
impl<R: BufRead> IndexSource for (String, R) {
    type Reader = R;

    fn name(&self) -> String {
        self.0.clone()
    }

    fn open(self) -> io::Result<R> {
        Ok(self.1)
    }
}

/// Iterates over index entries for every record in a sequence of sources.
///
/// Sources are read in order, and each entry's offset is relative to the start of its own source.
/// The first error ends iteration: an index missing records after a corrupt one would silently
/// point at the wrong data, so there is no recovery.
///
/// ```
/// # use warcio::index::CdxIndexer;
/// # use warcio::Options;
/// let data = &b"WARC/1.1\r\nWARC-Type: resource\r\nWARC-Target-URI: http://example.com/\r\n\
///               Content-Length: 0\r\n\r\n\r\n\r\n"[..];
/// let entries = CdxIndexer::new(vec![("a.warc".to_owned(), data)], &Options::default())
///     .collect::<Result<Vec<_>, _>>()
///     .unwrap();
/// assert_eq!(entries[0].url.as_deref(), Some("http://example.com/"));
/// assert_eq!(entries[0].length, data.len() as u64);
/// ```
pub struct CdxIndexer<I, S>
where
    I: Iterator<Item = S>,
    S: IndexSource,
{
    sources: I,
    current: Option<(String, RecordReader<S::Reader>)>,
    compression: Compression,
    failed: bool,
}

impl<I, S> CdxIndexer<I, S>
where
    I: Iterator<Item = S>,
    S: IndexSource,
{
    /// Index `sources`, whose records are compressed if `options.gzip` is set.
    pub fn new<T: IntoIterator<IntoIter = I, Item = S>>(sources: T, options: &Options) -> Self {
        CdxIndexer {
            sources: sources.into_iter(),
            current: None,
            compression: options.compression(),
            failed: false,
        }
    }
}

impl<I, S> Iterator for CdxIndexer<I, S>
where
    I: Iterator<Item = S>,
    S: IndexSource,
{
    type Item = Result<CdxEntry, IndexError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.failed {
            if let Some((filename, reader)) = self.current.as_mut() {
                match next_entry(reader, filename) {
                    Some(Ok(entry)) => return Some(Ok(entry)),
                    Some(Err(e)) => {
                        self.failed = true;
                        return Some(Err(IndexError::from_record(filename, e)));
                    }
                    None => {
                        debug!("finished indexing {}", filename);
                        self.current = None;
                    }
                }
            }

            let source = self.sources.next()?;
            let filename = source.name();
            match source.open() {
                Ok(input) => {
                    debug!("indexing {}", filename);
                    self.current = Some((filename, RecordReader::new(input, self.compression)));
                }
                Err(source) => {
                    self.failed = true;
                    return Some(Err(IndexError::Source { filename, source }));
                }
            }
        }
        None
    }
}

/// Read one record and describe it.
fn next_entry<R: BufRead>(
    reader: &mut RecordReader<R>,
    filename: &str,
) -> Option<Result<CdxEntry, InvalidRecord>> {
    let record = match reader.next()? {
        Ok(record) => record,
        Err(e) => return Some(Err(e)),
    };

    let offset = record.offset();
    let header = &record.header;
    let url = header.target_uri().map(str::to_owned);
    let date = header.get_field(FieldKind::Date).map(str::to_owned);
    let digest = header
        .get_field(FieldKind::PayloadDigest)
        .or_else(|| header.get_field(FieldKind::BlockDigest))
        .map(str::to_owned);

    let end = match record.finish() {
        Ok((input, buffer)) => {
            let end = input.position();
            reader.recycle_buffer(buffer);
            end
        }
        Err(e) => return Some(Err(e.into_invalid_record(offset))),
    };
    trace!("indexed record at {}+{}", offset, end - offset);

    Some(Ok(CdxEntry {
        url,
        date,
        offset,
        length: end - offset,
        filename: filename.to_owned(),
        digest,
    }))
}
