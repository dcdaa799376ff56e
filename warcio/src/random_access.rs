//! Reading single records by location, as found in an index.
//!
//! Given the offset and length of a record (from a [`CdxEntry`](crate::index::CdxEntry) for
//! instance), only those bytes of the source are read. They must hold exactly one complete
//! record: anything else means the index doesn't describe the source.

use std::io::{self, Cursor, Read, Seek, SeekFrom};

use thiserror::Error;

use crate::header::Header;
use crate::record::{Buffer, FinishError, InvalidRecord, Record};
use crate::Compression;

#[derive(Debug, Error)]
pub enum RangeError {
    /// The source ends before the end of the requested range.
    #[error("range of {length} bytes at offset {offset} exceeds source length {available}")]
    OutOfRange {
        offset: u64,
        length: u64,
        available: u64,
    },
    /// The requested bytes are not exactly one well-formed record.
    #[error("requested range does not hold a single record")]
    Record(#[from] InvalidRecord),
    #[error("I/O error reading range")]
    Io(#[from] io::Error),
}

/// Read the record occupying `length` bytes at `offset` in `source`.
///
/// A record stored as a gzip member is recognized by its magic number and decompressed.
pub fn read_record_at<R: Read + Seek>(
    mut source: R,
    offset: u64,
    length: u64,
) -> Result<Record<Cursor<Vec<u8>>>, RangeError> {
    let available = source.seek(SeekFrom::End(0))?;
    if offset.checked_add(length).map_or(true, |end| end > available) {
        return Err(RangeError::OutOfRange {
            offset,
            length,
            available,
        });
    }

    source.seek(SeekFrom::Start(offset))?;
    let mut bytes = vec![0u8; length as usize];
    source.read_exact(&mut bytes)?;
    trace!("read {} bytes at offset {}", length, offset);
    record_from_bytes(bytes, offset)
}

/// Parse `bytes`, which were found at `offset` in some source, as exactly one record.
pub fn record_from_bytes(
    bytes: Vec<u8>,
    offset: u64,
) -> Result<Record<Cursor<Vec<u8>>>, RangeError> {
    let bytes = match Compression::detect(&bytes) {
        Compression::None => bytes,
        Compression::Gzip => gunzip_member(&bytes, offset)?,
    };

    let total = bytes.len() as u64;
    let has_tail = bytes.ends_with(b"\r\n\r\n");
    let header_len = Header::parse(&bytes).map_or(0, |(_, n)| n as u64);

    let record = Record::read_at(Cursor::new(bytes), Buffer::new(), Compression::None, offset)
        .map_err(|e| match e {
            InvalidRecord::EndOfStream => InvalidRecord::MalformedRecord {
                offset,
                expected: "WARC/<version> line".to_owned(),
                found: String::new(),
            },
            e => e,
        })?;

    let expected = header_len + record.len() + 4;
    if expected != total {
        return Err(InvalidRecord::MalformedRecord {
            offset,
            expected: format!("a record of {} bytes", expected),
            found: format!("{} bytes", total),
        }
        .into());
    }
    if !has_tail {
        return Err(FinishError::MissingTail.into_invalid_record(offset).into());
    }
    Ok(record.rewindable())
}

/// Decompress a single gzip member, which must fill `bytes` entirely.
fn gunzip_member(bytes: &[u8], offset: u64) -> Result<Vec<u8>, RangeError> {
    let mut decoder = flate2::bufread::GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;

    let trailing = decoder.into_inner().len();
    if trailing > 0 {
        return Err(InvalidRecord::MalformedRecord {
            offset,
            expected: "a single gzip member".to_owned(),
            found: format!("{} bytes after the end of the member", trailing),
        }
        .into());
    }
    Ok(out)
}
