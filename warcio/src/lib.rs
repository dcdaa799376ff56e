//! Tools for reading, writing, and indexing WARC (Web ARChive) files.
//!
//! ## Background
//!
//! WARC files are used to store digital resources and related information, generally for archival
//! storage. They are most commonly used to store the results of web crawls, wherein a crawler
//! requests resources from any desired web server(s) while storing the request that was sent for
//! each resource, the corresponding response, metadata for each and optionally other related
//! information. WARC files are widely used by organizations involved in web archiving, such as the
//! [Internet Archive](https://archive.org) and the [Library of
//! Congress](https://www.loc.gov/preservation/digital/formats/fdd/fdd000236.shtml).
//!
//! The WARC file format is formalized in an international standard, ISO 28500, which to date has
//! two published versions: ISO 28500:2009 (WARC 1.0) and ISO 28500:2017 (WARC 1.1). Freely
//! available specifications are published by the IIPC: see
//! <https://iipc.github.io/warc-specifications/>.
//!
//! ## WARC structure
//!
//! A WARC file is a simple concatenation of records. Each record has a format similar to an HTTP
//! message, consisting of a version declaration, a number of header fields, and any number of bytes
//! of data. A simple record representing an HTTP request might look like this:
//!
//! ```text
//! WARC/1.1
//! WARC-Type: request
//! WARC-Target-URI: https://example.com
//! Content-Type: application/http;msgtype=request
//! WARC-Record-ID: <urn:uuid:e061d11b-fb0a-4314-88c5-54e4870be701>
//! WARC-Date: 2021-08-24T23:19:14Z
//! Content-Length: 135
//!
//! GET /image/png HTTP/1.1
//! User-Agent: Wget/1.21.1
//! Accept: */*
//! Accept-Encoding: identity
//! Host: httpbin.org
//! Connection: Keep-Alive
//!
//!
//!
//! ```
//!
//! Collectively the portion of the record before `GET` in this example is the record header,
//! and the remainder is the record block with the exception of two newlines (each of them `\r\n`)
//! at the end of the record.
//!
//! ## Library structure
//!
//!  * [`RecordReader`] walks a byte source and yields streaming [`Record`]s, remembering where
//!    each one started so it can be located again later.
//!  * [`NewRecord`] describes a record to be written, and [`WarcWriter`] turns a sequence of them
//!    into archive bytes (prefixed by a synthesized `warcinfo` record) with digests computed on
//!    the way through.
//!  * [`index::CdxIndexer`] produces one [`index::CdxEntry`] per record in one or more sources.
//!  * [`random_access::read_record_at`] takes an offset and length from an index entry and parses
//!    that single record without touching the rest of the source.

#[macro_use]
extern crate log;

use thiserror::Error;

pub mod compression;
mod counting;
pub mod digest;
mod header;
pub mod http;
pub mod index;
mod new_record;
mod options;
pub mod random_access;
pub mod reader;
pub mod record;
#[cfg(test)]
mod tests;
mod version;
pub mod writer;

pub use compression::Compression;
pub use counting::{CountingReader, CountingWriter};
pub use digest::DigestAlgo;
pub use header::{FieldKind, FieldName, Header, RecordKind};
pub use http::HttpHeaders;
pub use new_record::{InvalidField, NewRecord, RecordFields};
pub use options::Options;
pub use reader::RecordReader;
pub use record::{ContentError, InvalidRecord, Record};
pub use version::Version;
pub use writer::{RecordLocation, WarcWriter};

/// Reasons it may be impossible to parse a WARC header.
#[derive(Debug, Error)]
pub enum HeaderParseError {
    /// The WARC/m.n signature marking the start of a record is not present or invalid.
    ///
    /// The contained value is a UTF-8 interpretation of the data that was attempted to be parsed.
    #[error("WARC signature missing or invalid (near \"{0}\")")]
    InvalidSignature(String),
    /// A header field was malformed.
    #[error("header field is malformed")]
    MalformedField,
    /// An I/O error occured while trying to read the input.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// The parser reached the end of the input before the end of the WARC header.
    #[error("input ended before end of header")]
    Truncated,
    /// No end of the header was found within the given number of bytes.
    #[error("header is longer than {0} bytes")]
    TooLong(usize),
}

impl std::cmp::PartialEq for HeaderParseError {
    fn eq(&self, other: &Self) -> bool {
        use HeaderParseError::*;

        match (self, other) {
            (MalformedField, MalformedField) | (Truncated, Truncated) => true,
            (InvalidSignature(x), InvalidSignature(y)) => x == y,
            (TooLong(x), TooLong(y)) => x == y,
            (IoError(e1), IoError(e2)) => e1.kind() == e2.kind(),
            (_, _) => false,
        }
    }
}

impl HeaderParseError {
    fn invalid_signature(sig_bytes: &[u8]) -> Self {
        HeaderParseError::InvalidSignature(String::from_utf8_lossy(sig_bytes).into_owned())
    }
}

/// WARC EBNF "separators" class
const SEPARATORS: &[u8] = &[
    b'(', b')', b'<', b'>', b'@', b',', b';', b':', b'\\', b'"', b'/', b'[', b']', b'?', b'=',
    b'{', b'}', b' ', b'\t',
];

/// Return `true` if `b` may appear in a `token` (a field name): any ASCII except CTLs
/// (0-31 and DEL) or separators.
fn is_token_byte(b: u8) -> bool {
    b.is_ascii() && !b.is_ascii_control() && !SEPARATORS.contains(&b)
}

/// Return `true` if `s` is a non-empty WARC `token`.
pub(crate) fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_token_byte)
}
