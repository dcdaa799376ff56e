//! WARC record header data structures.

use std::io::{BufRead, Write};
use std::str;

use indexmap::map::IndexMap;

pub use fieldkind::FieldKind;
pub use fieldname::FieldName;
pub use recordkind::RecordKind;

use crate::http::canonical_case;
use crate::version::Version;
use crate::{is_token, is_token_byte, HeaderParseError};

mod fieldkind;
mod fieldname;
mod recordkind;

// We use an IndexMap to preserve the read order of fields when writing them back out;
// std::collections::HashMap randomizes ordering.
type FieldMap = IndexMap<FieldName, Vec<u8>>;

/// The header of a WARC record.
///
/// Field values can be accessed using the [`get_field`](Self::get_field) family of functions, or
/// accessed in parsed form through specific methods such as
/// [`content_length`](Self::content_length). Field values are set with
/// [`set_field`](Self::set_field), which keeps the position of a field that already exists.
///
/// ```
/// # use warcio::{Header, Version, FieldKind};
/// // Parse a header from bytes
/// let raw_header = b"\
/// WARC/1.1\r
/// WARC-Record-ID: <urn:uuid:b4beb26f-54c4-4277-8e23-51aa9fc4476d>\r
/// WARC-Date: 2021-08-05T06:22Z\r
/// WARC-Type: resource\r
/// Content-Length: 0\r
/// \r
/// ";
/// let (parsed_header, parsed_size) = Header::parse(raw_header).unwrap();
/// assert_eq!(parsed_size, raw_header.len());
///
/// // Construct a header from nothing
/// let mut synthetic_header = Header::new(Version::WARC1_1);
/// synthetic_header.set_field(FieldKind::RecordId,
///                            "<urn:uuid:b4beb26f-54c4-4277-8e23-51aa9fc4476d>");
/// synthetic_header.set_field(FieldKind::Date, "2021-08-05T06:22Z");
/// synthetic_header.set_field(FieldKind::Type, "resource");
/// synthetic_header.set_field(FieldKind::ContentLength, "0");
///
/// // Headers compare equal because they have the same version and fields
/// assert_eq!(parsed_header, synthetic_header);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Header {
    version: Version,
    fields: FieldMap,
}

impl Header {
    pub fn new<V: Into<Version>>(version: V) -> Self {
        Header {
            version: version.into(),
            fields: Default::default(),
        }
    }

    /// Parse a header from bytes, returning the header and the number of bytes consumed.
    pub fn parse(mut bytes: &[u8]) -> Result<(Header, usize), HeaderParseError> {
        let (version_consumed, version) = Version::parse(bytes)?;
        bytes = &bytes[version_consumed..];

        let mut fields: FieldMap = Default::default();
        let mut headers_consumed = 0;
        loop {
            match bytes.get(..2) {
                Some([b'\r', b'\n', ..]) => break,
                Some(_) => { /* Not end of headers, so probably a field */ }
                None => return Err(HeaderParseError::Truncated),
            }

            let (name, value, sz) = Self::parse_field(bytes)?;
            let name =
                str::from_utf8(name).expect("parse_field should only accept ASCII field names");
            fields.insert(name.into(), value);
            bytes = &bytes[sz..];
            headers_consumed += sz;
        }

        Ok((
            Header { version, fields },
            version_consumed + headers_consumed + 2,
        ))
    }

    pub(crate) fn parse_field(bytes: &[u8]) -> Result<(&[u8], Vec<u8>, usize), HeaderParseError> {
        if bytes.is_empty() {
            return Err(HeaderParseError::Truncated);
        }

        // field-name: at least one token, which is an ASCII value excluding CTL or SEPARATORS
        let name_end = match bytes.iter().position(|&b| !is_token_byte(b)) {
            Some(0) => return Err(HeaderParseError::MalformedField),
            Some(i) => i,
            // Every byte so far could be part of a name; need more input
            None => return Err(HeaderParseError::Truncated),
        };
        // literal colon must follow field-name
        match bytes.get(name_end) {
            None => return Err(HeaderParseError::Truncated),
            Some(b':') => { /* Correctly formed */ }
            Some(_) => return Err(HeaderParseError::MalformedField),
        }

        let mut chunk_start = name_end + 1;
        let mut value: Vec<u8> = vec![];
        let consumed = loop {
            // Trim leading whitespace
            chunk_start += match bytes[chunk_start..]
                .iter()
                .position(|&x| x != b' ' && x != b'\t')
            {
                None => return Err(HeaderParseError::Truncated),
                Some(idx) => idx,
            };

            // Take data until CRLF
            let chunk_end = match bytes[chunk_start..].windows(2).position(|s| s == b"\r\n") {
                Some(idx) => chunk_start + idx,
                None => return Err(HeaderParseError::Truncated),
            };
            value.extend_from_slice(&bytes[chunk_start..chunk_end]);

            // Stop if the following byte after CRLF isn't LWS, otherwise continue since it's a
            // folded line.
            match bytes.get(chunk_end + 2) {
                // LWS follows: this is a folded line. Advance to it.
                Some(b' ') | Some(b'\t') => {
                    chunk_start = chunk_end + 2;
                    continue;
                }
                // Non-LWS: end of this field
                Some(_) => break chunk_end + 2,
                // Absent: can't tell
                None => return Err(HeaderParseError::Truncated),
            }
        };

        // Trailing whitespace is not part of the value
        while value.last().map_or(false, |&b| b == b' ' || b == b'\t') {
            value.pop();
        }

        Ok((&bytes[..name_end], value, consumed))
    }

    /// Write the version line, fields and terminating blank line of this header.
    ///
    /// Standardized field names are always written in their standard case. Other names are
    /// written as they were set if `keep_case` is `true`, otherwise in canonical
    /// `Dash-Separated-Title-Case`. Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, mut dest: W, keep_case: bool) -> std::io::Result<usize> {
        let mut written = 0;
        let version_line = format!("{}\r\n", self.version);
        dest.write_all(version_line.as_bytes())?;
        written += version_line.len();

        for (name, value) in self.iter_field_bytes() {
            let name = match name {
                FieldName::Other(s) if !keep_case => canonical_case(s),
                _ => name.as_ref().to_owned(),
            };
            dest.write_all(name.as_bytes())?;
            dest.write_all(b": ")?;
            dest.write_all(value)?;
            dest.write_all(b"\r\n")?;
            written += name.len() + 2 + value.len() + 2;
        }

        dest.write_all(b"\r\n")?;
        Ok(written + 2)
    }

    /// Serialize this header to a new buffer, as for [`write_to`](Self::write_to).
    pub fn to_bytes(&self, keep_case: bool) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out, keep_case)
            .expect("writing to a Vec cannot fail");
        out
    }

    /// Get the value of a header field as bytes, or None if no such header exists.
    ///
    /// Although the WARC specification does not permit values that are not also valid Rust strings,
    /// users that wish to be lenient in accepting malformed records may wish to relax that
    /// requirement by using this function.
    ///
    /// ## URL translation
    ///
    /// For fields that are [defined to contain a bare URI by the
    /// specification](FieldName::value_is_bare_uri), this function will strip surrounding angle
    /// brackets from the value if the [WARC version](Version) of the record is less than 1.1
    /// and they are present. This hides the changed definition of a URL in the standard from
    /// version 1.1.
    pub fn get_field_bytes<F: Into<FieldName>>(&self, field: F) -> Option<&[u8]> {
        let field = field.into();
        if !field.value_is_bare_uri() {
            return self.get_field_bytes_raw(field);
        }

        let mut value = self.get_field_bytes_raw(field)?;
        if self.version <= Version::WARC1_0 {
            // Strip angle brackets for pre-1.1 WARC versions
            if value.first() == Some(&b'<') && value.last() == Some(&b'>') {
                value = &value[1..value.len() - 1];
            }
        }
        Some(value)
    }

    /// Get the value of a header field as bytes, without URL translation.
    ///
    /// This function works like [`get_field_bytes`](Self::get_field_bytes), except bare URIs are
    /// not translated.
    pub fn get_field_bytes_raw<F: Into<FieldName>>(&self, field: F) -> Option<&[u8]> {
        self.fields.get(&field.into()).map(Vec::as_slice)
    }

    /// Get the value of a header field, or None if it does not exist or is not a valid Rust string.
    ///
    /// This function transforms fields that are bare URIs in the same way as
    /// [`get_field_bytes`](Header::get_field_bytes), stripping angle brackets from
    /// the value when the record's WARC version is pre-1.1.
    pub fn get_field<F: Into<FieldName>>(&self, field: F) -> Option<&str> {
        str::from_utf8(self.get_field_bytes(field)?).ok()
    }

    /// Set the value of a header field, returning the old value (if any).
    ///
    /// This function will panic if the provided name contains characters that are not
    /// permitted in `field-name` context. The value will have angle brackets added if
    /// the field value is a [bare URI](FieldName::value_is_bare_uri) and the record's WARC
    /// version is pre-1.1, performing the opposite transformation of
    /// [`get_field_bytes`](Header::get_field_bytes).
    ///
    /// Setting a field that already exists keeps its original position in the field order.
    pub fn set_field<N: Into<FieldName>, V: Into<Vec<u8>>>(
        &mut self,
        name: N,
        value: V,
    ) -> Option<Vec<u8>> {
        let name = name.into();
        assert!(
            is_token(name.as_ref()),
            "field name {:?} contains illegal characters",
            name
        );

        let mut value = value.into();
        if name.value_is_bare_uri() && self.version < Version::WARC1_1 {
            value.reserve_exact(2);
            value.insert(0, b'<');
            value.push(b'>');
        }
        self.fields.insert(name, value)
    }

    /// Get an iterator over the fields in this header.
    ///
    /// In comparison to [`get_field_bytes`](Self::get_field_bytes), the values yielded by this
    /// iterator will have the raw value to be read or written from a serialized record, including
    /// angle brackets or not for values which are [bare URIs](FieldName::value_is_bare_uri) based
    /// on the WARC version.
    pub fn iter_field_bytes(&self) -> impl Iterator<Item = (&FieldName, &[u8])> {
        self.fields.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Get an iterator over mutable field values.
    pub fn iter_field_bytes_mut(&mut self) -> impl Iterator<Item = (&FieldName, &mut Vec<u8>)> {
        self.fields.iter_mut()
    }

    /// Get the WARC version of this record.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Update the WARC version of this header.
    ///
    /// This will update any bare URIs to account for version differences as described for
    /// [`set_field`](Self::set_field), then set the version to the provided one.
    pub fn set_version<V: Into<Version>>(&mut self, version: V) {
        let version = version.into();
        let transform: Option<fn(&mut Vec<u8>)> =
            if self.version <= Version::WARC1_0 && version > Version::WARC1_0 {
                // Upgrading: remove angle brackets if present. Malformed pre-1.1 records might
                // not have brackets.
                Some(|v| {
                    if v.starts_with(b"<") && v.ends_with(b">") {
                        v.pop();
                        v.remove(0);
                    }
                })
            } else if version < Version::WARC1_1 && self.version >= Version::WARC1_1 {
                // Downgrading: add angle brackets if not present. Malformed post-1.1 records
                // might already have brackets.
                Some(|v| {
                    if !(v.starts_with(b"<") && v.ends_with(b">")) {
                        v.insert(0, b'<');
                        v.push(b'>');
                    }
                })
            } else {
                None
            };

        if let Some(transform) = transform {
            for (name, value) in self.iter_field_bytes_mut() {
                if name.value_is_bare_uri() {
                    transform(value);
                }
            }
        }
        self.version = version;
    }

    /// Get the [`WARC-Record-ID`](FieldKind::RecordId) field value.
    ///
    /// `WARC-Record-ID` is a mandatory WARC field, so if it is not present this
    /// function will panic. If the caller wishes to be lenient in this situation,
    /// use [`get_field`](Header::get_field) to read the field instead.
    pub fn record_id(&self) -> &str {
        self.get_field(FieldKind::RecordId)
            .expect("record header does not have a WARC-Record-ID")
    }

    /// Get the record [`Content-Length`](FieldKind::ContentLength) or panic.
    ///
    /// `Content-Length` is a mandatory WARC field, so if it is not present or does not
    /// represent a valid length, this function will panic. If the caller wishes to be
    /// lenient and accept records without comprehensible length, use
    /// [`content_length_lenient`](Header::content_length_lenient) or
    /// [`get_field`](Header::get_field) to read as an optional value instead.
    pub fn content_length(&self) -> u64 {
        self.get_field(FieldKind::ContentLength)
            .expect("record header does not have a Content-Length")
            .parse()
            .expect("record Content-Length is not a valid integer")
    }

    /// Get the record `Content-Length`, if valid.
    ///
    /// If not present or not parseable as an integer, returns None.
    pub fn content_length_lenient(&self) -> Option<u64> {
        let value = self.get_field(FieldKind::ContentLength)?;
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        value.parse().ok()
    }

    /// Get the [`WARC-Date`](FieldKind::Date) field value, parsed as a `DateTime`.
    ///
    /// Returns `None` if the field is missing or not a valid RFC 3339 timestamp. We're slightly
    /// lenient in accepting non-UTC zone offsets, which are converted to UTC.
    pub fn warc_date_parsed(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        use chrono::{DateTime, Utc};

        let s = self.get_field(FieldKind::Date)?;
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }

    /// Get the record type as one of the standard kinds.
    ///
    /// Returns `None` if the `WARC-Type` field is missing or names a type this library does not
    /// know about. Software *shall* skip records of unknown type.
    pub fn record_kind(&self) -> Option<RecordKind> {
        use std::convert::TryFrom;

        RecordKind::try_from(self.get_field(FieldKind::Type)?).ok()
    }

    /// Get the [`WARC-Target-URI`](FieldKind::TargetURI) of the record, if present.
    pub fn target_uri(&self) -> Option<&str> {
        self.get_field(FieldKind::TargetURI)
    }
}

/// Longest header accepted from a stream before giving up on finding its end.
const MAX_HEADER_LEN: usize = 1 << 20;

/// Parse a WARC record header out of the provided `BufRead`.
///
/// Consumes the bytes that are parsed, leaving the reader at the beginning
/// of the record payload. In case of an error in parsing, some or all of the
/// input may be consumed.
///
/// If the input is empty, returns [`HeaderParseError::Truncated`]. If the input ends after a
/// valid version line but before the blank line ending the header, returns
/// [`HeaderParseError::MalformedField`]; if it ends before a complete version line, returns
/// [`HeaderParseError::InvalidSignature`].
pub(crate) fn get_record_header<R: BufRead>(mut reader: R) -> Result<Header, HeaderParseError> {
    // Usually the whole header is already buffered and can be parsed in place
    {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Err(HeaderParseError::Truncated);
        }
        match Header::parse(buf) {
            Ok((header, n)) => {
                trace!("parsed {}-byte header in place", n);
                reader.consume(n);
                return Ok(header);
            }
            Err(HeaderParseError::Truncated) => {}
            Err(e) => return Err(e),
        }
    }

    // Otherwise accumulate a copy until the end of the header turns up, consuming only what is
    // known to be part of it.
    let mut owned = Vec::new();
    loop {
        let searched = owned.len();
        owned.extend_from_slice(reader.fill_buf()?);
        if owned.len() == searched {
            return Err(match Version::parse(&owned) {
                Ok(_) => HeaderParseError::MalformedField,
                Err(HeaderParseError::Truncated) => HeaderParseError::invalid_signature(&owned),
                Err(e) => e,
            });
        }

        match Header::parse(&owned) {
            Ok((header, n)) => {
                trace!("parsed {}-byte header spanning buffer refills", n);
                reader.consume(n - searched);
                return Ok(header);
            }
            Err(HeaderParseError::Truncated) if owned.len() < MAX_HEADER_LEN => {
                reader.consume(owned.len() - searched);
            }
            Err(HeaderParseError::Truncated) => {
                return Err(HeaderParseError::TooLong(MAX_HEADER_LEN));
            }
            Err(e) => return Err(e),
        }
    }
}
