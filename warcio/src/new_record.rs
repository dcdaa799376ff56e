//! Records under construction, before they are serialized.

use std::convert::TryFrom;
use std::fmt;
use std::io::Read;

use indexmap::IndexMap;
use thiserror::Error;

use crate::header::{FieldKind, FieldName, RecordKind};
use crate::http::HttpHeaders;
use crate::is_token;

/// A record could not be constructed because one of its fields is missing or unusable.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {field} field: {reason}")]
pub struct InvalidField {
    /// The name of the offending field.
    pub field: String,
    pub reason: String,
}

impl InvalidField {
    fn new<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// The caller-supplied fields of a record to create.
///
/// `WARC-Record-ID`, `WARC-Date` and `WARC-Target-URI` may be given either in the named fields
/// or among `warc_headers`; the named fields take precedence.
///
/// ```
/// # use warcio::{NewRecord, RecordFields};
/// let fields = RecordFields {
///     url: Some("http://example.com/".into()),
///     http_headers: Some(vec![("Content-Type".into(), "text/plain".into())]),
///     ..Default::default()
/// };
/// let record = NewRecord::create("response", fields, None).unwrap();
/// assert_eq!(record.url(), Some("http://example.com/"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFields {
    /// `WARC-Target-URI`, required for everything but `warcinfo`.
    pub url: Option<String>,
    /// `WARC-Date`; the time of serialization if absent.
    pub date: Option<String>,
    /// `WARC-Record-ID`; a new `urn:uuid` if absent.
    pub record_id: Option<String>,
    /// Additional WARC header fields, written in order after the mandatory ones.
    pub warc_headers: Vec<(String, String)>,
    /// Headers of an embedded HTTP message, for `request`, `response` and `revisit` records.
    pub http_headers: Option<Vec<(String, String)>>,
    /// The HTTP request or status line; defaulted from the record kind if absent.
    pub status_line: Option<String>,
}

/// A validated record that has not yet been written.
///
/// Content is pulled from the supplied reader only when the record is serialized, and
/// `Content-Length` and digests are derived from it then. A `NewRecord` is consumed by
/// serialization.
pub struct NewRecord {
    pub(crate) kind: RecordKind,
    pub(crate) url: Option<String>,
    pub(crate) date: Option<String>,
    pub(crate) record_id: Option<String>,
    pub(crate) warc_headers: Vec<(FieldName, String)>,
    pub(crate) http_headers: Option<HttpHeaders>,
    pub(crate) content: Option<Box<dyn Read + Send>>,
}

impl fmt::Debug for NewRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NewRecord")
            .field("kind", &self.kind)
            .field("url", &self.url)
            .field("date", &self.date)
            .field("record_id", &self.record_id)
            .field("warc_headers", &self.warc_headers)
            .field("http_headers", &self.http_headers)
            .field("has_content", &self.content.is_some())
            .finish()
    }
}

/// Fields whose values are always computed by the serializer.
const DERIVED_FIELDS: &[FieldKind] = &[
    FieldKind::ContentLength,
    FieldKind::BlockDigest,
    FieldKind::PayloadDigest,
    FieldKind::Type,
];

fn check_value(field: &str, value: &str) -> Result<(), InvalidField> {
    if value.contains(|c| c == '\r' || c == '\n') {
        return Err(InvalidField::new(field, "value contains a line break"));
    }
    Ok(())
}

impl NewRecord {
    /// Construct a record of the kind named by `kind` (the `WARC-Type` value).
    ///
    /// Fails if the kind is not one of the standard record types, if a target URI is missing
    /// for a kind that requires one, if HTTP headers are given for a kind that can't carry
    /// them, or if any header name or value can't be written in a WARC header.
    pub fn create(
        kind: &str,
        fields: RecordFields,
        content: Option<Box<dyn Read + Send>>,
    ) -> Result<NewRecord, InvalidField> {
        let kind = RecordKind::try_from(kind).map_err(|_| {
            InvalidField::new(
                FieldKind::Type.as_ref(),
                format!("{:?} is not a known record type", kind),
            )
        })?;

        let RecordFields {
            mut url,
            mut date,
            mut record_id,
            warc_headers: raw_headers,
            http_headers: raw_http,
            status_line,
        } = fields;

        let mut warc_headers = Vec::with_capacity(raw_headers.len());
        for (name, value) in raw_headers {
            if !is_token(&name) {
                return Err(InvalidField::new(name, "name is not a valid WARC field name"));
            }
            check_value(&name, &value)?;

            let name = FieldName::from(name);
            let slot = match name {
                FieldName::Known(FieldKind::RecordId) => &mut record_id,
                FieldName::Known(FieldKind::Date) => &mut date,
                FieldName::Known(FieldKind::TargetURI) => &mut url,
                FieldName::Known(k) if DERIVED_FIELDS.contains(&k) => {
                    return Err(InvalidField::new(
                        k.as_ref(),
                        "field is set by the serializer",
                    ));
                }
                _ => {
                    warc_headers.push((name, value));
                    continue;
                }
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        for (field, value) in [
            (FieldKind::TargetURI, &url),
            (FieldKind::Date, &date),
            (FieldKind::RecordId, &record_id),
        ]
        .iter()
        {
            if let Some(value) = value {
                check_value(field.as_ref(), value)?;
            }
        }

        if url.is_none() && kind.requires_target_uri() {
            return Err(InvalidField::new(
                FieldKind::TargetURI.as_ref(),
                format!("required for {} records", kind.as_ref()),
            ));
        }

        let http_headers = match raw_http {
            None => None,
            Some(_) if !kind.carries_http() => {
                return Err(InvalidField::new(
                    "HTTP headers",
                    format!("{} records cannot carry HTTP headers", kind.as_ref()),
                ));
            }
            Some(raw) => {
                let status_line = match status_line {
                    Some(line) => line,
                    None => HttpHeaders::default_status_line(kind, url.as_deref().unwrap_or("")),
                };
                check_value("HTTP status line", &status_line)?;
                let mut headers = HttpHeaders::new(status_line);
                for (name, value) in raw {
                    if !is_token(&name) {
                        return Err(InvalidField::new(name, "name is not a valid HTTP header name"));
                    }
                    check_value(&name, &value)?;
                    headers.append(name, value);
                }
                Some(headers)
            }
        };

        Ok(NewRecord {
            kind,
            url,
            date,
            record_id,
            warc_headers,
            http_headers,
            content,
        })
    }

    /// Construct a `warcinfo` record describing the file named `filename`.
    ///
    /// The content is the `info` entries as `application/warc-fields`, one `name: value` line
    /// each.
    ///
    /// ```
    /// # use indexmap::IndexMap;
    /// # use warcio::NewRecord;
    /// let mut info = IndexMap::new();
    /// info.insert("software".to_owned(), "warcio.rs".to_owned());
    /// let record = NewRecord::create_info("example.warc", &info).unwrap();
    /// assert_eq!(record.kind(), warcio::RecordKind::Info);
    /// ```
    pub fn create_info(
        filename: &str,
        info: &IndexMap<String, String>,
    ) -> Result<NewRecord, InvalidField> {
        let mut content = Vec::new();
        for (name, value) in info {
            if !is_token(name) {
                return Err(InvalidField::new(
                    name.as_str(),
                    "name is not a valid warc-fields name",
                ));
            }
            check_value(name, value)?;
            content.extend_from_slice(name.as_bytes());
            content.extend_from_slice(b": ");
            content.extend_from_slice(value.as_bytes());
            content.extend_from_slice(b"\r\n");
        }

        let fields = RecordFields {
            warc_headers: vec![
                (FieldKind::Filename.as_ref().to_owned(), filename.to_owned()),
                (
                    FieldKind::ContentType.as_ref().to_owned(),
                    "application/warc-fields".to_owned(),
                ),
            ],
            ..Default::default()
        };
        NewRecord::create(
            RecordKind::Info.as_ref(),
            fields,
            Some(Box::new(std::io::Cursor::new(content))),
        )
    }

    /// Replace the record's content.
    pub fn with_content<C: Read + Send + 'static>(mut self, content: C) -> Self {
        self.content = Some(Box::new(content));
        self
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn http_headers(&self) -> Option<&HttpHeaders> {
        self.http_headers.as_ref()
    }
}
