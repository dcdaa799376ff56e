//! HTTP header blocks embedded in `request`, `response` and `revisit` records.
//!
//! A record holding an HTTP message stores it verbatim in its block: the status (or request)
//! line, header lines and a blank line, followed by the entity body. [`HttpHeaders`] is the
//! parsed form of everything before the body.

use std::fmt;

use crate::RecordKind;

/// The most header lines accepted in one HTTP header block.
const MAX_HTTP_HEADERS: usize = 128;

/// The status line and header fields of an HTTP message.
///
/// Header order and duplicates are preserved. Lookups by name are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHeaders {
    status_line: String,
    headers: Vec<(String, String)>,
}

/// Reasons an HTTP header block could not be parsed.
#[derive(Debug, PartialEq, Eq)]
pub enum HttpParseError {
    /// The block ended before the blank line terminating the headers.
    Partial,
    /// The block is not a well-formed HTTP message head.
    Invalid(httparse::Error),
}

impl fmt::Display for HttpParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HttpParseError::Partial => write!(f, "HTTP header block is incomplete"),
            HttpParseError::Invalid(e) => write!(f, "invalid HTTP header block: {}", e),
        }
    }
}

impl std::error::Error for HttpParseError {}

impl HttpHeaders {
    /// Create an empty set of headers with the given status (or request) line.
    pub fn new<S: Into<String>>(status_line: S) -> Self {
        HttpHeaders {
            status_line: status_line.into(),
            headers: Vec::new(),
        }
    }

    /// The status line to use for a record of the given kind when the caller doesn't provide one.
    ///
    /// Requests default to `GET` of the path (and query) of `url`; everything else to
    /// `HTTP/1.1 200 OK`.
    pub fn default_status_line(kind: RecordKind, url: &str) -> String {
        match kind {
            RecordKind::Request => format!("GET {} HTTP/1.1", request_target(url)),
            _ => "HTTP/1.1 200 OK".to_owned(),
        }
    }

    /// Parse an HTTP message head from the front of `bytes`, returning the headers and the number
    /// of bytes they occupy (including the terminating blank line).
    ///
    /// `kind` selects whether a request line or a status line is expected.
    pub fn parse(kind: RecordKind, bytes: &[u8]) -> Result<(HttpHeaders, usize), HttpParseError> {
        let mut storage = [httparse::EMPTY_HEADER; MAX_HTTP_HEADERS];
        let (status, parsed) = if kind == RecordKind::Request {
            let mut req = httparse::Request::new(&mut storage);
            let status = req.parse(bytes).map_err(HttpParseError::Invalid)?;
            (status, req.headers.len())
        } else {
            let mut resp = httparse::Response::new(&mut storage);
            let status = resp.parse(bytes).map_err(HttpParseError::Invalid)?;
            (status, resp.headers.len())
        };
        let consumed = match status {
            httparse::Status::Complete(n) => n,
            httparse::Status::Partial => return Err(HttpParseError::Partial),
        };

        let line_end = bytes
            .windows(2)
            .position(|w| w == b"\r\n")
            .unwrap_or(0);
        let mut headers = HttpHeaders::new(String::from_utf8_lossy(&bytes[..line_end]));
        for h in storage.iter().take(parsed) {
            headers.append(h.name, String::from_utf8_lossy(h.value));
        }
        Ok((headers, consumed))
    }

    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// The numeric status code of a response, if the status line has one.
    pub fn status_code(&self) -> Option<u16> {
        let mut parts = self.status_line.split(' ');
        if !parts.next()?.starts_with("HTTP/") {
            return None;
        }
        parts.next()?.parse().ok()
    }

    /// Add a header line after the existing ones.
    pub fn append<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.headers.push((name.into(), value.into()));
    }

    /// The value of the first header with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Serialize the header block, terminated by a blank line.
    ///
    /// Names are written as given if `keep_case` is set, otherwise in canonical case.
    pub fn to_bytes(&self, keep_case: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.headers.len() * 32);
        out.extend_from_slice(self.status_line.as_bytes());
        out.extend_from_slice(b"\r\n");
        for (name, value) in &self.headers {
            if keep_case {
                out.extend_from_slice(name.as_bytes());
            } else {
                out.extend_from_slice(canonical_case(name).as_bytes());
            }
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out
    }
}

/// Capitalize the first letter of each `-`-separated word and lowercase the rest:
/// `content-TYPE` becomes `Content-Type`.
pub(crate) fn canonical_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut word_start = true;
    for c in name.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        word_start = c == '-';
    }
    out
}

/// The origin-form request target for a URL: its path and query, or `/`.
fn request_target(url: &str) -> &str {
    let after_scheme = match url.find("://") {
        Some(i) => &url[i + 3..],
        None => return if url.is_empty() { "/" } else { url },
    };
    match after_scheme.find('/') {
        Some(i) => &after_scheme[i..],
        None => "/",
    }
}
