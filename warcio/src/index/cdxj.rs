//! CDXJ lines: `<searchable url> <timestamp> <json>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::CdxEntry;

/// Number of digits in a CDX timestamp (`yyyyMMddhhmmss`).
const TIMESTAMP_LEN: usize = 14;

#[derive(Debug, Error)]
pub enum CdxjError {
    #[error("CDXJ line is missing its {0}")]
    MissingField(&'static str),
    #[error("invalid CDXJ timestamp {0:?}")]
    InvalidTimestamp(String),
    #[error("invalid CDXJ JSON block")]
    Json(#[from] serde_json::Error),
}

/// The JSON block of a CDXJ line.
#[derive(Serialize, Deserialize)]
struct JsonFields {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    digest: Option<String>,
    length: u64,
    offset: u64,
    filename: String,
}

/// Convert a URL to the Sort-friendly URI Reordering Transform form used as a CDX key.
///
/// The scheme, a leading `www.` and any default port are dropped, the host is reversed and
/// separated from the path by `)`, and everything is lowercased. URLs without an authority are
/// only lowercased.
///
/// ```
/// # use warcio::index::surt;
/// assert_eq!(surt("http://www.Example.com/Foo?a=1"), "com,example)/foo?a=1");
/// assert_eq!(surt("https://example.com"), "com,example)/");
/// assert_eq!(surt("https://example.com:8443/x"), "com,example:8443)/x");
/// ```
pub fn surt(url: &str) -> String {
    let url = url.trim().to_ascii_lowercase();
    let rest = match url.find("://") {
        Some(i) => &url[i + 3..],
        None => return url,
    };

    let (authority, path) = match rest.find(|c| c == '/' || c == '?' || c == '#') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    let (host, port) = match host_port.rfind(':') {
        Some(i) => (&host_port[..i], &host_port[i + 1..]),
        None => (host_port, ""),
    };
    let host = host.strip_prefix("www.").unwrap_or(host);

    let mut out = String::with_capacity(url.len() + 2);
    for (i, label) in host.rsplit('.').enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(label);
    }
    if !port.is_empty() && port != "80" && port != "443" {
        out.push(':');
        out.push_str(port);
    }
    out.push(')');
    if path.starts_with('/') {
        out.push_str(path);
    } else {
        out.push('/');
        out.push_str(path);
    }
    out
}

/// The CDX timestamp for a WARC date: its first fourteen digits, zero-padded.
fn timestamp(date: &str) -> String {
    let mut ts: String = date
        .chars()
        .filter(char::is_ascii_digit)
        .take(TIMESTAMP_LEN)
        .collect();
    while ts.len() < TIMESTAMP_LEN {
        ts.push('0');
    }
    ts
}

/// The WARC date for a CDX timestamp.
fn date_from_timestamp(ts: &str) -> Result<String, CdxjError> {
    if ts.len() != TIMESTAMP_LEN || !ts.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CdxjError::InvalidTimestamp(ts.to_owned()));
    }
    Ok(format!(
        "{}-{}-{}T{}:{}:{}Z",
        &ts[0..4],
        &ts[4..6],
        &ts[6..8],
        &ts[8..10],
        &ts[10..12],
        &ts[12..14]
    ))
}

/// Writes the entry as one CDXJ line, without a line terminator.
///
/// Records without a URL are keyed `-`, as are records without a date in the timestamp column.
impl fmt::Display for CdxEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let key = self.url.as_deref().map_or_else(|| "-".to_owned(), surt);
        let ts = self
            .date
            .as_deref()
            .map_or_else(|| "-".to_owned(), timestamp);
        let json = serde_json::to_string(&JsonFields {
            url: self.url.clone(),
            digest: self.digest.clone(),
            length: self.length,
            offset: self.offset,
            filename: self.filename.clone(),
        })
        .map_err(|_| fmt::Error)?;
        write!(f, "{} {} {}", key, ts, json)
    }
}

/// Parses a CDXJ line as written by the [`Display`](fmt::Display) impl.
///
/// The date is rebuilt from the timestamp, so it has second precision.
///
/// ```
/// # use warcio::index::CdxEntry;
/// let line = r#"com,example)/ 20000101000000 {"url":"http://example.com/","length":10,"offset":409,"filename":"a.warc"}"#;
/// let entry: CdxEntry = line.parse().unwrap();
/// assert_eq!(entry.offset, 409);
/// assert_eq!(entry.date.as_deref(), Some("2000-01-01T00:00:00Z"));
/// assert_eq!(entry.to_string(), line);
/// ```
impl FromStr for CdxEntry {
    type Err = CdxjError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.trim_end().splitn(3, ' ');
        parts.next().ok_or(CdxjError::MissingField("key"))?;
        let ts = parts.next().ok_or(CdxjError::MissingField("timestamp"))?;
        let json = parts.next().ok_or(CdxjError::MissingField("JSON block"))?;

        let date = match ts {
            "-" => None,
            ts => Some(date_from_timestamp(ts)?),
        };
        let fields: JsonFields = serde_json::from_str(json)?;
        Ok(CdxEntry {
            url: fields.url,
            date,
            offset: fields.offset,
            length: fields.length,
            filename: fields.filename,
            digest: fields.digest,
        })
    }
}

impl CdxEntry {
    /// Format as a CDXJ line, without a line terminator.
    pub fn to_cdxj_line(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timestamps() {
        assert_eq!(timestamp("2021-08-24T23:19:14Z"), "20210824231914");
        assert_eq!(timestamp("2021-08-05T06:22Z"), "20210805062200");
        assert_eq!(timestamp("2021-08-24T23:19:14.123456Z"), "20210824231914");
        assert!(date_from_timestamp("2021").is_err());
    }

    #[test]
    fn surt_edge_cases() {
        assert_eq!(surt("http://user@example.com:80/a#frag"), "com,example)/a#frag");
        assert_eq!(surt("http://example.com?q"), "com,example)/?q");
        assert_eq!(surt("urn:X-Test"), "urn:x-test");
    }

    #[test]
    fn entry_without_url_or_date() {
        let entry = CdxEntry {
            url: None,
            date: None,
            offset: 0,
            length: 409,
            filename: "example.warc".into(),
            digest: Some("sha1:AAAA".into()),
        };
        let line = entry.to_cdxj_line();
        assert_eq!(
            line,
            r#"- - {"digest":"sha1:AAAA","length":409,"offset":0,"filename":"example.warc"}"#
        );
        assert_eq!(line.parse::<CdxEntry>().unwrap(), entry);
    }

    #[test]
    fn rejects_incomplete_lines() {
        assert!(matches!(
            "com,example)/ 20000101000000".parse::<CdxEntry>(),
            Err(CdxjError::MissingField(_))
        ));
        assert!(matches!(
            "com,example)/ 20000101000000 {".parse::<CdxEntry>(),
            Err(CdxjError::Json(_))
        ));
    }
}
