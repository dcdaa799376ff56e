use std::borrow::Borrow;
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::hash::{Hash, Hasher};

use uncased::{AsUncased, UncasedStr};

use crate::FieldKind;

/// The name of a WARC header field.
///
/// Field names are case-insensitive [tokens](https://iipc.github.io/warc-specifications/): ASCII
/// excluding control characters and the separators `()<>@,;:\"/[]?={} \t`. Names that match a
/// [`FieldKind`] parse to [`Known`](Self::Known) and take the standard capitalization; anything
/// else is kept as written in [`Other`](Self::Other).
///
/// Comparison, ordering and hashing are case-insensitive for both variants.
///
/// ```
/// # use warcio::{FieldName, FieldKind};
/// let parsed_id: FieldName = "warc-record-id".into();
///
/// assert_eq!(parsed_id, FieldKind::RecordId);
/// assert_eq!("WARC-Record-ID", parsed_id.as_ref());
///
/// let custom: FieldName = "X-crawler-Note".into();
/// assert_eq!(custom, FieldName::from("x-CRAWLER-note"));
/// assert_eq!("X-crawler-Note", custom.as_ref());
/// ```
#[derive(Debug, Clone)]
pub enum FieldName {
    Known(FieldKind),
    /// Any unrecognized field name.
    ///
    /// Software *shall* ignore fields with unrecognized names, so these pass through reading and
    /// writing unchanged. An `Other` holding the text of a known name still compares equal to the
    /// matching `Known` value.
    Other(Box<str>),
}

impl AsRef<str> for FieldName {
    fn as_ref(&self) -> &str {
        match self {
            FieldName::Known(x) => x.as_ref(),
            FieldName::Other(s) => s.as_ref(),
        }
    }
}

impl<S: AsRef<str> + Into<Box<str>>> From<S> for FieldName {
    fn from(s: S) -> Self {
        match FieldKind::try_from(s.as_ref()) {
            Ok(x) => FieldName::Known(x),
            Err(_) => FieldName::Other(s.into()),
        }
    }
}

impl From<FieldKind> for FieldName {
    fn from(k: FieldKind) -> Self {
        FieldName::Known(k)
    }
}

impl From<&FieldKind> for FieldName {
    fn from(kind: &FieldKind) -> FieldName {
        kind.into_name()
    }
}

impl FieldName {
    /// Returns `true` if a field's value consists of a bare URI.
    ///
    /// WARC 1.0 writes every URI as `"<" uri ">"`, while WARC 1.1 drops the brackets from the URI
    /// grammar and adds them back explicitly to some fields only. This is `true` for the fields
    /// whose values lose their brackets in 1.1. [`Header`](crate::Header) uses it to add or strip
    /// brackets so callers always see the bare URI.
    pub fn value_is_bare_uri(&self) -> bool {
        match self {
            FieldName::Known(kind) => kind.value_is_bare_uri(),
            FieldName::Other(_) => false,
        }
    }
}

impl Borrow<UncasedStr> for FieldName {
    fn borrow(&self) -> &UncasedStr {
        self.as_ref().as_uncased()
    }
}

// Implementing Borrow requires the same semantics between the borrowed and original versions,
// so Eq, Ord and Hash are implemented in terms of the case-insensitive field name.
impl PartialEq for FieldName {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldName::Known(l), FieldName::Known(r)) => l == r,
            _ => self.as_ref().as_uncased().eq(other.as_ref()),
        }
    }
}

impl Eq for FieldName {}

impl PartialEq<FieldKind> for FieldName {
    fn eq(&self, other: &FieldKind) -> bool {
        match self {
            FieldName::Known(k) => k == other,
            FieldName::Other(s) => s.as_ref().as_uncased() == other.as_ref(),
        }
    }
}

impl PartialOrd for FieldName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_ref().as_uncased().cmp(other.as_ref().as_uncased())
    }
}

impl Hash for FieldName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_ref().as_uncased().hash(state)
    }
}
