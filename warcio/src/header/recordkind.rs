use uncased::AsUncased;

/// The standardized kinds of record, as named in the [`WARC-Type`](crate::FieldKind::Type) field.
///
/// Parsing from a string is case-insensitive and comparison with any string is too:
///
/// ```
/// # use std::convert::TryFrom;
/// # use warcio::RecordKind;
/// let kind = RecordKind::try_from("Response").unwrap();
/// assert_eq!(kind, RecordKind::Response);
/// assert_eq!(kind, "response");
/// assert_eq!(kind.as_ref(), "response");
/// assert!(RecordKind::try_from("screenshot").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    /// `warcinfo`: describes the records that follow it, usually the first record of a file.
    Info,
    /// `response`: a complete scheme-specific response, for HTTP including the headers.
    Response,
    /// `resource`: a resource without full protocol response information.
    Resource,
    /// `request`: a complete scheme-specific request.
    Request,
    /// `metadata`: content created to describe or accompany another record.
    Metadata,
    /// `revisit`: revisitation of content that was already archived.
    Revisit,
    /// `conversion`: an alternative version of another record's content.
    Conversion,
    /// `continuation`: data to be appended to a prior segmented record block.
    Continuation,
}

include!(concat!(env!("OUT_DIR"), "/record_kind_conversions.rs"));

impl RecordKind {
    /// Whether a record of this kind must carry a `WARC-Target-URI`.
    pub fn requires_target_uri(self) -> bool {
        !matches!(self, RecordKind::Info)
    }

    /// Whether a record of this kind must declare a `Content-Length`.
    ///
    /// A `revisit` may have an empty block, so its length defaults to zero when absent.
    pub fn requires_content(self) -> bool {
        !matches!(self, RecordKind::Revisit)
    }

    /// Whether a record of this kind may embed an HTTP header block in its content.
    pub fn carries_http(self) -> bool {
        matches!(
            self,
            RecordKind::Request | RecordKind::Response | RecordKind::Revisit
        )
    }

    /// The `msgtype` parameter for an `application/http` block of this kind.
    pub(crate) fn http_msgtype(self) -> &'static str {
        match self {
            RecordKind::Request => "request",
            _ => "response",
        }
    }
}

impl<S: AsRef<str>> PartialEq<S> for RecordKind {
    fn eq(&self, other: &S) -> bool {
        self.as_uncased().eq(other.as_ref())
    }
}

impl Eq for RecordKind {}
