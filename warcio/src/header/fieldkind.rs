use crate::FieldName;

/// Standardized values for [field names](FieldName).
///
/// The string form of each variant (its [`AsRef<str>`] impl) is the capitalization used by the
/// WARC 1.1 standard, and parsing from a string with [`TryFrom<&str>`](std::convert::TryFrom)
/// is case-insensitive. Both conversions are generated from `data/field_kind.ini`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `WARC-Record-ID`: a globally unique identifier for a record, written as a URI in angle
    /// brackets such as `<urn:uuid:f81d4fae-7dec-11d0-a765-00a0c91e6bf6>`. Mandatory.
    RecordId,
    /// `Content-Length`: the number of octets in the record block, in ASCII decimal. Mandatory.
    ContentLength,
    /// `WARC-Date`: the UTC instant capture of the record began, like `YYYY-MM-DDThh:mm:ssZ`.
    /// Mandatory.
    Date,
    /// `WARC-Type`: the [kind](crate::RecordKind) of the record. Mandatory.
    Type,
    /// `Content-Type`: the MIME type of the record block.
    ///
    /// Blocks holding a full HTTP message are `application/http; msgtype=request` or
    /// `application/http; msgtype=response`, and `warcinfo` blocks are usually
    /// `application/warc-fields`.
    ContentType,
    /// `WARC-Concurrent-To`: the record ID of another record from the same capture event.
    ConcurrentTo,
    /// `WARC-Block-Digest`: a `labelled-digest` (`algorithm ":" digest-value`) of the complete
    /// record block, such as `sha1:3EF4GH5IJ6KL7MN8OPQAB2CD`.
    BlockDigest,
    /// `WARC-Payload-Digest`: a `labelled-digest` of the record payload.
    ///
    /// For an `application/http` block the payload is the HTTP entity body, excluding the
    /// HTTP headers.
    PayloadDigest,
    /// `WARC-IP-Address`: the IP address contacted to retrieve the record content.
    IpAddress,
    /// `WARC-Refers-To`: the record ID of a record this one holds additional content for.
    RefersTo,
    /// `WARC-Refers-To-Target-URI`: the target URI of the [`RefersTo`](Self::RefersTo) record.
    RefersToTargetURI,
    /// `WARC-Refers-To-Date`: the date of the [`RefersTo`](Self::RefersTo) record.
    RefersToDate,
    /// `WARC-Target-URI`: the original URI that provided the record content.
    TargetURI,
    /// `WARC-Truncated`: why the record holds a truncated version of the resource.
    Truncated,
    /// `WARC-Warcinfo-ID`: the record ID of the `warcinfo` record describing this record.
    InfoID,
    /// `WARC-Filename`: the name of the file holding a `warcinfo` record.
    Filename,
    /// `WARC-Profile`: a URI naming how a `revisit` record was derived.
    Profile,
    /// `WARC-Identified-Payload-Type`: the content type found by inspecting the payload.
    IdentifiedPayloadType,
    /// `WARC-Segment-Number`: position of this record in a sequence of segments, from 1.
    SegmentNumber,
    /// `WARC-Segment-Origin-ID`: the record ID of the first segment of a `continuation`.
    SegmentOriginID,
    /// `WARC-Segment-Total-Length`: total length of all segments, on the last `continuation`.
    SegmentTotalLength,
}

impl FieldKind {
    pub fn into_name(self) -> FieldName {
        FieldName::Known(self)
    }

    /// Returns `true` if values of this field are a URI without angle brackets in WARC 1.1, but
    /// with them in earlier versions.
    pub fn value_is_bare_uri(self) -> bool {
        use FieldKind::*;
        matches!(self, TargetURI | RefersToTargetURI | Profile)
    }
}

include!(concat!(env!("OUT_DIR"), "/field_kind_conversions.rs"));

impl PartialEq<FieldName> for FieldKind {
    fn eq(&self, other: &FieldName) -> bool {
        other == self
    }
}
