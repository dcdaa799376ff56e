use crate::{Compression, DigestAlgo, Version};

/// Settings shared by reading, writing and indexing.
///
/// ```
/// # use warcio::{Options, Version, DigestAlgo};
/// let options = Options {
///     gzip: true,
///     ..Default::default()
/// };
/// assert_eq!(options.warc_version, Version::WARC1_1);
/// assert_eq!(options.digest_algo, DigestAlgo::Sha1);
/// assert!(!options.keep_headers_case);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// The version written on the first line of every record.
    pub warc_version: Version,
    /// Write non-standard header names exactly as given instead of in canonical case.
    ///
    /// Applies to both WARC header fields and embedded HTTP headers. Standard WARC field names
    /// are always written in standard case.
    pub keep_headers_case: bool,
    /// Hash algorithm for `WARC-Block-Digest` and `WARC-Payload-Digest`.
    pub digest_algo: DigestAlgo,
    /// Compress each record as its own gzip member when writing, and expect the same when
    /// reading or indexing.
    pub gzip: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            warc_version: Version::WARC1_1,
            keep_headers_case: false,
            digest_algo: DigestAlgo::Sha1,
            gzip: false,
        }
    }
}

impl Options {
    /// The per-record compression implied by [`gzip`](Self::gzip).
    pub fn compression(&self) -> Compression {
        self.gzip.into()
    }
}
