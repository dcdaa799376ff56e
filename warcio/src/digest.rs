//! Content digests for `WARC-Block-Digest` and `WARC-Payload-Digest`.
//!
//! Digests are written as a WARC `labelled-digest`: the algorithm label, a colon, and the
//! RFC 4648 base32 encoding of the hash, such as `sha1:3I42H3S6NNFQ2MSVX7XZKYAYSCX5QBYJ`.

use std::fmt;
use std::str::FromStr;

use data_encoding::BASE32;

/// Accumulates a hash over data fed to it in chunks.
pub trait Digester: Sized {
    type Digest: AsRef<[u8]>;

    /// The algorithm label used in a `labelled-digest`.
    const LABEL: &'static str;

    fn new() -> Self;
    /// Collect data and accumulate it into the digest.
    fn handle_data(&mut self, data: &[u8]);
    /// Compute the final digest from any accumulated data.
    fn finalize(self) -> Self::Digest;

    /// Format a digest as a `labelled-digest` as specified by WARC 1.1 section 5.8.
    fn format_digest(digest: &Self::Digest) -> String {
        let digest = digest.as_ref();
        let mut out =
            String::with_capacity(Self::LABEL.len() + 1 + BASE32.encode_len(digest.len()));
        out += Self::LABEL;
        out.push(':');
        BASE32.encode_append(digest, &mut out);
        out
    }
}

/// SHA-1, the algorithm suggested by the WARC standard and used by most tools.
pub struct Sha1Digester(sha1::Sha1);

impl Digester for Sha1Digester {
    type Digest = [u8; 20];
    const LABEL: &'static str = "sha1";

    fn new() -> Self {
        Sha1Digester(Default::default())
    }

    fn handle_data(&mut self, data: &[u8]) {
        use sha1::Digest;

        self.0.update(data)
    }

    fn finalize(self) -> Self::Digest {
        use sha1::Digest;

        let mut out = [0u8; 20];
        out.copy_from_slice(self.0.finalize().as_slice());
        out
    }
}

pub struct Sha256Digester(sha2::Sha256);

impl Digester for Sha256Digester {
    type Digest = [u8; 32];
    const LABEL: &'static str = "sha256";

    fn new() -> Self {
        Sha256Digester(Default::default())
    }

    fn handle_data(&mut self, data: &[u8]) {
        use sha2::Digest;

        self.0.update(data)
    }

    fn finalize(self) -> Self::Digest {
        use sha2::Digest;

        let mut out = [0u8; 32];
        out.copy_from_slice(self.0.finalize().as_slice());
        out
    }
}

/// A digest algorithm selectable at runtime.
///
/// Parses from the names `sha-1`, `sha1`, `sha-256` or `sha256`, ignoring case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgo {
    Sha1,
    Sha256,
}

impl DigestAlgo {
    /// The label this algorithm's digests are prefixed with.
    pub fn label(self) -> &'static str {
        match self {
            DigestAlgo::Sha1 => Sha1Digester::LABEL,
            DigestAlgo::Sha256 => Sha256Digester::LABEL,
        }
    }

    /// Start digesting with this algorithm.
    pub fn digester(self) -> BlockDigester {
        match self {
            DigestAlgo::Sha1 => BlockDigester::Sha1(Sha1Digester::new()),
            DigestAlgo::Sha256 => BlockDigester::Sha256(Sha256Digester::new()),
        }
    }

    /// Compute the `labelled-digest` of `data` in one call.
    ///
    /// ```
    /// # use warcio::DigestAlgo;
    /// assert_eq!(DigestAlgo::Sha1.labelled_digest(b""), "sha1:3I42H3S6NNFQ2MSVX7XZKYAYSCX5QBYJ");
    /// ```
    pub fn labelled_digest(self, data: &[u8]) -> String {
        let mut digester = self.digester();
        digester.handle_data(data);
        digester.finish()
    }
}

impl Default for DigestAlgo {
    fn default() -> Self {
        DigestAlgo::Sha1
    }
}

impl fmt::Display for DigestAlgo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            DigestAlgo::Sha1 => "sha-1",
            DigestAlgo::Sha256 => "sha-256",
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownAlgorithm(pub String);

impl fmt::Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unsupported digest algorithm {:?}", self.0)
    }
}

impl std::error::Error for UnknownAlgorithm {}

impl FromStr for DigestAlgo {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha-1" | "sha1" => Ok(DigestAlgo::Sha1),
            "sha-256" | "sha256" => Ok(DigestAlgo::Sha256),
            _ => Err(UnknownAlgorithm(s.to_owned())),
        }
    }
}

/// A running digest for whichever [`DigestAlgo`] was chosen.
pub enum BlockDigester {
    Sha1(Sha1Digester),
    Sha256(Sha256Digester),
}

impl BlockDigester {
    pub fn handle_data(&mut self, data: &[u8]) {
        match self {
            BlockDigester::Sha1(d) => d.handle_data(data),
            BlockDigester::Sha256(d) => d.handle_data(data),
        }
    }

    /// Finish hashing and return the `labelled-digest`.
    pub fn finish(self) -> String {
        match self {
            BlockDigester::Sha1(d) => Sha1Digester::format_digest(&d.finalize()),
            BlockDigester::Sha256(d) => Sha256Digester::format_digest(&d.finalize()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn chunked_digest_matches_whole() {
        let mut digester = DigestAlgo::Sha1.digester();
        digester.handle_data(b"and this is...\n");
        digester.handle_data(b"some more text");
        assert_eq!(
            digester.finish(),
            DigestAlgo::Sha1.labelled_digest(b"and this is...\nsome more text")
        );
    }

    #[test]
    fn known_sha1_vector() {
        assert_eq!(
            DigestAlgo::Sha1.labelled_digest(b"abc"),
            // SHA-1("abc") = a9993e364706816aba3e25717850c26c9cd0d89d
            "sha1:VGMT4NSHA2AWVOR6EVYXQUGCNSONBWE5"
        );
    }

    #[test]
    fn parses_algorithm_names() {
        assert_eq!("SHA-1".parse(), Ok(DigestAlgo::Sha1));
        assert_eq!("sha256".parse(), Ok(DigestAlgo::Sha256));
        assert_eq!(
            "md5".parse::<DigestAlgo>(),
            Err(UnknownAlgorithm("md5".into()))
        );
        assert_eq!(DigestAlgo::Sha256.label(), "sha256");
    }
}
