use std::fmt;
use std::str::{self, FromStr};

use crate::HeaderParseError;

/// Version lines longer than this without a CRLF are rejected rather than buffered further.
const MAX_VERSION_LINE: usize = 32;

/// The version of a WARC record.
///
/// Versions 0.9, 1.0 and 1.1 are all well-known, corresponding to the IIPC draft
/// WARC specification, ISO 28500 and ISO 28500:2016, respectively. Those well-known
/// versions can be conveniently referred to with associated constants like
/// [`WARC1_0`](Self::WARC1_0) and [`WARC1_1`](Self::WARC1_1).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Version {
    /// The integer part of the version number.
    ///
    /// In '12.345', this is 12.
    pub major: u32,
    /// The fractional part of the version number.
    ///
    /// In '12.345', this is 345.
    pub minor: u32,
}

impl Version {
    /// WARC 1.0, as specified by ISO 28500:2009.
    pub const WARC1_0: Self = Version { major: 1, minor: 0 };
    /// WARC 1.1, as specified by ISO 28500:2017.
    pub const WARC1_1: Self = Version { major: 1, minor: 1 };

    /// Parse the version line of a record from a buffer, returning the number of bytes
    /// consumed and the parsed version.
    ///
    /// Returns [`HeaderParseError::Truncated`] if the buffer holds a plausible prefix of a
    /// version line but no line terminator yet.
    ///
    /// ```
    /// # use warcio::Version;
    /// let buf = b"WARC/1.0\r\n\
    ///             <more here>";
    /// assert_eq!(
    ///     Version::parse(&buf[..]),
    ///     Ok((10, Version::WARC1_0))
    /// );
    /// ```
    pub fn parse(bytes: &[u8]) -> Result<(usize, Version), HeaderParseError> {
        fn bytes_to_u32(bytes: &[u8]) -> Result<u32, HeaderParseError> {
            if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
                return Err(HeaderParseError::invalid_signature(bytes));
            }
            match str::from_utf8(bytes).map(u32::from_str) {
                Ok(Ok(x)) => Ok(x),
                Err(_) | Ok(Err(_)) => Err(HeaderParseError::invalid_signature(bytes)),
            }
        }

        const MAGIC: &[u8] = b"WARC/";
        if bytes.len() < MAGIC.len() {
            return if MAGIC.starts_with(bytes) {
                Err(HeaderParseError::Truncated)
            } else {
                Err(HeaderParseError::invalid_signature(bytes))
            };
        }
        if !bytes.starts_with(MAGIC) {
            return Err(HeaderParseError::invalid_signature(&bytes[..MAGIC.len()]));
        }

        let line_end = match bytes.windows(2).position(|x| x == b"\r\n") {
            Some(i) => i,
            None if bytes.len() > MAX_VERSION_LINE => {
                return Err(HeaderParseError::invalid_signature(
                    &bytes[..MAX_VERSION_LINE],
                ))
            }
            None => return Err(HeaderParseError::Truncated),
        };
        let line = &bytes[..line_end];

        let major_start = MAGIC.len();
        let major_end = match line[major_start..].iter().position(|&x| x == b'.') {
            None => return Err(HeaderParseError::invalid_signature(line)),
            Some(i) => i + major_start,
        };
        let major = bytes_to_u32(&line[major_start..major_end])?;
        let minor = bytes_to_u32(&line[major_end + 1..])?;

        Ok((line_end + 2, Version { major, minor }))
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::WARC1_1
    }
}

/// Formats as the version line text, without line terminator: `WARC/1.1`.
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "WARC/{}.{}", self.major, self.minor)
    }
}

/// Parse a version from text such as `WARC/1.0` or a bare `1.0`.
impl FromStr for Version {
    type Err = HeaderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = if s.starts_with("WARC/") {
            format!("{}\r\n", s)
        } else {
            format!("WARC/{}\r\n", s)
        };
        Version::parse(line.as_bytes()).map(|(_, v)| v)
    }
}

/// Construct a Version with parts from a tuple of integers.
impl From<(u32, u32)> for Version {
    fn from((major, minor): (u32, u32)) -> Self {
        Version { major, minor }
    }
}
