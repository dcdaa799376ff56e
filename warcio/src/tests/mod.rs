use crate::header::{get_record_header, Header};
use crate::{FieldKind, HeaderParseError, Version};

mod read;
mod write;

#[test]
fn header_parse_consumes_full() {
    // "WARC/1.1" CRLF (=version)
    // named-field CRLF (=warc-fields)
    // CRLF
    let text = b"\
        WARC/1.1\r\n\
        Content-Length: 123\r\n\
        \r\n\
    ";

    let (header, sz) = Header::parse(&text[..]).expect("Parse should succeed");
    assert_eq!(sz, text.len());
    let mut test_header = Header::new(Version::WARC1_1);
    test_header.set_field(FieldKind::ContentLength, "123");
    assert_eq!(header, test_header);
    assert_eq!(header.content_length(), 123);
}

#[test]
fn can_read_record_header() {
    let header = b"WARC/1.0\r\n\
                   Warc-Type: testdata\r\n\
                   Content-Length: 6\r\n\
                   X-Multiline-Test:lol \r\n  multiline headers\r\n\
                   \r\n";

    let mut expected = Header::new(Version::WARC1_0);
    expected.set_field("warc-type", "testdata");
    expected.set_field("content-length", "6");
    expected.set_field("x-multiline-test", "lol multiline headers");

    assert_eq!(
        get_record_header(&header[..]).expect("Should be valid"),
        expected
    );
}

#[test]
fn header_adjusts_bare_uri_brackets() {
    let mut header = Header::new(Version::WARC1_0);
    header.set_field(FieldKind::TargetURI, "http://example.com");

    assert_eq!(
        header.get_field(FieldKind::TargetURI),
        Some("http://example.com")
    );
    assert_eq!(
        header.get_field_bytes_raw(FieldKind::TargetURI),
        Some(&b"<http://example.com>"[..])
    );

    header.set_version(Version::WARC1_1);
    assert_eq!(
        header.get_field(FieldKind::TargetURI),
        Some("http://example.com")
    );
    assert_eq!(
        header.get_field_bytes_raw(FieldKind::TargetURI),
        Some(&b"http://example.com"[..])
    );
}

#[test]
fn extra_buffering_works() {
    use std::io::{self, Result};
    /// A type for observing the buffering behavior of `get_record_header`.
    ///
    /// On each `fill_buf` call it transitions to the next state, and
    /// after two it is in the terminal state.
    #[derive(Debug, PartialEq)]
    enum DoubleBuffer<'a> {
        /// Nothing read yet.
        Start(&'a [u8], &'a [u8]),
        /// One whole buffer read.
        Second(&'a [u8]),
        /// Both buffers read, with n bytes left unread in the second.
        Done(usize),
    }
    // Only because BufRead: Read
    impl<'a> io::Read for DoubleBuffer<'a> {
        fn read(&mut self, _: &mut [u8]) -> Result<usize> {
            unimplemented!();
        }
    }
    impl<'a> io::BufRead for DoubleBuffer<'a> {
        fn fill_buf(&mut self) -> Result<&[u8]> {
            match *self {
                DoubleBuffer::Start(fst, _) => Ok(fst),
                DoubleBuffer::Second(snd) => Ok(snd),
                DoubleBuffer::Done(_) => panic!("Should not fill after snd"),
            }
        }

        fn consume(&mut self, amt: usize) {
            let next = match *self {
                DoubleBuffer::Start(fst, snd) => {
                    assert_eq!(amt, fst.len());
                    DoubleBuffer::Second(snd)
                }
                DoubleBuffer::Second(snd) => DoubleBuffer::Done(snd.len() - amt),
                DoubleBuffer::Done(_) => panic!("Should not consume after snd"),
            };
            *self = next;
        }
    }

    let mut reader = DoubleBuffer::Start(
        b"WARC/1.0\r\n\
          X-First-Header: yes\r\n\
          X-Second-Header:yes\r\n\
          \r",
        // Header termination spans two buffers
        // to catch potential errors there.
        b"\nIGNORED_DATA",
    );
    get_record_header(&mut reader).expect("failed to parse valid header");
    assert_eq!(reader, DoubleBuffer::Done(12));
}

#[test]
fn incorrect_signature_is_invalid() {
    assert_eq!(
        Version::parse(b"\x89PNG\r\n\x1a\n"),
        Err(HeaderParseError::InvalidSignature("\u{FFFD}PNG\r".into()))
    );
    assert!(matches!(
        Version::parse(b"WARC/1.0a\r\n"),
        Err(HeaderParseError::InvalidSignature(_))
    ));
    assert_eq!(Version::parse(b"WAR"), Err(HeaderParseError::Truncated));
}

#[test]
fn unterminated_header_is_malformed() {
    const BYTES: &[u8] = b"WARC/1.1\r\nWARC-Type: testdata\r\n\r";

    assert_eq!(get_record_header(BYTES), Err(HeaderParseError::MalformedField));
    assert_eq!(get_record_header(&b""[..]), Err(HeaderParseError::Truncated));
}

#[test]
fn invalid_fields_are_invalid() {
    assert_eq!(
        Header::parse_field(b"This is not a valid field\r\n\r\n"),
        Err(HeaderParseError::MalformedField)
    );

    assert_eq!(
        Header::parse_field(b"X-Invalid-UTF-8\xFF: yes\r\n\r\n"),
        Err(HeaderParseError::MalformedField)
    );
}

#[test]
fn endless_header_is_rejected() {
    use std::io::{repeat, BufReader, Read};

    let input = (&b"WARC/1.1\r\nX-Endless: "[..]).chain(repeat(b'a'));
    assert!(matches!(
        get_record_header(BufReader::new(input)),
        Err(HeaderParseError::TooLong(_))
    ));
}
