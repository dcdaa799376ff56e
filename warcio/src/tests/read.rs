use std::io::{Cursor, Read, Write};

use pretty_assertions::assert_eq;

use crate::record::{ContentError, FinishError};
use crate::{Compression, FieldKind, InvalidRecord, Record, RecordKind, RecordReader};

const RESPONSE: &[u8] = b"WARC/1.1\r\n\
    WARC-Type: response\r\n\
    WARC-Target-URI: http://example.com/\r\n\
    WARC-Date: 2000-01-01T00:00:00Z\r\n\
    Content-Type: application/http; msgtype=response\r\n\
    Content-Length: 50\r\n\
    \r\n\
    HTTP/1.1 200 OK\r\n\
    Content-Type: text/plain\r\n\
    \r\n\
    hello\r\n\r\n";

const RESOURCE: &[u8] = b"WARC/1.1\r\n\
    WARC-Type: resource\r\n\
    WARC-Target-URI: http://example.com/r\r\n\
    Content-Length: 5\r\n\
    \r\n\
    abcde\r\n\r\n";

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn http_block_is_split_from_payload() {
    let mut record = Record::read_from(RESPONSE, Compression::None).unwrap();
    assert_eq!(record.header.record_kind(), Some(RecordKind::Response));
    assert_eq!(record.len(), 50);

    let http = record.http_headers().expect("HTTP headers should be parsed");
    assert_eq!(http.status_code(), Some(200));
    assert_eq!(http.get("content-type"), Some("text/plain"));
    assert_eq!(record.payload_len(), 5);
    assert_eq!(record.read_fully().unwrap(), b"hello");
    record.finish().unwrap();
}

#[test]
fn unparseable_http_block_stays_in_payload() {
    let raw = b"WARC/1.1\r\n\
        WARC-Type: response\r\n\
        WARC-Target-URI: http://example.com/\r\n\
        Content-Type: application/http\r\n\
        Content-Length: 11\r\n\
        \r\n\
        not http!\r\n\
        \r\n\r\n";
    let mut record = Record::read_from(&raw[..], Compression::None).unwrap();
    assert!(record.http_headers().is_none());
    assert_eq!(record.read_fully().unwrap(), b"not http!\r\n");
}

#[test]
fn reader_tracks_offsets() {
    let mut data = RESPONSE.to_vec();
    data.extend_from_slice(RESOURCE);
    let mut reader = RecordReader::new(&data[..], Compression::None);

    let mut spans = vec![];
    while let Some(record) = reader.next() {
        let mut record = record.unwrap();
        let offset = record.offset();
        let url = record.header.target_uri().map(str::to_owned);
        // Partial reads are fine; finish skips the rest
        let mut first = [0u8; 2];
        record.read_exact(&mut first).unwrap();

        let (input, buffer) = record.finish().unwrap();
        spans.push((url, offset, input.position() - offset));
        reader.recycle_buffer(buffer);
    }

    assert_eq!(
        spans,
        vec![
            (
                Some("http://example.com/".to_owned()),
                0,
                RESPONSE.len() as u64
            ),
            (
                Some("http://example.com/r".to_owned()),
                RESPONSE.len() as u64,
                RESOURCE.len() as u64
            ),
        ]
    );
}

#[test]
fn reader_tracks_compressed_offsets() {
    let first = gzip(RESPONSE);
    let second = gzip(RESOURCE);
    let mut data = first.clone();
    data.extend_from_slice(&second);

    let mut reader = RecordReader::new(&data[..], Compression::Gzip);
    let record = reader.next().unwrap().unwrap();
    let (input, buffer) = record.finish().unwrap();
    assert_eq!(input.position(), first.len() as u64);
    reader.recycle_buffer(buffer);

    let mut record = reader.next().unwrap().unwrap();
    assert_eq!(record.offset(), first.len() as u64);
    assert_eq!(record.read_fully().unwrap(), b"abcde");
    let (input, _) = record.finish().unwrap();
    assert_eq!(input.position(), data.len() as u64);
    assert!(reader.next().is_none());
}

#[test]
fn unterminated_header_is_malformed() {
    let data = b"WARC/1.1\r\nWARC-Type: resource\r\nContent-Length: 0\r\n";
    let mut reader = RecordReader::new(&data[..], Compression::None);
    match reader.next() {
        Some(Err(InvalidRecord::MalformedHeader { offset: 0, .. })) => {}
        other => panic!("expected MalformedHeader, got {:?}", other.map(|r| r.is_ok())),
    }
    assert!(reader.next().is_none(), "reader stops after an error");
}

#[test]
fn bad_version_line_reports_offset() {
    let mut data = RESOURCE.to_vec();
    data.extend_from_slice(b"HTTP/1.1 200 OK\r\n\r\n");
    let mut reader = RecordReader::new(&data[..], Compression::None);

    let record = reader.next().unwrap().unwrap();
    let (_, buffer) = record.finish().unwrap();
    reader.recycle_buffer(buffer);

    match reader.next() {
        Some(Err(InvalidRecord::MalformedRecord { offset, found, .. })) => {
            assert_eq!(offset, RESOURCE.len() as u64);
            assert_eq!(found, "HTTP/");
        }
        other => panic!("expected MalformedRecord, got {:?}", other.map(|r| r.is_ok())),
    }
}

#[test]
fn content_length_is_required() {
    let data = b"WARC/1.1\r\nWARC-Type: resource\r\n\r\n\r\n\r\n";
    assert!(matches!(
        Record::read_from(&data[..], Compression::None),
        Err(InvalidRecord::MissingContentLength { offset: 0 })
    ));

    let data = b"WARC/1.1\r\nWARC-Type: resource\r\nContent-Length: 12x\r\n\r\n";
    match Record::read_from(&data[..], Compression::None) {
        Err(InvalidRecord::InvalidContentLength { value, .. }) => assert_eq!(value, "12x"),
        other => panic!("unexpected {:?}", other.map(|r| r.header)),
    }

    // Revisits may have no block at all
    let data = b"WARC/1.1\r\nWARC-Type: revisit\r\n\r\n\r\n\r\n";
    let record = Record::read_from(&data[..], Compression::None).unwrap();
    assert_eq!(record.len(), 0);
    record.finish().unwrap();
}

#[test]
fn truncated_content() {
    let data = &RESOURCE[..RESOURCE.len() - 7];
    let mut record = Record::read_from(data, Compression::None).unwrap();
    match record.read_fully() {
        Err(ContentError::Truncated { expected, actual }) => {
            assert_eq!((expected, actual), (5, 2));
        }
        other => panic!("expected truncation, got {:?}", other),
    }
    // Headers are still usable
    assert_eq!(record.header.get_field(FieldKind::Type), Some("resource"));
    assert!(matches!(
        record.finish(),
        Err(FinishError::Truncated { remaining: 3 })
    ));
}

#[test]
fn missing_tail() {
    let data = b"WARC/1.1\r\nWARC-Type: resource\r\nContent-Length: 1\r\n\r\nxWARC/1.1";
    let record = Record::read_from(&data[..], Compression::None).unwrap();
    assert!(matches!(record.finish(), Err(FinishError::MissingTail)));
}

#[test]
fn content_reads_once_without_seek() {
    let mut reader = RecordReader::new(RESOURCE, Compression::None);
    let mut record = reader.next().unwrap().unwrap();
    assert_eq!(record.read_fully().unwrap(), b"abcde");
    assert!(matches!(
        record.read_fully(),
        Err(ContentError::AlreadyConsumed)
    ));
}

#[test]
fn content_rereads_after_rewind() {
    let mut reader = RecordReader::new(Cursor::new(RESPONSE), Compression::None);
    let mut record = reader.next().unwrap().unwrap();
    assert_eq!(record.read_fully().unwrap(), b"hello");
    record.rewind().unwrap();
    assert_eq!(record.read_fully().unwrap(), b"hello");
    assert!(record.http_headers().is_some());

    let (input, _) = record.finish().unwrap();
    assert_eq!(input.position(), RESPONSE.len() as u64);
}

#[test]
fn compressed_records_do_not_rewind() {
    let data = gzip(RESOURCE);
    let mut record = Record::read_from(Cursor::new(data), Compression::Gzip).unwrap();
    assert_eq!(record.read_fully().unwrap(), b"abcde");
    assert!(matches!(record.rewind(), Err(ContentError::NotSeekable)));
}

#[test]
fn rewindable_records_read_fully_repeatedly() {
    let mut reader = RecordReader::new(Cursor::new(RESPONSE), Compression::None);
    let mut record = reader.next().unwrap().unwrap().rewindable();
    assert_eq!(record.read_fully().unwrap(), b"hello");
    assert_eq!(record.read_fully().unwrap(), b"hello");
    assert_eq!(record.http_headers().and_then(|h| h.status_code()), Some(200));

    let (input, _) = record.finish().unwrap();
    assert_eq!(input.position(), RESPONSE.len() as u64);
}

#[test]
fn compressed_records_stay_single_use() {
    let data = gzip(RESOURCE);
    let mut record = Record::read_from(Cursor::new(data), Compression::Gzip)
        .unwrap()
        .rewindable();
    assert_eq!(record.read_fully().unwrap(), b"abcde");
    assert!(matches!(
        record.read_fully(),
        Err(ContentError::AlreadyConsumed)
    ));
}

#[test]
fn http_sniffing_reads_a_bounded_prefix() {
    const HEAD: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n\r\n";
    let body = vec![b'x'; 4 << 20];
    let mut raw = format!(
        "WARC/1.1\r\n\
         WARC-Type: response\r\n\
         WARC-Target-URI: http://example.com/big\r\n\
         Content-Type: application/http; msgtype=response\r\n\
         Content-Length: {}\r\n\
         \r\n",
        HEAD.len() + body.len()
    )
    .into_bytes();
    let header_len = raw.len() as u64;
    raw.extend_from_slice(HEAD);
    raw.extend_from_slice(&body);
    raw.extend_from_slice(b"\r\n\r\n");

    // The whole record is available in one buffer, but opening it takes little of it
    let mut input = Cursor::new(&raw[..]);
    let record = Record::read_from(&mut input, Compression::None).unwrap();
    assert!(record.http_headers().is_some());
    assert_eq!(record.payload_len(), body.len() as u64);
    drop(record);
    assert!(input.position() <= header_len + (64 << 10));

    // Without a terminated head the prefix is bounded the same way, and left in the payload
    let mut unterminated = raw.clone();
    let head_end = header_len as usize + HEAD.len();
    unterminated[head_end - 2..head_end].copy_from_slice(b"xx");
    let mut input = Cursor::new(&unterminated[..]);
    let mut record = Record::read_from(&mut input, Compression::None).unwrap();
    assert!(record.http_headers().is_none());
    assert_eq!(record.read_fully().unwrap().len(), HEAD.len() + body.len());
}
