use std::io::Cursor;

use pretty_assertions::assert_eq;

use crate::writer::{serialize, SerializeError};
use crate::{
    Compression, DigestAlgo, FieldKind, NewRecord, Options, Record, RecordFields, RecordKind,
    RecordReader, Version, WarcWriter,
};

const RECORD_ID: &str = "<urn:uuid:12345678-feb0-11e6-8f83-68a86d1772ce>";

fn response(url: &str, body: &'static [u8]) -> NewRecord {
    let fields = RecordFields {
        url: Some(url.to_owned()),
        date: Some("2000-01-01T00:00:00Z".to_owned()),
        record_id: Some(RECORD_ID.to_owned()),
        http_headers: Some(vec![
            ("Custom-Header".to_owned(), "somevalue".to_owned()),
            (
                "content-type".to_owned(),
                "text/plain; charset=\"UTF-8\"".to_owned(),
            ),
        ]),
        ..Default::default()
    };
    NewRecord::create("response", fields, Some(Box::new(body))).unwrap()
}

#[test]
fn writes_well_formed_warc1_1() {
    let fields = RecordFields {
        url: Some("http://example.com/".into()),
        date: Some("2000-01-01T00:00:00Z".into()),
        record_id: Some(RECORD_ID.into()),
        warc_headers: vec![("x-crawler".into(), "test".into())],
        ..Default::default()
    };
    let record = NewRecord::create("resource", fields, Some(Box::new(&b"abcdefgh"[..]))).unwrap();
    let bytes = serialize(record, &Options::default()).unwrap();

    assert_eq!(
        String::from_utf8_lossy(&bytes),
        "WARC/1.1\r
WARC-Type: resource\r
WARC-Record-ID: <urn:uuid:12345678-feb0-11e6-8f83-68a86d1772ce>\r
WARC-Date: 2000-01-01T00:00:00Z\r
WARC-Target-URI: http://example.com/\r
X-Crawler: test\r
WARC-Block-Digest: sha1:IJNPCKQHINICWMROSOQBLPHYNDRSJVLK\r
Content-Length: 8\r
\r
abcdefgh\r
\r
"
    );
}

#[test]
fn round_trips_through_parser() {
    let bytes = serialize(
        response("http://example.com/foo", b"and this is...\nsome more text"),
        &Options::default(),
    )
    .unwrap();

    let mut input = Cursor::new(&bytes);
    let mut record = Record::read_from(&mut input, Compression::None).unwrap();
    assert_eq!(record.header.record_kind(), Some(RecordKind::Response));
    assert_eq!(record.header.target_uri(), Some("http://example.com/foo"));
    assert_eq!(
        record.header.get_field(FieldKind::Date),
        Some("2000-01-01T00:00:00Z")
    );
    assert_eq!(record.header.record_id(), RECORD_ID);
    assert_eq!(
        record.header.get_field(FieldKind::ContentType),
        Some("application/http; msgtype=response")
    );

    let http = record.http_headers().unwrap().clone();
    assert_eq!(http.status_line(), "HTTP/1.1 200 OK");
    assert_eq!(http.get("Content-Type"), Some("text/plain; charset=\"UTF-8\""));
    assert_eq!(
        record.read_fully().unwrap(),
        b"and this is...\nsome more text".to_vec()
    );
    record.finish().unwrap();
    assert_eq!(input.position(), bytes.len() as u64);
}

#[test]
fn digests_match_independent_hash() {
    use data_encoding::BASE32;
    use sha1::{Digest, Sha1};

    let body = b"and this is...\nsome more text";
    let bytes = serialize(response("http://example.com/foo", body), &Options::default()).unwrap();
    let (header, header_len) = crate::Header::parse(&bytes).unwrap();
    let block = &bytes[header_len..bytes.len() - 4];

    assert_eq!(
        header.get_field(FieldKind::BlockDigest).unwrap(),
        format!("sha1:{}", BASE32.encode(&Sha1::digest(block)))
    );
    assert_eq!(
        header.get_field(FieldKind::PayloadDigest).unwrap(),
        format!("sha1:{}", BASE32.encode(&Sha1::digest(&body[..])))
    );
    assert_eq!(header.content_length(), block.len() as u64);
}

#[test]
fn sha256_digests() {
    let options = Options {
        digest_algo: DigestAlgo::Sha256,
        ..Default::default()
    };
    let bytes = serialize(response("http://example.com/", b"x"), &options).unwrap();
    let (header, _) = crate::Header::parse(&bytes).unwrap();
    assert!(header
        .get_field(FieldKind::BlockDigest)
        .unwrap()
        .starts_with("sha256:"));
}

#[test]
fn header_case_is_configurable() {
    let canonical = serialize(response("http://example.com/", b""), &Options::default()).unwrap();
    let canonical = String::from_utf8(canonical).unwrap();
    assert!(canonical.contains("\r\nContent-Type: text/plain"));

    let options = Options {
        keep_headers_case: true,
        ..Default::default()
    };
    let kept = serialize(response("http://example.com/", b""), &options).unwrap();
    let kept = String::from_utf8(kept).unwrap();
    assert!(kept.contains("\r\ncontent-type: text/plain"));
    assert!(kept.contains("\r\nCustom-Header: somevalue"));
}

#[test]
fn older_versions_bracket_uris() {
    let options = Options {
        warc_version: Version::WARC1_0,
        ..Default::default()
    };
    let bytes = serialize(response("http://example.com/", b""), &options).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("WARC/1.0\r\n"));
    assert!(text.contains("WARC-Target-URI: <http://example.com/>\r\n"));
}

#[test]
fn defaults_id_and_date() {
    let record = NewRecord::create(
        "resource",
        RecordFields {
            url: Some("http://example.com/".into()),
            ..Default::default()
        },
        None,
    )
    .unwrap();
    let bytes = serialize(record, &Options::default()).unwrap();
    let (header, _) = crate::Header::parse(&bytes).unwrap();

    let id = header.record_id();
    assert!(id.starts_with("<urn:uuid:") && id.ends_with('>'), "{}", id);
    assert!(header.warc_date_parsed().is_some());
    assert_eq!(header.content_length(), 0);
}

#[test]
fn conflicting_content_type_is_rejected() {
    let fields = RecordFields {
        url: Some("http://example.com/".into()),
        warc_headers: vec![("Content-Type".into(), "text/html".into())],
        http_headers: Some(vec![]),
        ..Default::default()
    };
    let record = NewRecord::create("response", fields, None).unwrap();
    assert!(matches!(
        serialize(record, &Options::default()),
        Err(SerializeError::InvalidField(_))
    ));
}

#[test]
fn first_record_is_warcinfo() {
    let mut writer = WarcWriter::new(Vec::new(), "/tmp/archives/test.warc", Options::default());
    let first = writer
        .write_record(response("http://example.com/", b""))
        .unwrap();
    let second = writer
        .write_record(response("http://example.com/foo", b"body"))
        .unwrap();
    assert_eq!(second.offset, first.offset + first.length);
    let bytes = writer.finish().unwrap();

    let mut reader = RecordReader::new(&bytes[..], Compression::None);
    let mut info = reader.next().unwrap().unwrap();
    assert_eq!(info.header.record_kind(), Some(RecordKind::Info));
    assert_eq!(info.header.get_field(FieldKind::Filename), Some("test.warc"));
    assert_eq!(
        info.header.get_field(FieldKind::ContentType),
        Some("application/warc-fields")
    );
    let content = String::from_utf8(info.read_fully().unwrap()).unwrap();
    assert_eq!(
        content,
        format!(
            "software: warcio.rs/{}\r\nformat: WARC File Format 1.1\r\n\
             isPartOf: /tmp/archives/test.warc\r\n",
            env!("CARGO_PKG_VERSION")
        )
    );
    let (input, _) = info.finish().unwrap();
    assert_eq!(input.position(), first.offset);
}

#[test]
fn unused_writer_writes_nothing() {
    let writer = WarcWriter::new(Vec::new(), "empty.warc", Options::default());
    assert!(writer.finish().unwrap().is_empty());
}

#[test]
fn empty_batch_writes_nothing() {
    let mut writer = WarcWriter::new(Vec::new(), "empty.warc", Options::default());
    assert!(writer.write_batch(Vec::new()).unwrap().is_empty());
    assert!(writer.finish().unwrap().is_empty());
}

#[test]
fn batches_keep_submission_order() {
    let mut writer = WarcWriter::new(Vec::new(), "batch.warc", Options::default())
        .with_info("operator", "tests");
    let urls: Vec<String> = (0..20).map(|i| format!("http://example.com/{}", i)).collect();
    let records = urls
        .iter()
        .map(|url| {
            NewRecord::create(
                "resource",
                RecordFields {
                    url: Some(url.clone()),
                    ..Default::default()
                },
                Some(Box::new(Cursor::new(url.clone().into_bytes()))),
            )
            .unwrap()
        })
        .collect();
    let locations = writer.write_batch(records).unwrap();
    let bytes = writer.finish().unwrap();

    assert_eq!(locations.len(), urls.len());
    for (location, url) in locations.iter().zip(&urls) {
        let start = location.offset as usize;
        let end = start + location.length as usize;
        let mut record =
            crate::random_access::record_from_bytes(bytes[start..end].to_vec(), location.offset)
                .unwrap();
        assert_eq!(record.header.target_uri(), Some(url.as_str()));
        assert_eq!(record.read_fully().unwrap(), url.as_bytes());
    }
}

#[test]
fn compressed_records_are_separate_members() {
    let options = Options {
        gzip: true,
        ..Default::default()
    };
    let mut writer = WarcWriter::new(Vec::new(), "test.warc.gz", options);
    let location = writer
        .write_record(response("http://example.com/foo", b"payload"))
        .unwrap();
    let bytes = writer.finish().unwrap();
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    assert_eq!(
        Compression::detect(&bytes[location.offset as usize..]),
        Compression::Gzip
    );

    let mut record = crate::random_access::read_record_at(
        Cursor::new(&bytes),
        location.offset,
        location.length,
    )
    .unwrap();
    assert_eq!(record.read_fully().unwrap(), b"payload".to_vec());
}
