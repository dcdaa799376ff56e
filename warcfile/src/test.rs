use std::io::Read;
use std::path::PathBuf;

use pretty_assertions::assert_eq;

use warcio::random_access::RangeError;
use warcio::{FieldKind, NewRecord, Options, RecordFields, RecordKind};

use crate::{get_warc_record, index_warc_files, read_warc_file, Error, WarcFile, SOFTWARE};

/// A path in the temporary directory unique to this process and `name`.
fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("warcfile-{}-{}", std::process::id(), name))
}

fn resource(url: &str, body: &'static [u8]) -> NewRecord {
    NewRecord::create(
        "resource",
        RecordFields {
            url: Some(url.to_owned()),
            ..Default::default()
        },
        Some(Box::new(body)),
    )
    .unwrap()
}

#[test]
fn written_file_starts_with_warcinfo() {
    let path = scratch_path("warcinfo.warc");
    let mut file = WarcFile::create(&path, Options::default()).unwrap();
    assert_eq!(file.path(), path.as_path());
    file.write_record(resource("http://example.com/", b"one"))
        .unwrap();
    file.finish().unwrap();

    let mut reader = read_warc_file(&path, &Options::default()).unwrap();
    let mut info = reader.next().unwrap().unwrap();
    assert_eq!(info.header.record_kind(), Some(RecordKind::Info));
    assert_eq!(
        info.header.get_field(FieldKind::Filename),
        path.file_name().and_then(|s| s.to_str())
    );
    let content = String::from_utf8(info.read_fully().unwrap()).unwrap();
    assert!(content.starts_with(&format!("software: {}\r\n", SOFTWARE)));
    assert!(content.contains(&format!("isPartOf: {}\r\n", path.display())));

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn index_then_get_each_record() {
    let path = scratch_path("roundtrip.warc.gz");
    let options = Options {
        gzip: true,
        ..Default::default()
    };
    let mut file = WarcFile::create(&path, options.clone()).unwrap();
    let locations = file
        .write_batch(vec![
            resource("http://example.com/a", b"first"),
            resource("http://example.com/b", b"second"),
        ])
        .unwrap();
    file.finish().unwrap();

    let entries = index_warc_files(&[&path], &options)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(entries.len(), 3);
    for (entry, location) in entries[1..].iter().zip(&locations) {
        assert_eq!((entry.offset, entry.length), (location.offset, location.length));
        assert_eq!(entry.filename, path.to_string_lossy());
    }

    let mut bodies = vec![];
    for entry in &entries[1..] {
        let mut record = get_warc_record(&path, entry.offset, entry.length).unwrap();
        assert_eq!(record.header.target_uri(), entry.url.as_deref());
        let mut body = String::new();
        record.read_to_string(&mut body).unwrap();
        bodies.push(body);
    }
    assert_eq!(bodies, vec!["first", "second"]);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn get_past_end_of_file() {
    let path = scratch_path("short.warc");
    let mut file = WarcFile::create(&path, Options::default()).unwrap();
    let location = file
        .write_record(resource("http://example.com/", b"x"))
        .unwrap();
    file.finish().unwrap();

    match get_warc_record(&path, location.offset, location.length + 1) {
        Err(Error::Range(RangeError::OutOfRange { available, .. })) => {
            assert_eq!(available, location.offset + location.length);
        }
        other => panic!("expected OutOfRange, got {:?}", other.map(|r| r.header)),
    }

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn missing_files_name_their_path() {
    let path = scratch_path("does-not-exist.warc");
    match read_warc_file(&path, &Options::default()) {
        Err(Error::Open { path: p, source }) => {
            assert_eq!(p, path);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        Err(e) => panic!("unexpected error {:?}", e),
        Ok(_) => panic!("opened a missing file"),
    }
    assert!(matches!(
        get_warc_record(&path, 0, 1),
        Err(Error::Open { .. })
    ));
}
