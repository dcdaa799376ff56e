//! WARC files on disk.
//!
//! [`warcio`] deals only in byte streams; this crate connects it to the filesystem. Files are
//! read sequentially with [`read_warc_file`], written with a [`WarcFile`] session, indexed with
//! [`index_warc_files`], and single records are pulled out of them by location with
//! [`get_warc_record`].

#[macro_use]
extern crate log;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use thiserror::Error;

use warcio::index::{CdxIndexer, IndexError, IndexSource};
use warcio::random_access::{record_from_bytes, RangeError};
use warcio::writer::SerializeError;
use warcio::{NewRecord, Options, Record, RecordLocation, RecordReader, WarcWriter};

#[cfg(test)]
mod test;

/// The `software` announced in the `warcinfo` record of files written by this crate.
pub const SOFTWARE: &str = "warcio.rs/warcfile";

#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

impl Error {
    fn open<P: AsRef<Path>>(path: P) -> impl FnOnce(io::Error) -> Self {
        let path = path.as_ref().to_owned();
        move |source| Error::Open { path, source }
    }
}

/// Open the file at `path` and iterate over its records.
///
/// Records are expected to be gzip members if `options.gzip` is set.
pub fn read_warc_file<P: AsRef<Path>>(
    path: P,
    options: &Options,
) -> Result<RecordReader<BufReader<File>>, Error> {
    let file = File::open(path.as_ref()).map_err(Error::open(&path))?;
    Ok(RecordReader::new(
        BufReader::new(file),
        options.compression(),
    ))
}

/// A WARC file being written.
///
/// The file begins with a `warcinfo` record describing it, written along with the first record.
pub struct WarcFile {
    path: PathBuf,
    writer: WarcWriter<BufWriter<File>>,
}

impl WarcFile {
    /// Create (or truncate) the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, options: Options) -> Result<Self, Error> {
        let path = path.as_ref().to_owned();
        let file = File::create(&path).map_err(Error::open(&path))?;
        let writer = WarcWriter::new(
            BufWriter::new(file),
            path.to_string_lossy().into_owned(),
            options,
        )
        .with_info("software", SOFTWARE);
        debug!("created {}", path.display());

        Ok(WarcFile { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &Options {
        self.writer.options()
    }

    pub fn write_record(&mut self, record: NewRecord) -> Result<RecordLocation, Error> {
        Ok(self.writer.write_record(record)?)
    }

    /// Serialize `records` in parallel and write them in order.
    pub fn write_batch(&mut self, records: Vec<NewRecord>) -> Result<Vec<RecordLocation>, Error> {
        Ok(self.writer.write_batch(records)?)
    }

    /// Flush everything to disk and close the file.
    pub fn finish(self) -> io::Result<()> {
        let file = self
            .writer
            .finish()?
            .into_inner()
            .map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

/// A file to be indexed, identified in index entries by its path as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSource(pub PathBuf);

impl IndexSource for PathSource {
    type Reader = BufReader<File>;

    fn name(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }

    fn open(self) -> io::Result<Self::Reader> {
        File::open(&self.0).map(BufReader::new)
    }
}

/// Index every record in each of `paths`, in order.
pub fn index_warc_files<I, P>(
    paths: I,
    options: &Options,
) -> CdxIndexer<std::vec::IntoIter<PathSource>, PathSource>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let sources: Vec<PathSource> = paths
        .into_iter()
        .map(|p| PathSource(p.as_ref().to_owned()))
        .collect();
    CdxIndexer::new(sources, options)
}

/// Extract the single record of `length` bytes at `offset` in the file at `path`.
///
/// The file is memory-mapped so only the pages holding the record are read. Whether the record
/// is gzip-compressed is detected from its first bytes.
pub fn get_warc_record<P: AsRef<Path>>(
    path: P,
    offset: u64,
    length: u64,
) -> Result<Record<Cursor<Vec<u8>>>, Error> {
    let file = File::open(path.as_ref()).map_err(Error::open(&path))?;
    // SAFETY: the map is dropped before returning, and concurrent writers are not supported.
    let map = unsafe { Mmap::map(&file) }.map_err(Error::open(&path))?;

    let available = map.len() as u64;
    let end = match offset.checked_add(length) {
        Some(end) if end <= available => end,
        _ => {
            return Err(RangeError::OutOfRange {
                offset,
                length,
                available,
            }
            .into())
        }
    };
    trace!(
        "extracting {}..{} of {}",
        offset,
        end,
        path.as_ref().display()
    );

    let bytes = map[offset as usize..end as usize].to_vec();
    Ok(record_from_bytes(bytes, offset)?)
}
