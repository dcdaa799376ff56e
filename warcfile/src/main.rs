use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{arg, command, value_parser, Arg, ArgAction, ArgMatches, Command};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info};

use warcio::{Compression, DigestAlgo, FieldKind, NewRecord, Options, RecordFields, Version};

use warcfile::{get_warc_record, index_warc_files, read_warc_file, WarcFile};

fn cli() -> Command<'static> {
    command!()
        .about("Index, inspect and create WARC files")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("index")
                .about("Write a CDXJ index of every record in the given files to standard output")
                .arg(
                    arg!(<FILES> ... "WARC files to index")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(gzip_arg()),
        )
        .subcommand(
            Command::new("list")
                .about("Print the type, target and date of each record")
                .arg(arg!(<FILE> "WARC file to list").value_parser(value_parser!(PathBuf)))
                .arg(gzip_arg()),
        )
        .subcommand(
            Command::new("get")
                .about("Print one record, located by offset and length as found in an index")
                .arg(arg!(<FILE> "WARC file holding the record").value_parser(value_parser!(PathBuf)))
                .arg(arg!(<OFFSET> "Offset of the record in bytes").value_parser(value_parser!(u64)))
                .arg(arg!(<LENGTH> "Length of the record in bytes").value_parser(value_parser!(u64)))
                .arg(
                    arg!(--"headers-only" "Print only the WARC and HTTP headers")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("pack")
                .about("Write the given files into a new WARC file as resource records")
                .arg(arg!(<OUTPUT> "WARC file to create").value_parser(value_parser!(PathBuf)))
                .arg(arg!(<FILES> ... "Files to store").value_parser(value_parser!(PathBuf)))
                .arg(gzip_arg())
                .arg(
                    arg!(--"keep-headers-case" "Write header names in the case given")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    arg!(--digest <ALGO> "Digest algorithm for block and payload digests")
                        .required(false)
                        .default_value("sha-1")
                        .value_parser(value_parser!(DigestAlgo)),
                )
                .arg(
                    arg!(--"warc-version" <VERSION> "WARC version to write")
                        .required(false)
                        .default_value("1.1")
                        .value_parser(value_parser!(Version)),
                ),
        )
}

fn gzip_arg() -> Arg<'static> {
    arg!(--gzip "Records are individually gzip-compressed (the default for *.gz files)")
        .action(ArgAction::SetTrue)
}

/// Build options from flags common to several subcommands.
///
/// Compression is enabled when requested or when `path` is named like a compressed file.
fn options_from(matches: &ArgMatches, path: &Path) -> Options {
    let gzip = flag(matches, "gzip") || Compression::guess_for_filename(path) == Compression::Gzip;

    let mut options = Options {
        gzip,
        keep_headers_case: flag(matches, "keep-headers-case"),
        ..Default::default()
    };
    if let Ok(Some(algo)) = matches.try_get_one::<DigestAlgo>("digest") {
        options.digest_algo = *algo;
    }
    if let Ok(Some(version)) = matches.try_get_one::<Version>("warc-version") {
        options.warc_version = *version;
    }
    options
}

/// Whether a flag was given; `false` for flags the subcommand doesn't have.
fn flag(matches: &ArgMatches, name: &str) -> bool {
    matches!(matches.try_get_one::<bool>(name), Ok(Some(true)))
}

fn main() -> ExitCode {
    pretty_env_logger::init();

    let matches = cli().get_matches();
    let result = match matches.subcommand() {
        Some(("index", m)) => index(m),
        Some(("list", m)) => list(m),
        Some(("get", m)) => get(m),
        Some(("pack", m)) => pack(m),
        _ => unreachable!("a subcommand is required"),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

type CommandResult = Result<(), Box<dyn Error>>;

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} {pos}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_owned());
    pb
}

fn index(matches: &ArgMatches) -> CommandResult {
    let paths: Vec<&PathBuf> = matches
        .get_many::<PathBuf>("FILES")
        .map(Iterator::collect)
        .unwrap_or_default();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let progress = spinner("records indexed");

    // Compression is decided per file, so each is indexed on its own.
    for path in paths {
        let options = options_from(matches, path);
        debug!("indexing {} with {:?}", path.display(), options.compression());
        for entry in index_warc_files(Some(path), &options) {
            writeln!(out, "{}", entry?)?;
            progress.inc(1);
        }
    }
    progress.finish_and_clear();
    info!("indexed {} records", progress.position());
    Ok(())
}

fn list(matches: &ArgMatches) -> CommandResult {
    let path = matches
        .get_one::<PathBuf>("FILE")
        .ok_or("no file given")?;
    let options = options_from(matches, path);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut reader = read_warc_file(path, &options)?;
    while let Some(record) = reader.next() {
        let record = record?;
        let header = &record.header;
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            record.offset(),
            header.get_field(FieldKind::Type).unwrap_or("-"),
            header.target_uri().unwrap_or("-"),
            header.get_field(FieldKind::Date).unwrap_or("-"),
        )?;
        let offset = record.offset();
        let (_, buffer) = record
            .finish()
            .map_err(|e| e.into_invalid_record(offset))?;
        reader.recycle_buffer(buffer);
    }
    Ok(())
}

fn get(matches: &ArgMatches) -> CommandResult {
    let path = matches
        .get_one::<PathBuf>("FILE")
        .ok_or("no file given")?;
    let offset = *matches.get_one::<u64>("OFFSET").ok_or("no offset given")?;
    let length = *matches.get_one::<u64>("LENGTH").ok_or("no length given")?;
    let headers_only = flag(matches, "headers-only");

    let mut record = get_warc_record(path, offset, length)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    record.header.write_to(&mut out, true)?;
    if let Some(http) = record.http_headers() {
        out.write_all(&http.to_bytes(true))?;
    }
    if !headers_only {
        loop {
            let n = {
                let buf = record.fill_buf()?;
                if buf.is_empty() {
                    break;
                }
                out.write_all(buf)?;
                buf.len()
            };
            record.consume(n);
        }
    }
    out.flush()?;
    Ok(())
}

fn pack(matches: &ArgMatches) -> CommandResult {
    let output = matches
        .get_one::<PathBuf>("OUTPUT")
        .ok_or("no output file given")?;
    let inputs: Vec<&PathBuf> = matches
        .get_many::<PathBuf>("FILES")
        .map(Iterator::collect)
        .unwrap_or_default();
    let options = options_from(matches, output);

    let mut records = Vec::with_capacity(inputs.len());
    for input in inputs {
        let url = format!("file://{}", input.canonicalize()?.display());
        let content = File::open(input)?;
        let record = NewRecord::create(
            "resource",
            RecordFields {
                url: Some(url),
                ..Default::default()
            },
            None,
        )?
        .with_content(content);
        records.push(record);
    }

    let mut file = WarcFile::create(output, options)?;
    let locations = file.write_batch(records)?;
    file.finish()?;
    info!(
        "wrote {} records to {}",
        locations.len(),
        output.display()
    );
    Ok(())
}
