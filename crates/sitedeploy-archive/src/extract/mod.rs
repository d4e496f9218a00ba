//! Streaming extraction into a staging path.
//!
//! Nothing here cleans up after itself: a failed extraction leaves a partly
//! populated staging path behind, and removing it belongs to the caller
//! that owns the staging path.

use std::io::{self, Read, Write};
use std::path::Path;

use crate::entry::ArchiveReport;
use crate::error::{Error, Result};
use crate::format::ArchiveFormat;
use crate::options::ExtractOptions;

mod tar;

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Stream `reader` into a new file at `destination`.
///
/// The file is created exclusively: an existing path (for instance a stale
/// staging file from a crashed run) is an error, never overwritten.
/// Returns the number of bytes written.
pub fn extract_file<R: Read>(
    mut reader: R,
    destination: &Path,
    options: &ExtractOptions,
) -> Result<u64> {
    let mut file = sitedeploy_fs::create_new_file(destination, options.file_mode)?;
    pump(&mut reader, &mut file, destination, |source| Error::Read { source })
}

/// Extract `reader` as `format` into a new directory at `destination`.
///
/// A gzip payload is sniffed before the staging directory is created.
pub fn extract_archive<R: Read>(
    reader: R,
    destination: &Path,
    format: ArchiveFormat,
    options: &ExtractOptions,
) -> Result<ArchiveReport> {
    let decoder = format.compression().decoder(reader)?;

    sitedeploy_fs::create_dir(destination, options.dir_mode)?;
    let root = std::path::absolute(destination).map_err(|source| Error::ExtractionFailed {
        path: destination.to_path_buf(),
        source,
    })?;

    let extracted = tar::extract_tar(decoder, &root, options)?;

    Ok(ArchiveReport {
        format,
        entry_count: extracted.entries.len(),
        total_bytes: extracted.total_bytes,
        skipped: extracted.skipped,
        entries: extracted.entries,
    })
}

/// Copy until EOF, telling read failures (bad input) apart from write
/// failures (staging I/O).
fn pump<R, W>(
    reader: &mut R,
    writer: &mut W,
    path: &Path,
    read_error: impl Fn(io::Error) -> Error,
) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(e)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|source| Error::ExtractionFailed {
                path: path.to_path_buf(),
                source,
            })?;
        total += n as u64;
    }

    writer.flush().map_err(|source| Error::ExtractionFailed {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(total)
}
