use std::fs::OpenOptions;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::entry::{Entry, EntryKind};
use crate::error::{Error, Result};
use crate::options::ExtractOptions;
use crate::sanitize::{SanitizedPath, sanitize_path};

use super::pump;

const PERMISSION_BITS: u32 = 0o777;

pub(super) struct Extracted {
    pub entries: Vec<Entry>,
    pub total_bytes: u64,
    pub skipped: usize,
}

/// Walk the archive until its end marker, materialising directories and
/// regular files under `root`. Any entry that would land outside `root`
/// aborts the whole walk.
pub(super) fn extract_tar<R: Read>(
    reader: R,
    root: &Path,
    options: &ExtractOptions,
) -> Result<Extracted> {
    let mut archive = tar::Archive::new(reader);
    let mut extracted = Extracted {
        entries: Vec::new(),
        total_bytes: 0,
        skipped: 0,
    };

    let entries = archive
        .entries()
        .map_err(|source| Error::Corrupted { source })?;

    for entry in entries {
        let mut entry = entry.map_err(|source| Error::Corrupted { source })?;

        let original = entry
            .path()
            .map_err(|source| Error::InvalidPath { source })?
            .into_owned();
        let sanitized = sanitize_path(&original, root)?;

        let entry_type = entry.header().entry_type();
        // Permission bits only: setuid, setgid and sticky never survive.
        let mode = entry.header().mode().ok().map(|m| m & PERMISSION_BITS);

        if entry_type.is_dir() {
            if !sanitized.is_root(root) {
                sitedeploy_fs::create_dir_all(
                    &sanitized.resolved,
                    mode.unwrap_or(options.dir_mode),
                )?;
            }
            extracted.entries.push(Entry {
                original_path: sanitized.original,
                target_path: sanitized.resolved,
                size: 0,
                mode,
                kind: EntryKind::Directory,
            });
        } else if entry_type.is_file() {
            if sanitized.is_root(root) {
                return Err(Error::PathTraversal {
                    entry: sanitized.original,
                    resolved: sanitized.resolved,
                });
            }
            let size = write_file(&mut entry, &sanitized, mode, options)?;
            extracted.total_bytes += size;
            extracted.entries.push(Entry {
                original_path: sanitized.original,
                target_path: sanitized.resolved,
                size,
                mode,
                kind: EntryKind::File,
            });
        } else {
            debug!(
                entry = %original.display(),
                entry_type = ?entry_type,
                "skipping unsupported tar entry type"
            );
            extracted.skipped += 1;
        }
    }

    Ok(extracted)
}

fn write_file<R: Read>(
    entry: &mut tar::Entry<'_, R>,
    sanitized: &SanitizedPath,
    mode: Option<u32>,
    options: &ExtractOptions,
) -> Result<u64> {
    let path = &sanitized.resolved;

    if let Some(parent) = path.parent() {
        sitedeploy_fs::create_dir_all(parent, options.dir_mode)?;
    }

    let mut open = OpenOptions::new();
    open.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        open.mode(mode.unwrap_or(options.file_mode));
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = open.open(path).map_err(|source| Error::ExtractionFailed {
        path: path.clone(),
        source,
    })?;

    // The entry reader stops at the entry boundary; a short read here means a
    // truncated archive, not a staging failure.
    pump(entry, &mut file, path, |source| Error::Corrupted { source })
}
