use crate::{Error, Result};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;

/// `Ok(false)` only when the path is definitely absent; any other stat
/// failure is an error, since "unknown" must not be mistaken for "absent".
pub fn exists(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Names of the entries directly inside `dir`, sorted.
pub fn read_dir_names(dir: impl AsRef<Path>) -> Result<Vec<OsString>> {
    let dir = dir.as_ref();
    let read_err = |e: std::io::Error| Error::Read {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        names.push(entry.map_err(read_err)?.file_name());
    }
    names.sort();
    Ok(names)
}
