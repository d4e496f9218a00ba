use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;

/// Copy a file or a whole directory tree from `src` to `dest`.
pub fn copy_tree(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    let metadata = fs::symlink_metadata(src).map_err(|e| Error::Read {
        path: src.to_path_buf(),
        source: e,
    })?;

    if metadata.is_dir() {
        copy_dir_all(src, dest)
    } else {
        fs::copy(src, dest).map(drop).map_err(|e| Error::Write {
            path: dest.to_path_buf(),
            source: e,
        })
    }
}

/// Staging trees hold only directories and regular files, so a symlink in
/// `src` is refused rather than reproduced.
fn copy_dir_all(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    if !dest.exists() {
        fs::create_dir_all(dest).map_err(|e| Error::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;
    }

    for entry in fs::read_dir(src).map_err(|e| Error::Read {
        path: src.to_path_buf(),
        source: e,
    })? {
        let entry = entry.map_err(|e| Error::Read {
            path: src.to_path_buf(),
            source: e,
        })?;
        let file_type = entry.file_type().map_err(|e| Error::Read {
            path: entry.path(),
            source: e,
        })?;

        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if file_type.is_dir() {
            copy_dir_all(&src_path, &dest_path)?;
        } else if file_type.is_symlink() {
            return Err(Error::Read {
                path: src_path,
                source: io::Error::new(io::ErrorKind::Unsupported, "symbolic link in tree copy"),
            });
        } else {
            fs::copy(&src_path, &dest_path).map_err(|e| Error::Write {
                path: dest_path,
                source: e,
            })?;
        }
    }

    // Mode last, so a read-only source directory does not block its own children.
    let permissions = fs::metadata(src)
        .map_err(|e| Error::Read {
            path: src.to_path_buf(),
            source: e,
        })?
        .permissions();
    fs::set_permissions(dest, permissions).map_err(|e| Error::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}
