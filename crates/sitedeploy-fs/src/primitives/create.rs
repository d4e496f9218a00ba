use crate::{Error, Result};
use std::fs::{DirBuilder, File, OpenOptions};
use std::path::Path;

fn dir_builder(mode: u32, recursive: bool) -> DirBuilder {
    let mut builder = DirBuilder::new();
    builder.recursive(recursive);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder
}

/// Create `path` and any missing ancestors. Only directories created here
/// receive `mode` (subject to the process umask); existing ones are left alone.
pub fn create_dir_all(path: impl AsRef<Path>, mode: u32) -> Result<()> {
    let path = path.as_ref();
    dir_builder(mode, true)
        .create(path)
        .map_err(|e| Error::Write {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Create a single directory. Fails with `AlreadyExists` if anything is at `path`.
pub fn create_dir(path: impl AsRef<Path>, mode: u32) -> Result<()> {
    let path = path.as_ref();
    dir_builder(mode, false)
        .create(path)
        .map_err(|e| Error::Write {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Open `path` for writing, refusing to reuse anything already there.
pub fn create_new_file(path: impl AsRef<Path>, mode: u32) -> Result<File> {
    let path = path.as_ref();
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: e,
    })
}
