use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to rename '{}' to '{}': {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("failed to remove '{}': {source}", path.display())]
    Remove { path: PathBuf, source: io::Error },

    #[error("failed to lock '{}': {source}", path.display())]
    Lock { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn io(&self) -> &io::Error {
        match self {
            Self::Read { source, .. }
            | Self::Write { source, .. }
            | Self::Rename { source, .. }
            | Self::Remove { source, .. }
            | Self::Lock { source, .. } => source,
        }
    }

    /// Path the failing operation was acting on (the destination for renames).
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Remove { path, .. }
            | Self::Lock { path, .. } => path,
            Self::Rename { to, .. } => to,
        }
    }

    pub fn is_cross_device(&self) -> bool {
        is_cross_device(self.io())
    }
}

/// EXDEV: the two paths live on different filesystems.
pub fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices || (cfg!(unix) && err.raw_os_error() == Some(18))
}
