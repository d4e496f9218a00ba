use crate::{Error, Result};
use std::path::Path;

/// Single `rename(2)`: either `to` resolves to the old content or to `from`'s,
/// never to a mixture. Both paths must share a filesystem; a cross-device
/// failure is reported through [`Error::is_cross_device`] so callers can pick
/// a fallback.
pub fn atomic_rename(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    let from = from.as_ref();
    let to = to.as_ref();

    std::fs::rename(from, to).map_err(|e| Error::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    })
}
