//! Filesystem effects used by the transaction's transition steps.
//!
//! Extraction always writes through the real filesystem; everything after
//! staging goes through [`FileSystem`] so tests can fail individual renames.

use std::ffi::OsString;
use std::path::Path;

use sitedeploy_fs::Result;

pub trait FileSystem {
    /// `Ok(false)` only when `path` is definitely absent.
    fn exists(&self, path: &Path) -> Result<bool>;
    fn create_dir_all(&self, path: &Path, mode: u32) -> Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    /// Recursive copy used when a rename crosses filesystems.
    fn copy_tree(&self, from: &Path, to: &Path) -> Result<()>;
    /// Remove a file or directory tree; `Ok(false)` if nothing was there.
    fn remove_tree(&self, path: &Path) -> Result<bool>;
    fn read_dir_names(&self, dir: &Path) -> Result<Vec<OsString>>;
}

/// [`FileSystem`] backed by `sitedeploy_fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> Result<bool> {
        sitedeploy_fs::exists(path)
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> Result<()> {
        sitedeploy_fs::create_dir_all(path, mode)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        sitedeploy_fs::atomic_rename(from, to)
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> Result<()> {
        sitedeploy_fs::copy_tree(from, to)
    }

    fn remove_tree(&self, path: &Path) -> Result<bool> {
        sitedeploy_fs::remove_tree(path)
    }

    fn read_dir_names(&self, dir: &Path) -> Result<Vec<OsString>> {
        sitedeploy_fs::read_dir_names(dir)
    }
}

impl<F: FileSystem + ?Sized> FileSystem for &F {
    fn exists(&self, path: &Path) -> Result<bool> {
        (**self).exists(path)
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> Result<()> {
        (**self).create_dir_all(path, mode)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        (**self).rename(from, to)
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> Result<()> {
        (**self).copy_tree(from, to)
    }

    fn remove_tree(&self, path: &Path) -> Result<bool> {
        (**self).remove_tree(path)
    }

    fn read_dir_names(&self, dir: &Path) -> Result<Vec<OsString>> {
        (**self).read_dir_names(dir)
    }
}
