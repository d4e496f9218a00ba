use std::path::PathBuf;

use crate::format::ArchiveFormat;

/// An entry materialised in the staging tree.
#[derive(Clone, Debug)]
pub struct Entry {
    pub original_path: PathBuf,
    pub target_path: PathBuf,
    pub size: u64,
    pub mode: Option<u32>,
    pub kind: EntryKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Clone, Debug)]
pub struct ArchiveReport {
    pub format: ArchiveFormat,
    pub entry_count: usize,
    pub total_bytes: u64,
    /// Symlinks, hardlinks, devices and other non-regular entries that were
    /// left out of the staging tree.
    pub skipped: usize,
    pub entries: Vec<Entry>,
}
