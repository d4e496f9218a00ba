//! File and tar/tar.gz extraction into a private staging path.
//!
//! # Architecture
//!
//! - `format.rs` - content-type classification and decompression
//! - `sanitize.rs` - path containment (traversal prevention)
//! - `extract/` - single-file and tar extraction
//! - `entry.rs` - extraction report types
//!
//! Only directories and regular files are materialised. Symlinks,
//! hardlinks, devices and FIFOs are skipped and logged at debug level.

pub use entry::{ArchiveReport, Entry, EntryKind};
pub use error::{Error, Result};
pub use extract::{extract_archive, extract_file};
pub use format::{ArchiveFormat, Compression, Decoder};
pub use options::ExtractOptions;
pub use sanitize::{SanitizedPath, sanitize_path};

mod entry;
mod error;
pub mod extract;
mod format;
mod options;
mod sanitize;
