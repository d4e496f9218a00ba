//! Filesystem primitives for staged, rename-based deployments.
//!
//! Everything here is a thin, path-annotated wrapper over `std::fs`:
//! the transaction logic built on top relies on `rename(2)` being the
//! only step that changes what a live path resolves to.

mod error;
mod lock;
pub mod primitives;

pub use error::{Error, Result, is_cross_device};
pub use lock::LockFile;
pub use primitives::{
    atomic_rename, copy_tree, create_dir, create_dir_all, create_new_file, exists,
    read_dir_names, remove_tree,
};
