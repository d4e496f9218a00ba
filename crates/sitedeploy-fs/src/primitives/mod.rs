pub mod copy_dir;
pub mod create;
pub mod meta;
pub mod remove;
pub mod rename;

pub use copy_dir::copy_tree;
pub use create::{create_dir, create_dir_all, create_new_file};
pub use meta::{exists, read_dir_names};
pub use remove::remove_tree;
pub use rename::atomic_rename;
