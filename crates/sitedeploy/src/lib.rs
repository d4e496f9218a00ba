//! Transactional deployment of a single file or a tar / tar.gz tree onto a
//! live path.
//!
//! A deployment stages the new content next to the target, moves the old
//! content aside, and renames the staged content into place. If the swap
//! fails the old content is renamed back. At no point can an outside reader
//! see anything but the complete old or the complete new content.
//!
//! ```no_run
//! use sitedeploy::{Deployer, DeployerConfig, Target};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let deployer = Deployer::new(DeployerConfig::default());
//! let target = Target::parse("/srv/www/site/")?;
//! let body = std::fs::File::open("site.tar.gz")?;
//! let report = deployer.deploy(&target, "application/x-tar+gzip", body)?;
//! println!("deployed {} bytes to {}", report.bytes, report.target.display());
//! # Ok(())
//! # }
//! ```

mod body;
mod cleanup;
mod config;
mod deployer;
mod effects;
mod error;
mod lock;
mod path;
mod transaction;

pub use cleanup::SweepReport;
pub use config::DeployerConfig;
pub use deployer::{DeployReport, Deployer};
pub use effects::{FileSystem, StdFileSystem};
pub use error::{ConfigError, DeployError, ErrorKind};
pub use path::{Artifact, ArtifactKind, Target, TransactionId};
pub use sitedeploy_archive::{ArchiveFormat, ArchiveReport, Compression, Entry, EntryKind};
pub use sitedeploy_fs;
