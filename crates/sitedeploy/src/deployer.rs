use std::io::Read;
use std::path::{Path, PathBuf};

use sitedeploy_archive::{ArchiveFormat, ArchiveReport, extract_archive, extract_file};
use tracing::{debug, error, info, instrument};

use crate::body::LimitedBody;
use crate::cleanup::{self, SweepReport};
use crate::config::DeployerConfig;
use crate::effects::{FileSystem, StdFileSystem};
use crate::error::DeployError;
use crate::lock;
use crate::path::{Target, TransactionId};
use crate::transaction::Transaction;

/// Summary of a committed deployment.
#[derive(Clone, Debug)]
pub struct DeployReport {
    pub target: PathBuf,
    pub id: TransactionId,
    /// Whether previous content existed and was replaced.
    pub backed_up: bool,
    /// The swap had to copy because staging and target were on different
    /// filesystems.
    pub cross_device_fallback: bool,
    /// Bytes of file content written.
    pub bytes: u64,
    /// Set for directory deployments.
    pub archive: Option<ArchiveReport>,
}

enum Staged {
    File(u64),
    Archive(ArchiveReport),
}

/// Entry point for the HTTP layer: one call per upload.
///
/// All deployments in the process, across every `Deployer`, are serialised
/// by a single lock held from staging until commit or rollback.
#[derive(Debug, Default)]
pub struct Deployer<F = StdFileSystem> {
    config: DeployerConfig,
    fs: F,
}

impl Deployer {
    pub fn new(config: DeployerConfig) -> Self {
        Self::with_filesystem(config, StdFileSystem)
    }
}

impl<F: FileSystem> Deployer<F> {
    pub fn with_filesystem(config: DeployerConfig, fs: F) -> Self {
        Self { config, fs }
    }

    pub fn config(&self) -> &DeployerConfig {
        &self.config
    }

    /// Replace whatever lives at `target` with `body`.
    ///
    /// For a directory target `body` is a tar or gzip-compressed tar and
    /// `content_type` selects which; for a file target `content_type` is
    /// ignored. On error the target holds its previous content, except for
    /// [`DeployError::RollbackFailed`], where it is stranded at the backup
    /// path named in the error.
    #[instrument(skip_all, fields(target = %target))]
    pub fn deploy<R: Read>(
        &self,
        target: &Target,
        content_type: &str,
        body: R,
    ) -> Result<DeployReport, DeployError> {
        let id = TransactionId::generate();

        let format = if target.is_dir() {
            let format = ArchiveFormat::from_content_type(content_type).map_err(|source| {
                DeployError::InvalidContent {
                    target: target.path().to_path_buf(),
                    staging: target.staging_path(&id),
                    source,
                }
            })?;
            Some(format)
        } else {
            None
        };

        let _guard = lock::acquire(self.config.lock_file.as_deref())?;

        let mut tx = Transaction::new(&self.fs, target, &id, self.config.dir_mode);
        debug!(
            id = %id,
            staging = %tx.staging().display(),
            backup = %tx.backup().display(),
            "transaction started"
        );

        let mut body = LimitedBody::new(body, self.config.max_bytes());
        let options = self.config.extract_options();
        let staged = tx.stage(|staging| match format {
            Some(format) => {
                extract_archive(&mut body, staging, format, &options).map(Staged::Archive)
            }
            None => extract_file(&mut body, staging, &options).map(Staged::File),
        });
        let staged = match staged {
            Ok(staged) => staged,
            Err(source) => return Err(self.staging_error(&tx, body.exceeded(), source)),
        };

        tx.backup_existing()?;
        tx.swap()?;
        tx.commit();

        let (bytes, archive) = match staged {
            Staged::File(bytes) => (bytes, None),
            Staged::Archive(report) => (report.total_bytes, Some(report)),
        };

        Ok(DeployReport {
            target: target.path().to_path_buf(),
            id,
            backed_up: tx.backed_up(),
            cross_device_fallback: tx.cross_device(),
            bytes,
            archive,
        })
    }

    /// Clean up artifacts that crashed transactions left in `dir`.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn sweep(&self, dir: &Path) -> Result<SweepReport, DeployError> {
        let _guard = lock::acquire(self.config.lock_file.as_deref())?;
        let report = cleanup::sweep(&self.fs, dir)?;
        info!(
            removed = report.removed,
            restored = report.restored,
            failed = report.failed,
            "sweep finished"
        );
        Ok(report)
    }

    fn staging_error(
        &self,
        tx: &Transaction<'_, F>,
        exceeded: bool,
        source: sitedeploy_archive::Error,
    ) -> DeployError {
        let target = tx.target().to_path_buf();
        let staging = tx.staging().to_path_buf();

        let err = if exceeded {
            DeployError::PayloadTooLarge {
                target,
                limit: self.config.max_bytes(),
            }
        } else if source.is_input_error() {
            DeployError::InvalidContent {
                target,
                staging,
                source,
            }
        } else {
            DeployError::StagingFailed {
                target,
                staging,
                source,
            }
        };

        if err.is_client_error() {
            info!(phase = ?tx.phase(), error = %err, "payload rejected");
        } else {
            error!(phase = ?tx.phase(), error = %err, "staging failed");
        }
        err
    }
}
