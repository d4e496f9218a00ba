//! The deployment state machine.
//!
//! ```text
//! Init -> Staged -> BackedUp | NoBackupNeeded -> Swapped -> Committed
//!   \________\______________\____________________\-> Failed -> RolledBack
//! ```
//!
//! `RolledBack` is only reachable from a failed swap, which is the only step
//! that can leave the target changed. The phase is tracked here rather than
//! inferred from what happens to be on disk.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::cleanup;
use crate::effects::FileSystem;
use crate::error::DeployError;
use crate::path::{Target, TransactionId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Init,
    Staged,
    BackedUp,
    NoBackupNeeded,
    Swapped,
    Committed,
    Failed,
    RolledBack,
}

pub(crate) struct Transaction<'a, F: FileSystem> {
    fs: &'a F,
    target: &'a Target,
    staging: PathBuf,
    backup: PathBuf,
    dir_mode: u32,
    phase: Phase,
    backed_up: bool,
    cross_device: bool,
    // Something this transaction created is sitting at `staging`.
    staging_present: bool,
}

impl<'a, F: FileSystem> Transaction<'a, F> {
    /// `dir_mode` applies to missing parent directories of the target.
    pub(crate) fn new(fs: &'a F, target: &'a Target, id: &TransactionId, dir_mode: u32) -> Self {
        // Artifact names keep a directory target's trailing separator; the
        // filesystem calls below do not need it.
        let strip = |p: PathBuf| -> PathBuf { p.components().collect() };
        Self {
            fs,
            target,
            staging: strip(target.staging_path(id)),
            backup: strip(target.backup_path(id)),
            dir_mode,
            phase: Phase::Init,
            backed_up: false,
            cross_device: false,
            staging_present: false,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn target(&self) -> &Path {
        self.target.path()
    }

    pub(crate) fn staging(&self) -> &Path {
        &self.staging
    }

    pub(crate) fn backup(&self) -> &Path {
        &self.backup
    }

    pub(crate) fn backed_up(&self) -> bool {
        self.backed_up
    }

    pub(crate) fn cross_device(&self) -> bool {
        self.cross_device
    }

    /// Init -> Staged.
    ///
    /// Ensures the target's parent exists, then lets `extract` populate the
    /// staging path. The target is not touched, so a failure here needs no
    /// rollback; whatever `extract` left behind is removed on drop.
    pub(crate) fn stage<T>(
        &mut self,
        extract: impl FnOnce(&Path) -> sitedeploy_archive::Result<T>,
    ) -> sitedeploy_archive::Result<T> {
        if let Err(err) = self.fs.create_dir_all(self.target.parent(), self.dir_mode) {
            self.phase = Phase::Failed;
            return Err(err.into());
        }

        match extract(&self.staging) {
            Ok(staged) => {
                self.staging_present = true;
                self.phase = Phase::Staged;
                debug!(staging = %self.staging.display(), "staged");
                Ok(staged)
            }
            Err(err) => {
                // An exclusive create that hit an existing path did not
                // create anything of ours.
                self.staging_present = !self.is_staging_collision(&err);
                self.phase = Phase::Failed;
                Err(err)
            }
        }
    }

    /// Staged -> BackedUp | NoBackupNeeded.
    pub(crate) fn backup_existing(&mut self) -> Result<(), DeployError> {
        debug_assert_eq!(self.phase, Phase::Staged);
        let target = Target::path(self.target);

        let present = match self.fs.exists(target) {
            Ok(present) => present,
            Err(source) => {
                let err = self.backup_failed(source);
                return Err(self.fail(err));
            }
        };

        if !present {
            if let Err(source) = self.fs.create_dir_all(self.target.parent(), self.dir_mode) {
                let err = self.backup_failed(source);
                return Err(self.fail(err));
            }
            self.phase = Phase::NoBackupNeeded;
            debug!(target = %target.display(), "no previous content, nothing to back up");
            return Ok(());
        }

        if let Err(source) = self.fs.rename(target, &self.backup) {
            let err = self.backup_failed(source);
            return Err(self.fail(err));
        }
        self.backed_up = true;
        self.phase = Phase::BackedUp;
        debug!(target = %target.display(), backup = %self.backup.display(), "backed up");
        Ok(())
    }

    /// BackedUp | NoBackupNeeded -> Swapped.
    ///
    /// A cross-device rename falls back to copying the staged tree onto the
    /// target. Any other failure, including a failed copy, rolls back.
    pub(crate) fn swap(&mut self) -> Result<(), DeployError> {
        debug_assert!(matches!(
            self.phase,
            Phase::BackedUp | Phase::NoBackupNeeded
        ));
        let target = Target::path(self.target);

        match self.fs.rename(&self.staging, target) {
            Ok(()) => {
                self.staging_present = false;
                self.phase = Phase::Swapped;
                Ok(())
            }
            Err(err) if err.is_cross_device() => {
                warn!(
                    staging = %self.staging.display(),
                    target = %target.display(),
                    "staging and target are on different filesystems, copying instead of renaming"
                );
                if let Err(copy_err) = self.fs.copy_tree(&self.staging, target) {
                    return Err(self.roll_back_after(copy_err));
                }
                cleanup::remove_best_effort(self.fs, &self.staging, "staging");
                self.staging_present = false;
                self.cross_device = true;
                self.phase = Phase::Swapped;
                Ok(())
            }
            Err(err) => Err(self.roll_back_after(err)),
        }
    }

    /// Swapped -> Committed. Failing to remove the backup leaves it behind
    /// but does not undo the deployment.
    pub(crate) fn commit(&mut self) {
        debug_assert_eq!(self.phase, Phase::Swapped);
        if self.backed_up {
            cleanup::remove_best_effort(self.fs, &self.backup, "backup");
        }
        self.phase = Phase::Committed;
        info!(
            target = %self.target,
            backed_up = self.backed_up,
            cross_device = self.cross_device,
            "deployment committed"
        );
    }

    /// Put the backup back at the target.
    ///
    /// `Ok(false)` when no backup was taken: there is nothing to restore.
    /// An error means the previous content is stranded at the backup path.
    pub(crate) fn rollback(&mut self) -> sitedeploy_fs::Result<bool> {
        if !self.backed_up {
            self.phase = Phase::RolledBack;
            info!(target = %self.target, "no backup taken, nothing to roll back");
            return Ok(false);
        }

        let target = Target::path(self.target);
        if let Err(err) = self.fs.remove_tree(target) {
            warn!(target = %target.display(), error = %err, "failed to clear target before restoring backup");
        }
        self.fs.rename(&self.backup, target)?;

        self.backed_up = false;
        self.phase = Phase::RolledBack;
        info!(target = %self.target, "restored previous content");
        Ok(true)
    }

    fn roll_back_after(&mut self, source: sitedeploy_fs::Error) -> DeployError {
        self.phase = Phase::Failed;
        error!(
            target = %self.target,
            staging = %self.staging.display(),
            error = %source,
            "swap failed, rolling back"
        );

        match self.rollback() {
            Ok(rolled_back) => DeployError::SwapFailed {
                target: self.target.path().to_path_buf(),
                staging: self.staging.clone(),
                backup: self.backup.clone(),
                rolled_back,
                source,
            },
            Err(rollback_error) => {
                error!(
                    target = %self.target,
                    backup = %self.backup.display(),
                    staging = %self.staging.display(),
                    error = %rollback_error,
                    "rollback failed; manual intervention required"
                );
                DeployError::RollbackFailed {
                    target: self.target.path().to_path_buf(),
                    staging: self.staging.clone(),
                    backup: self.backup.clone(),
                    rollback_error,
                    source,
                }
            }
        }
    }

    fn backup_failed(&self, source: sitedeploy_fs::Error) -> DeployError {
        DeployError::BackupFailed {
            target: self.target.path().to_path_buf(),
            backup: self.backup.clone(),
            source,
        }
    }

    fn fail(&mut self, err: DeployError) -> DeployError {
        self.phase = Phase::Failed;
        error!(error = %err, "deployment failed");
        err
    }

    fn is_staging_collision(&self, err: &sitedeploy_archive::Error) -> bool {
        matches!(
            err,
            sitedeploy_archive::Error::Fs(e)
                if e.io().kind() == io::ErrorKind::AlreadyExists && e.path() == self.staging.as_path()
        )
    }
}

impl<F: FileSystem> Drop for Transaction<'_, F> {
    fn drop(&mut self) {
        if self.staging_present {
            cleanup::remove_best_effort(self.fs, &self.staging, "staging");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use sitedeploy_archive::{ExtractOptions, extract_file};

    use super::*;
    use crate::effects::StdFileSystem;

    fn write_file(body: &'static [u8]) -> impl FnOnce(&Path) -> sitedeploy_archive::Result<u64> {
        move |staging| extract_file(Cursor::new(body), staging, &ExtractOptions::default())
    }

    fn siblings(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_new_target_walks_every_phase() {
        let dir = tempfile::tempdir().unwrap();
        let target = Target::file(dir.path().join("www/index.html")).unwrap();
        let id = TransactionId::generate();
        let mut tx = Transaction::new(&StdFileSystem, &target, &id, 0o750);
        assert_eq!(tx.phase(), Phase::Init);

        tx.stage(write_file(b"hello")).unwrap();
        assert_eq!(tx.phase(), Phase::Staged);
        assert!(tx.staging().is_file());

        tx.backup_existing().unwrap();
        assert_eq!(tx.phase(), Phase::NoBackupNeeded);
        assert!(!tx.backup().exists());

        tx.swap().unwrap();
        assert_eq!(tx.phase(), Phase::Swapped);
        tx.commit();
        assert_eq!(tx.phase(), Phase::Committed);
        assert!(!tx.backed_up());
        drop(tx);

        assert_eq!(std::fs::read(target.path()).unwrap(), b"hello");
        assert_eq!(siblings(&dir.path().join("www")), ["index.html"]);
    }

    #[test]
    fn test_existing_target_is_backed_up_then_purged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, "old").unwrap();
        let target = Target::file(&path).unwrap();
        let id = TransactionId::generate();
        let mut tx = Transaction::new(&StdFileSystem, &target, &id, 0o750);

        tx.stage(write_file(b"new")).unwrap();
        tx.backup_existing().unwrap();
        assert_eq!(tx.phase(), Phase::BackedUp);
        assert_eq!(std::fs::read(tx.backup()).unwrap(), b"old");
        assert!(!path.exists());

        tx.swap().unwrap();
        tx.commit();
        drop(tx);

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert_eq!(siblings(dir.path()), ["index.html"]);
    }

    #[test]
    fn test_rollback_restores_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, "old").unwrap();
        let target = Target::file(&path).unwrap();
        let id = TransactionId::generate();
        let mut tx = Transaction::new(&StdFileSystem, &target, &id, 0o750);

        tx.stage(write_file(b"new")).unwrap();
        tx.backup_existing().unwrap();
        std::fs::write(&path, "half-written").unwrap();

        assert!(tx.rollback().unwrap());
        assert_eq!(tx.phase(), Phase::RolledBack);
        drop(tx);

        assert_eq!(std::fs::read(&path).unwrap(), b"old");
        assert_eq!(siblings(dir.path()), ["index.html"]);
    }

    #[test]
    fn test_rollback_without_backup_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let target = Target::file(dir.path().join("index.html")).unwrap();
        let id = TransactionId::generate();
        let mut tx = Transaction::new(&StdFileSystem, &target, &id, 0o750);

        tx.stage(write_file(b"new")).unwrap();
        tx.backup_existing().unwrap();
        assert!(!tx.rollback().unwrap());
        assert_eq!(tx.phase(), Phase::RolledBack);
    }

    #[test]
    fn test_dropping_a_staged_transaction_removes_staging() {
        let dir = tempfile::tempdir().unwrap();
        let target = Target::directory(dir.path().join("site")).unwrap();
        let id = TransactionId::generate();
        let mut tx = Transaction::new(&StdFileSystem, &target, &id, 0o750);

        tx.stage(|staging| {
            std::fs::create_dir(staging).unwrap();
            std::fs::write(staging.join("index.html"), "x").unwrap();
            Ok(())
        })
        .unwrap();
        let staging = tx.staging().to_path_buf();
        assert!(staging.is_dir());
        drop(tx);

        assert!(!staging.exists());
        assert!(siblings(dir.path()).is_empty());
    }

    #[test]
    fn test_stale_staging_path_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let target = Target::file(dir.path().join("index.html")).unwrap();
        let id = TransactionId::generate();
        let mut tx = Transaction::new(&StdFileSystem, &target, &id, 0o750);
        std::fs::write(tx.staging(), "someone else's").unwrap();

        let err = tx.stage(write_file(b"new")).unwrap_err();
        assert!(!err.is_input_error());
        assert_eq!(tx.phase(), Phase::Failed);
        let staging = tx.staging().to_path_buf();
        drop(tx);

        assert_eq!(std::fs::read(&staging).unwrap(), b"someone else's");
    }
}
