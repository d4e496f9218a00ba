//! Best-effort removal of staging and backup artifacts.
//!
//! Cleanup never changes the outcome of the operation it follows: failures
//! are logged and counted, not returned.

use std::collections::{BTreeMap, HashSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::effects::FileSystem;
use crate::error::DeployError;
use crate::path::{Artifact, ArtifactKind};

/// Remove `path` if present. Returns `false` only when removal failed.
pub(crate) fn remove_best_effort<F: FileSystem>(fs: &F, path: &Path, what: &str) -> bool {
    match fs.remove_tree(path) {
        Ok(true) => {
            debug!(path = %path.display(), "removed {what}");
            true
        }
        Ok(false) => true,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to remove {what}, leaving it behind");
            false
        }
    }
}

/// Outcome of [`Deployer::sweep`](crate::Deployer::sweep).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Stale staging artifacts and superseded backups deleted.
    pub removed: usize,
    /// Backups renamed back into place.
    pub restored: usize,
    /// Artifacts that could not be handled; see the log.
    pub failed: usize,
}

/// Clear the artifacts a crashed transaction left in `dir`.
///
/// Backups are settled first, per target:
///
/// - A backup whose staging sibling (same target, same id) survived belongs
///   to a swap that never finished. Whatever sits at the target may be a
///   partial copy, so the backup is put back over it.
/// - Otherwise a live target means the swap landed and only the commit was
///   lost, so its backups are deleted.
/// - A missing target with exactly one backup gets that backup restored.
///   Several candidates are ambiguous and stay where they are.
///
/// Staging leftovers are deleted afterwards. Must run under the deployment
/// lock.
pub(crate) fn sweep<F: FileSystem>(fs: &F, dir: &Path) -> Result<SweepReport, DeployError> {
    let names = fs
        .read_dir_names(dir)
        .map_err(|source| DeployError::SweepFailed {
            dir: dir.to_path_buf(),
            source,
        })?;

    let artifacts: Vec<_> = names
        .iter()
        .filter_map(|name| Artifact::parse(name).map(|artifact| (dir.join(name), artifact)))
        .collect();

    let interrupted: HashSet<(&OsStr, &str)> = artifacts
        .iter()
        .filter(|(_, artifact)| artifact.kind == ArtifactKind::Staging)
        .map(|(_, artifact)| (artifact.base.as_os_str(), artifact.id.as_str()))
        .collect();

    let mut backups: BTreeMap<&OsStr, Vec<&(PathBuf, Artifact)>> = BTreeMap::new();
    for leftover in artifacts
        .iter()
        .filter(|(_, artifact)| artifact.kind == ArtifactKind::Backup)
    {
        backups
            .entry(leftover.1.base.as_os_str())
            .or_default()
            .push(leftover);
    }

    let mut report = SweepReport::default();

    for (base, group) in &backups {
        settle_backups(fs, &dir.join(base), group, &interrupted, &mut report);
    }

    for (path, _) in artifacts
        .iter()
        .filter(|(_, artifact)| artifact.kind == ArtifactKind::Staging)
    {
        if remove_best_effort(fs, path, "stale staging") {
            report.removed += 1;
        } else {
            report.failed += 1;
        }
    }

    Ok(report)
}

/// Restore at most one of the backups taken for `live` and delete the rest.
fn settle_backups<F: FileSystem>(
    fs: &F,
    live: &Path,
    backups: &[&(PathBuf, Artifact)],
    interrupted: &HashSet<(&OsStr, &str)>,
    report: &mut SweepReport,
) {
    let paired: Vec<&PathBuf> = backups
        .iter()
        .filter(|(_, artifact)| {
            interrupted.contains(&(artifact.base.as_os_str(), artifact.id.as_str()))
        })
        .map(|(path, _)| path)
        .collect();

    let restore = match paired.as_slice() {
        [path] => Some(*path),
        [] => match fs.exists(live) {
            Ok(true) => None,
            Ok(false) if backups.len() == 1 => Some(&backups[0].0),
            Ok(false) => {
                warn!(
                    target = %live.display(),
                    count = backups.len(),
                    "several backups for a missing target, leaving them in place"
                );
                report.failed += backups.len();
                return;
            }
            Err(err) => {
                warn!(target = %live.display(), error = %err, "cannot stat target of orphaned backup");
                report.failed += backups.len();
                return;
            }
        },
        _ => {
            warn!(
                target = %live.display(),
                count = paired.len(),
                "several interrupted swaps for one target, leaving their backups in place"
            );
            report.failed += backups.len();
            return;
        }
    };

    if let Some(backup) = restore {
        if !restore_backup(fs, backup, live) {
            report.failed += backups.len();
            return;
        }
        report.restored += 1;
    }

    for (path, _) in backups.iter().filter(|(path, _)| Some(path) != restore) {
        if remove_best_effort(fs, path, "superseded backup") {
            report.removed += 1;
        } else {
            report.failed += 1;
        }
    }
}

/// Put `backup` back at `live`, discarding whatever is there now.
fn restore_backup<F: FileSystem>(fs: &F, backup: &Path, live: &Path) -> bool {
    if let Err(err) = fs.remove_tree(live) {
        warn!(target = %live.display(), error = %err, "cannot clear target before restoring backup");
        return false;
    }
    match fs.rename(backup, live) {
        Ok(()) => {
            info!(backup = %backup.display(), target = %live.display(), "restored backup");
            true
        }
        Err(err) => {
            warn!(backup = %backup.display(), error = %err, "failed to restore backup");
            false
        }
    }
}
