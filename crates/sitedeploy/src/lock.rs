//! The deployment lock.
//!
//! Every transaction in the process runs under one global mutex, held from
//! staging through commit or rollback. A configured lock file extends the
//! same serialisation to other processes sharing the deployment root.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use sitedeploy_fs::LockFile;
use tracing::debug;

use crate::error::DeployError;

static DEPLOY_LOCK: Mutex<()> = Mutex::new(());

/// Held for the whole lifetime of one transaction.
#[must_use]
pub(crate) struct DeployGuard {
    // Dropped first: the file lock goes before the in-process lock.
    _file: Option<LockFile>,
    _guard: MutexGuard<'static, ()>,
}

pub(crate) fn acquire(lock_file: Option<&Path>) -> Result<DeployGuard, DeployError> {
    // A panic in an earlier transaction leaves nothing behind that the lock
    // protects; the filesystem is the state.
    let guard = DEPLOY_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

    let file = match lock_file {
        Some(path) => {
            let file =
                LockFile::acquire(path).map_err(|source| DeployError::LockFailed { source })?;
            debug!(path = %path.display(), "acquired deployment lock file");
            Some(file)
        }
        None => None,
    };

    Ok(DeployGuard {
        _file: file,
        _guard: guard,
    })
}
