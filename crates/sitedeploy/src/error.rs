use std::path::PathBuf;

/// Broad class of a [`DeployError`], driving status mapping and log severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidTarget,
    InvalidContent,
    PayloadTooLarge,
    Staging,
    Backup,
    Swap,
    Rollback,
    Lock,
    Sweep,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            Self::InvalidTarget | Self::InvalidContent => 400,
            Self::PayloadTooLarge => 413,
            Self::Staging
            | Self::Backup
            | Self::Swap
            | Self::Rollback
            | Self::Lock
            | Self::Sweep => 500,
        }
    }

    pub fn is_client_error(self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// Outcome of a failed deployment.
///
/// `Display` is the private diagnostic: it names every path involved so an
/// operator can finish a recovery by hand. Only [`DeployError::public_message`]
/// may be shown to the client.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid target '{}': {reason}", path.display())]
    InvalidTarget { path: PathBuf, reason: &'static str },

    #[error("invalid content for '{}' (staging '{}'): {source}", target.display(), staging.display())]
    InvalidContent {
        target: PathBuf,
        staging: PathBuf,
        #[source]
        source: sitedeploy_archive::Error,
    },

    #[error("payload for '{}' exceeds {limit} bytes", target.display())]
    PayloadTooLarge { target: PathBuf, limit: u64 },

    #[error("staging '{}' for '{}' failed: {source}", staging.display(), target.display())]
    StagingFailed {
        target: PathBuf,
        staging: PathBuf,
        #[source]
        source: sitedeploy_archive::Error,
    },

    #[error("backing up '{}' to '{}' failed: {source}", target.display(), backup.display())]
    BackupFailed {
        target: PathBuf,
        backup: PathBuf,
        #[source]
        source: sitedeploy_fs::Error,
    },

    #[error(
        "swapping '{}' into '{}' failed (backup '{}', rolled back: {rolled_back}): {source}",
        staging.display(),
        target.display(),
        backup.display()
    )]
    SwapFailed {
        target: PathBuf,
        staging: PathBuf,
        backup: PathBuf,
        rolled_back: bool,
        #[source]
        source: sitedeploy_fs::Error,
    },

    #[error(
        "rollback of '{}' failed, previous content left at '{}' (staging '{}'): {rollback_error}; swap error: {source}",
        target.display(),
        backup.display(),
        staging.display()
    )]
    RollbackFailed {
        target: PathBuf,
        staging: PathBuf,
        backup: PathBuf,
        rollback_error: sitedeploy_fs::Error,
        #[source]
        source: sitedeploy_fs::Error,
    },

    #[error("failed to acquire deployment lock: {source}")]
    LockFailed {
        #[source]
        source: sitedeploy_fs::Error,
    },

    #[error("failed to sweep '{}': {source}", dir.display())]
    SweepFailed {
        dir: PathBuf,
        #[source]
        source: sitedeploy_fs::Error,
    },
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTarget { .. } => ErrorKind::InvalidTarget,
            Self::InvalidContent { .. } => ErrorKind::InvalidContent,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::StagingFailed { .. } => ErrorKind::Staging,
            Self::BackupFailed { .. } => ErrorKind::Backup,
            Self::SwapFailed { .. } => ErrorKind::Swap,
            Self::RollbackFailed { .. } => ErrorKind::Rollback,
            Self::LockFailed { .. } => ErrorKind::Lock,
            Self::SweepFailed { .. } => ErrorKind::Sweep,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    pub fn is_client_error(&self) -> bool {
        self.kind().is_client_error()
    }

    /// Client-safe message. `None` for every server-class error, whose
    /// details stay in the logs.
    pub fn public_message(&self) -> Option<&'static str> {
        match self {
            Self::InvalidTarget { .. } => Some("invalid target path"),
            Self::InvalidContent { source, .. } => {
                Some(source.public_message().unwrap_or("invalid content"))
            }
            Self::PayloadTooLarge { .. } => Some("payload too large"),
            _ => None,
        }
    }
}

/// Failure to load a [`DeployerConfig`](crate::DeployerConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
