//! Target paths and the staging/backup artifacts derived from them.
//!
//! Artifacts are siblings of the target so that every rename stays on one
//! filesystem:
//!
//! ```text
//! <target>.<id>-tmp       staging
//! <target>.<id>-backup    backup
//! ```
//!
//! A directory target keeps its trailing `/` on both artifact names.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::error::DeployError;

const ID_BYTES: usize = 8;
const ID_LEN: usize = 11;
const STAGING_SUFFIX: &str = "-tmp";
const BACKUP_SUFFIX: &str = "-backup";

/// The live path a deployment replaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    path: PathBuf,
    is_dir: bool,
}

impl Target {
    /// Parse a target as handed over by the HTTP layer: a trailing
    /// separator marks a directory deployment.
    pub fn parse(raw: &str) -> Result<Self, DeployError> {
        let is_dir = raw.ends_with(std::path::is_separator);
        Self::new(PathBuf::from(raw), is_dir)
    }

    pub fn file(path: impl Into<PathBuf>) -> Result<Self, DeployError> {
        Self::new(path.into(), false)
    }

    pub fn directory(path: impl Into<PathBuf>) -> Result<Self, DeployError> {
        Self::new(path.into(), true)
    }

    fn new(raw: PathBuf, is_dir: bool) -> Result<Self, DeployError> {
        let invalid = |reason| DeployError::InvalidTarget {
            path: raw.clone(),
            reason,
        };

        if !raw.is_absolute() {
            return Err(invalid("target must be an absolute path"));
        }
        if raw
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
        {
            return Err(invalid("target must not contain relative segments"));
        }
        // `components()` drops trailing separators and repeated slashes.
        let path: PathBuf = raw.components().collect();
        if path.parent().is_none() || path.file_name().is_none() {
            return Err(invalid("target must not be the filesystem root"));
        }

        Ok(Self { path, is_dir })
    }

    /// The target without any trailing separator.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parent(&self) -> &Path {
        // Checked in `new`.
        self.path.parent().unwrap_or(Path::new("/"))
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn staging_path(&self, id: &TransactionId) -> PathBuf {
        self.artifact_path(id, STAGING_SUFFIX)
    }

    pub fn backup_path(&self, id: &TransactionId) -> PathBuf {
        self.artifact_path(id, BACKUP_SUFFIX)
    }

    fn artifact_path(&self, id: &TransactionId, suffix: &str) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".");
        name.push(id.as_str());
        name.push(suffix);
        if self.is_dir {
            name.push(std::path::MAIN_SEPARATOR_STR);
        }
        PathBuf::from(name)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if self.is_dir {
            f.write_str(std::path::MAIN_SEPARATOR_STR)?;
        }
        Ok(())
    }
}

/// Per-transaction random identifier: 8 random bytes, URL-safe base64
/// without padding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    /// # Panics
    ///
    /// Panics if the operating system's randomness source fails, which does
    /// not happen on a healthy host.
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        if let Err(err) = getrandom::fill(&mut bytes) {
            panic!("system randomness source failed: {err}");
        }
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Accept only strings `generate` could have produced.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != ID_LEN {
            return None;
        }
        match URL_SAFE_NO_PAD.decode(raw) {
            Ok(bytes) if bytes.len() == ID_BYTES => Some(Self(raw.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    Staging,
    Backup,
}

/// A staging or backup leftover recognised by its file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub base: OsString,
    pub id: TransactionId,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn parse(file_name: &OsStr) -> Option<Self> {
        let name = file_name.to_str()?;
        let (rest, kind) = if let Some(rest) = name.strip_suffix(STAGING_SUFFIX) {
            (rest, ArtifactKind::Staging)
        } else if let Some(rest) = name.strip_suffix(BACKUP_SUFFIX) {
            (rest, ArtifactKind::Backup)
        } else {
            return None;
        };

        let (base, id) = rest.rsplit_once('.')?;
        if base.is_empty() {
            return None;
        }
        Some(Self {
            base: OsString::from(base),
            id: TransactionId::parse(id)?,
            kind,
        })
    }
}
