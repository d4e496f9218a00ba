use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported content-type '{0}' for a directory deployment")]
    UnsupportedContentType(String),

    #[error("payload is not gzip-compressed")]
    NotGzip,

    #[error("tar entry '{}' resolves outside the staging root: '{}'", entry.display(), resolved.display())]
    PathTraversal { entry: PathBuf, resolved: PathBuf },

    #[error("tar entry has an unreadable path: {source}")]
    InvalidPath { source: io::Error },

    #[error("malformed archive: {source}")]
    Corrupted { source: io::Error },

    #[error("failed to read content stream: {source}")]
    Read { source: io::Error },

    #[error("failed to extract '{}': {source}", path.display())]
    ExtractionFailed { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Fs(#[from] sitedeploy_fs::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the failure is the client's fault (bad payload) rather than
    /// a problem writing the staging area.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedContentType(_)
                | Self::NotGzip
                | Self::PathTraversal { .. }
                | Self::InvalidPath { .. }
                | Self::Corrupted { .. }
        )
    }

    /// Short message that is safe to hand back to a client.
    pub fn public_message(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedContentType(_) => Some(
                "bad content-type: only 'application/x-tar' and 'application/x-tar+gzip' are allowed",
            ),
            Self::NotGzip => Some("payload is not gzip-compressed"),
            Self::PathTraversal { .. } => Some("archive entry escapes the target directory"),
            Self::InvalidPath { .. } => Some("archive entry has an invalid path"),
            Self::Corrupted { .. } => Some("malformed tar archive"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_have_public_messages() {
        let errors = [
            Error::UnsupportedContentType("text/plain".into()),
            Error::NotGzip,
            Error::PathTraversal {
                entry: "../../etc/passwd".into(),
                resolved: "/etc/passwd".into(),
            },
            Error::Corrupted {
                source: io::Error::from(io::ErrorKind::UnexpectedEof),
            },
        ];
        for err in errors {
            assert!(err.is_input_error(), "{err}");
            assert!(err.public_message().is_some(), "{err}");
        }
    }

    #[test]
    fn test_write_errors_are_not_input_errors() {
        let err = Error::ExtractionFailed {
            path: "/srv/site.x-tmp/index.html".into(),
            source: io::Error::from(io::ErrorKind::StorageFull),
        };
        assert!(!err.is_input_error());
        assert!(err.public_message().is_none());
        assert!(err.to_string().contains("index.html"));
    }
}
