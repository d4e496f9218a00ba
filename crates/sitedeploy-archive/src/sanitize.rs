use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Result of sanitizing an archive entry path.
#[derive(Clone, Debug)]
pub struct SanitizedPath {
    pub original: PathBuf,
    pub resolved: PathBuf,
}

impl SanitizedPath {
    /// The entry names the staging root itself (`./`, `a/..`).
    pub fn is_root(&self, base: &Path) -> bool {
        self.resolved == normalize_path(base)
    }
}

/// Join an entry name onto `base`, resolve `.` and `..` lexically, and make
/// sure the result is still inside `base`.
///
/// A leading root in the entry name is dropped, so `/etc/passwd` lands at
/// `<base>/etc/passwd`. Containment is checked component-wise on the
/// normalized absolute path, never on the raw joined string, so
/// `<base>-evil` does not count as inside `<base>`.
pub fn sanitize_path(entry_path: impl AsRef<Path>, base: impl AsRef<Path>) -> Result<SanitizedPath> {
    let entry_path = entry_path.as_ref();
    let base = normalize_path(base.as_ref());

    let mut resolved = base.clone();
    for component in entry_path.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::ParentDir => {
                resolved.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if !resolved.starts_with(&base) {
        return Err(Error::PathTraversal {
            entry: entry_path.to_path_buf(),
            resolved,
        });
    }

    Ok(SanitizedPath {
        original: entry_path.to_path_buf(),
        resolved,
    })
}

/// Lexically resolve `.` and `..`; `..` at the root stays at the root.
fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(part) => result.push(part),
            Component::RootDir => result.push(Component::RootDir.as_os_str()),
            Component::Prefix(prefix) => result.push(prefix.as_os_str()),
            Component::CurDir => {}
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> &'static Path {
        if cfg!(windows) {
            Path::new("C:/srv/site.abc-tmp")
        } else {
            Path::new("/srv/site.abc-tmp")
        }
    }

    #[test]
    fn test_nested_entry_stays_inside() {
        let result = sanitize_path("a/b/c.txt", base()).unwrap();
        assert_eq!(result.resolved, base().join("a/b/c.txt"));
        assert_eq!(result.original, Path::new("a/b/c.txt"));
        assert!(!result.is_root(base()));
    }

    #[test]
    fn test_dot_segments_are_resolved() {
        let result = sanitize_path("./a/./b/../c.txt", base()).unwrap();
        assert_eq!(result.resolved, base().join("a/c.txt"));
    }

    #[test]
    fn test_parent_traversal_rejected() {
        let result = sanitize_path("../../etc/passwd", base());
        assert!(matches!(result, Err(Error::PathTraversal { .. })));
    }

    #[test]
    fn test_traversal_after_descent_rejected() {
        let result = sanitize_path("a/../../escape.txt", base());
        assert!(matches!(result, Err(Error::PathTraversal { .. })));
    }

    #[test]
    fn test_sibling_with_shared_prefix_rejected() {
        let result = sanitize_path("../site.abc-tmp-evil/x", base());
        assert!(matches!(result, Err(Error::PathTraversal { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_entry_is_joined_under_base() {
        let result = sanitize_path("/etc/passwd", base()).unwrap();
        assert_eq!(result.resolved, base().join("etc/passwd"));
    }

    #[test]
    fn test_current_dir_entry_is_root() {
        let result = sanitize_path("./", base()).unwrap();
        assert!(result.is_root(base()));
    }

    #[test]
    fn test_trailing_separator_on_base_is_ignored() {
        let mut raw = base().as_os_str().to_owned();
        raw.push("/");
        let result = sanitize_path("index.html", Path::new(&raw)).unwrap();
        assert_eq!(result.resolved, base().join("index.html"));
    }

    #[test]
    fn test_path_normalization() {
        let result = normalize_path(Path::new("/foo//bar/./baz/../qux"));
        assert_eq!(result, Path::new("/foo/bar/qux"));
    }
}
