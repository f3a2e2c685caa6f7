//! Absolute path value type.
//!
//! Every path that crosses a process boundary is computed from an
//! `AbsolutePath`, so the result does not depend on which directory the
//! current process or the child process happens to run in.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A lexically normalized, absolute filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbsolutePath(PathBuf);

impl AbsolutePath {
    /// Resolve `path` against `base` if it is relative, then normalize.
    ///
    /// `base` is expected to be absolute already; it is normalized as well.
    pub fn resolve(base: &Path, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        };
        AbsolutePath(normalize(&joined))
    }

    /// Wrap a path that is already absolute.
    ///
    /// Returns `None` for relative input.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if path.is_absolute() {
            Some(AbsolutePath(normalize(path)))
        } else {
            None
        }
    }

    /// Append one or more segments. `..` segments are collapsed.
    pub fn join<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        let mut path = self.0.clone();
        for segment in segments {
            path.push(segment);
        }
        AbsolutePath(normalize(&path))
    }

    /// The parent directory, or `self` for a filesystem root.
    pub fn parent(&self) -> Self {
        match self.0.parent() {
            Some(parent) => AbsolutePath(parent.to_path_buf()),
            None => self.clone(),
        }
    }

    /// Express `self` relative to `base`.
    ///
    /// Two equal paths yield an empty `PathBuf`; use [`relative_display`]
    /// when a non-empty rendering is needed.
    ///
    /// [`relative_display`]: AbsolutePath::relative_display
    pub fn relative_to(&self, base: &AbsolutePath) -> PathBuf {
        pathdiff::diff_paths(&self.0, &base.0).unwrap_or_else(|| self.0.clone())
    }

    /// Like [`relative_to`](AbsolutePath::relative_to), rendered as a string
    /// with `.` standing in for an empty result.
    pub fn relative_display(&self, base: &AbsolutePath) -> String {
        let rel = self.relative_to(base);
        if rel.as_os_str().is_empty() {
            ".".to_string()
        } else {
            rel.to_string_lossy().into_owned()
        }
    }

    pub fn exists(&self) -> bool {
        self.0.exists()
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for AbsolutePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for AbsolutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Remove `.` components and fold `..` into the preceding component.
///
/// Purely lexical; symlinks are not consulted.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
