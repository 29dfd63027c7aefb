//! File system paths as they appear in `wnfs://` capability URIs.

use std::fmt;

/// A path inside a file system, split into segments.
///
/// Directories render with a trailing `/` unless they are the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FsPath {
    /// A directory.
    Directory(Vec<String>),
    /// A file.
    File(Vec<String>),
}

impl FsPath {
    /// The root directory.
    #[must_use]
    pub fn root() -> Self {
        Self::Directory(Vec::new())
    }

    /// A directory from its segments.
    pub fn directory<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Directory(segments.into_iter().map(Into::into).collect())
    }

    /// A file from its segments.
    pub fn file<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::File(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a POSIX path. A trailing `/` (or an empty path) denotes a
    /// directory; empty segments are dropped.
    #[must_use]
    pub fn from_posix(path: &str) -> Self {
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if path.is_empty() || path.ends_with('/') || segments.is_empty() {
            Self::Directory(segments)
        } else {
            Self::File(segments)
        }
    }

    /// The path segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        match self {
            Self::Directory(s) | Self::File(s) => s,
        }
    }

    /// Whether this is a directory.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Render as a POSIX path, with a leading `/` when `absolute`.
    #[must_use]
    pub fn to_posix(&self, absolute: bool) -> String {
        let segments = self.segments();
        let mut out = String::new();
        if absolute {
            out.push('/');
        }
        out.push_str(&segments.join("/"));
        if self.is_directory() && !segments.is_empty() {
            out.push('/');
        }
        out
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_posix(true))
    }
}
