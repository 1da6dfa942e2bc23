//! Repository-relative paths.
//!
//! A [`RepoPath`] is the normalized form of a request path: a list of
//! case-sensitive segments with no empty, `.` or `..` components. The root of
//! the tree is the empty path. A trailing slash in the raw input is kept as a
//! hint that the caller asked for a directory.

use std::fmt;

use crate::error::TypeError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoPath {
    segments: Vec<String>,
    trailing_slash: bool,
}

impl RepoPath {
    /// The root directory.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a raw `/`-delimited path.
    ///
    /// Leading slashes and repeated slashes are ignored.
    ///
    /// ```
    /// use relay_types::RepoPath;
    ///
    /// let p = RepoPath::parse("/docs/a.md").unwrap();
    /// assert_eq!(p.segments(), ["docs", "a.md"]);
    /// assert!(RepoPath::parse("/docs/../etc").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let mut segments = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" => continue,
                "." | ".." => {
                    return Err(TypeError::InvalidPath {
                        path: raw.to_string(),
                        reason: format!("segment {segment:?} is not allowed"),
                    })
                }
                s if s.contains('\0') => {
                    return Err(TypeError::InvalidPath {
                        path: raw.to_string(),
                        reason: "contains NUL byte".into(),
                    })
                }
                s => segments.push(s.to_string()),
            }
        }
        let trailing_slash = raw.ends_with('/') && !segments.is_empty();
        Ok(Self {
            segments,
            trailing_slash,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// `true` when the raw input ended with `/` (or is the root).
    pub fn wants_directory(&self) -> bool {
        self.trailing_slash || self.is_root()
    }

    /// The final segment, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Lowercased extension of the final segment.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// The containing directory, or `None` for the root.
    pub fn parent(&self) -> Option<RepoPath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
            trailing_slash: true,
        })
    }

    /// Append a single segment.
    pub fn join(&self, name: &str) -> RepoPath {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self {
            segments,
            trailing_slash: false,
        }
    }

    /// The same path, marked as a directory.
    pub fn as_directory(&self) -> RepoPath {
        Self {
            segments: self.segments.clone(),
            trailing_slash: !self.segments.is_empty(),
        }
    }

    /// Absolute URL-style form: `/` for the root, `/a/b` otherwise, with a
    /// trailing slash when the path denotes a directory.
    pub fn to_url_path(&self) -> String {
        if self.is_root() {
            return "/".into();
        }
        let mut s = format!("/{}", self.segments.join("/"));
        if self.trailing_slash {
            s.push('/');
        }
        s
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url_path())
    }
}
