//! Path keys addressing elements within a tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered list of segment names identifying one element.
///
/// The empty path is the root, which exists in every generation and
/// carries no data of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    /// The empty path.
    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    /// Builds a path from its segments in order.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a `/`-separated path. Empty segments are skipped, so
    /// `"/a/b"`, `"a/b"` and `"a//b/"` all denote the same path.
    pub fn parse(s: &str) -> Self {
        Self::new(s.split('/').filter(|seg| !seg.is_empty()))
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments; zero for the root.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final segment, or `None` for the root.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The path with the final segment removed, or `None` for the root.
    pub fn parent(&self) -> Option<TreePath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// This path extended by one segment.
    pub fn child(&self, name: impl Into<String>) -> TreePath {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    pub fn starts_with(&self, prefix: &TreePath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.segments {
            write!(f, "/{seg}")?;
        }
        Ok(())
    }
}

impl From<&str> for TreePath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}
