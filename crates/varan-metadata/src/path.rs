//! Dot-delimited metadata paths
//!
//! Provides [`MetaPath`] for addressing values inside a metadata bucket.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Conventional sub-map holding per-member facts.
pub const PROPERTIES: &str = "properties";

/// Conventional sub-map holding per-method facts.
pub const METHODS: &str = "methods";

/// Conventional sub-map holding human-readable descriptions.
pub const DESCRIPTION: &str = "description";

/// Path within a metadata bucket
///
/// Hierarchical structure using string segments joined by `.`.
///
/// # Examples
/// - `["properties", "name", "type"]` → `properties.name.type`
/// - `["methods", "save", "parameters"]` → `methods.save.parameters`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetaPath(Vec<String>);

impl MetaPath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Create path from a single segment
    #[inline]
    #[must_use]
    pub fn single(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// Empty path (bucket root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// `properties.<member>`
    #[inline]
    #[must_use]
    pub fn property(member: impl Into<String>) -> Self {
        Self(vec![PROPERTIES.to_string(), member.into()])
    }

    /// `methods.<method>`
    #[inline]
    #[must_use]
    pub fn method(method: impl Into<String>) -> Self {
        Self(vec![METHODS.to_string(), method.into()])
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Get first segment (if not root)
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Member name when the path addresses something under `properties.<member>`
    #[must_use]
    pub fn property_name(&self) -> Option<&str> {
        match self.0.as_slice() {
            [head, member, ..] if head == PROPERTIES => Some(member.as_str()),
            _ => None,
        }
    }

    /// True when this path is `properties` itself or lies beneath it
    #[inline]
    #[must_use]
    pub fn touches_properties(&self) -> bool {
        self.first() == Some(PROPERTIES)
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Display for MetaPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for MetaPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<String> = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment(s.to_string()))
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl From<Vec<String>> for MetaPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl Default for MetaPath {
    fn default() -> Self {
        Self::root()
    }
}

/// Errors related to metadata paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),
}
