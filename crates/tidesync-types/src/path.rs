//! Domain-tagged path values
//!
//! A [`SyncPath`] identifies a location in exactly one storage domain. It is a
//! descriptor, not a live handle: building one performs no I/O, equality is
//! structural, and the string form is always reconstructible from the domain
//! tag and the segment sequence. Existence and kind probes live on the
//! [`crate::StorageDomain`] trait.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which storage domain a path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainTag {
    /// The local filesystem
    Local,
    /// The remote object-and-collection store
    Remote,
}

impl fmt::Display for DomainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Resolution context a domain supplies for expanding `~` and `.`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainContext {
    /// Segments of the domain's home location, empty when the domain has none
    pub home: Vec<String>,
    /// Segments of the domain's current working location
    pub cwd: Vec<String>,
}

impl DomainContext {
    /// Build a context from `/`-separated home and working locations
    pub fn new(home: &str, cwd: &str) -> Self {
        Self {
            home: split_segments(home),
            cwd: split_segments(cwd),
        }
    }
}

fn split_segments(raw: &str) -> Vec<String> {
    raw.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// An absolute, domain-tagged location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncPath {
    domain: DomainTag,
    segments: Vec<String>,
}

impl SyncPath {
    /// Build a path from already-absolute segments
    pub fn new<I, S>(domain: DomainTag, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domain,
            segments: segments
                .into_iter()
                .flat_map(|s| split_segments(s.as_ref()))
                .collect(),
        }
    }

    /// Resolve raw segments against a domain context.
    ///
    /// A leading `~` expands to the domain home, a leading `.` to the current
    /// working location; input starting with a separator is taken as absolute;
    /// anything else is relative to the working location. `..` components are
    /// collapsed. Empty input falls back to the home location and fails with an
    /// invalid-path error when the domain has none.
    pub fn resolve<I, S>(domain: DomainTag, ctx: &DomainContext, segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut raw: Vec<String> = Vec::new();
        let mut absolute = false;
        for (i, segment) in segments.into_iter().enumerate() {
            let segment = segment.as_ref();
            if i == 0 && segment.starts_with('/') {
                absolute = true;
            }
            raw.extend(split_segments(segment));
        }

        let base: Vec<String> = if raw.is_empty() {
            if ctx.home.is_empty() {
                return Err(Error::invalid_path(
                    "empty path and the domain has no home location",
                ));
            }
            ctx.home.clone()
        } else if raw[0] == "~" {
            if ctx.home.is_empty() {
                return Err(Error::invalid_path(
                    "cannot expand '~': domain has no home location",
                ));
            }
            ctx.home.iter().cloned().chain(raw.drain(..).skip(1)).collect()
        } else if raw[0] == "." {
            ctx.cwd.iter().cloned().chain(raw.drain(..).skip(1)).collect()
        } else if absolute {
            raw
        } else {
            ctx.cwd.iter().cloned().chain(raw.drain(..)).collect()
        };

        let mut resolved: Vec<String> = Vec::with_capacity(base.len());
        for part in base {
            if part == ".." {
                if resolved.pop().is_none() {
                    return Err(Error::invalid_path("too many '..' components"));
                }
            } else if part != "." {
                resolved.push(part);
            }
        }

        Ok(Self {
            domain,
            segments: resolved,
        })
    }

    /// The domain this path belongs to
    pub fn domain(&self) -> DomainTag {
        self.domain
    }

    /// The ordered path segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this is the domain root
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The final segment, or an empty string for the root
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Append segments without any I/O or resolution. Never fails.
    pub fn join<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut joined = self.segments.clone();
        for segment in segments {
            joined.extend(split_segments(segment.as_ref()));
        }
        Self {
            domain: self.domain,
            segments: joined,
        }
    }

    /// Append a relative path discovered by a tree walk
    pub fn join_rel(&self, rel: &RelPath) -> Self {
        self.join(rel.segments())
    }

    /// The containing location; the root is its own parent
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self {
            domain: self.domain,
            segments,
        }
    }

    /// Segments of `self` relative to a strict ancestor.
    ///
    /// Fails unless `ancestor` is in the same domain and its segments are a
    /// proper prefix of this path's segments.
    pub fn relative_to(&self, ancestor: &SyncPath) -> Result<RelPath> {
        let not_ancestor = || Error::NotAnAncestor {
            path: self.to_string(),
            ancestor: ancestor.to_string(),
        };
        if self.domain != ancestor.domain
            || ancestor.segments.len() >= self.segments.len()
            || !self.segments.starts_with(&ancestor.segments)
        {
            return Err(not_ancestor());
        }
        Ok(RelPath::new(
            self.segments[ancestor.segments.len()..].to_vec(),
        ))
    }
}

impl fmt::Display for SyncPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

/// A path relative to a walk root.
///
/// Orders by depth first, then lexicographically by segment, so sorting a set
/// of relative paths always puts a container before everything inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelPath {
    segments: Vec<String>,
}

impl RelPath {
    /// Build from owned segments
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Build from a `/`-separated string
    pub fn from_str_path(raw: &str) -> Self {
        Self {
            segments: split_segments(raw),
        }
    }

    /// The ordered segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments, i.e. the depth below the walk root
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The final segment, or an empty string when there are none
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// A child path one segment deeper
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_owned());
        Self { segments }
    }
}

impl Ord for RelPath {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.depth()
            .cmp(&other.depth())
            .then_with(|| self.segments.cmp(&other.segments))
    }
}

impl PartialOrd for RelPath {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}
