//! Dotted-path resolution over parsed JSON.
//!
//! A [`SignalPath`] is a non-empty sequence of object keys produced by
//! splitting a string such as `"user.profile.name"` on `.`. Resolution walks
//! the keys left to right with object lookups only: numeric segments are
//! literal keys, never array indices, and any non-object node on the way
//! (including `null`) ends the walk with "not found".

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Reasons a string is not a valid [`SignalPath`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path string was empty.
    #[error("signal path is empty")]
    Empty,

    /// A segment between dots was empty (e.g. `a..b` or `.a`).
    #[error("signal path `{path}` has an empty segment at position {position}")]
    EmptySegment {
        /// The full path as given.
        path: String,
        /// Zero-based index of the empty segment.
        position: usize,
    },
}

/// Outcome of a failed typed lookup.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No node exists at `path`. Recoverable: the caller may substitute a
    /// default.
    #[error("no signal at `{path}`")]
    NotFound {
        /// The path that was looked up.
        path: SignalPath,
    },

    /// A node exists at `path` but does not convert to the requested type.
    /// Never treated as absence.
    #[error("signal at `{path}` has the wrong shape: {source}")]
    Coercion {
        /// The path that was looked up.
        path: SignalPath,
        /// The underlying deserialization error.
        source: serde_json::Error,
    },
}

/// A validated dot-separated key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalPath {
    segments: Vec<String>,
}

impl SignalPath {
    /// Parse a dot-separated path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Empty`] for `""` and [`PathError::EmptySegment`]
    /// when any segment between dots is empty.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }

        let segments = path
            .split('.')
            .enumerate()
            .map(|(position, segment)| {
                if segment.is_empty() {
                    Err(PathError::EmptySegment {
                        path: path.to_owned(),
                        position,
                    })
                } else {
                    Ok(segment.to_owned())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }

    /// The key segments in lookup order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// Number of segments (always at least one).
    pub const fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; kept for API symmetry with [`len`](Self::len).
    pub const fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromStr for SignalPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SignalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Find the node at `path` under `root`.
///
/// Returns `None` when any segment is missing or any intermediate node is
/// not an object.
pub fn resolve<'a>(root: &'a Value, path: &SignalPath) -> Option<&'a Value> {
    path.segments()
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

/// Find the node at a dotted path given as a string.
///
/// An empty or malformed path resolves to `None`, like a missing key.
pub fn resolve_str<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let path = SignalPath::parse(path).ok()?;
    resolve(root, &path)
}

/// Find the node at `path` and deserialize it into `T`.
///
/// # Errors
///
/// Returns [`ResolveError::NotFound`] when nothing is at `path`, and
/// [`ResolveError::Coercion`] when the node does not deserialize into `T`.
pub fn resolve_typed<T>(root: &Value, path: &SignalPath) -> Result<T, ResolveError>
where
    T: DeserializeOwned,
{
    let node =
        resolve(root, path).ok_or_else(|| ResolveError::NotFound { path: path.clone() })?;
    T::deserialize(node).map_err(|source| ResolveError::Coercion {
        path: path.clone(),
        source,
    })
}
