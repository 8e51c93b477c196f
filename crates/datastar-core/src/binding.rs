//! Binding handler parameters to signals.
//!
//! The caller states up front how a value is bound:
//!
//! - [`SignalBinding::ScalarByName`] -- a scalar or string looked up by its
//!   parameter name, or by an explicit path. A missing value collapses to
//!   the type's default; a value of the wrong shape is an error.
//! - [`SignalBinding::StructuredByPath`] -- a composite value. Without a
//!   path the whole signals document is deserialized; with a path the node
//!   at that path is, and a missing node is an error.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SignalsError;
use crate::path::{self, PathError, ResolveError, SignalPath};

/// How a value is bound from the signals document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalBinding {
    /// Scalar or string, keyed by name unless a path is given.
    ScalarByName {
        /// Parameter name, used as the (possibly dotted) key.
        name: String,
        /// Explicit path taking precedence over `name`.
        path: Option<SignalPath>,
    },
    /// Composite value, whole document unless a path is given.
    StructuredByPath {
        /// Location of the value inside the document.
        path: Option<SignalPath>,
    },
}

impl SignalBinding {
    /// Bind a scalar by parameter name.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::ScalarByName {
            name: name.into(),
            path: None,
        }
    }

    /// Bind a composite value from the whole document.
    pub const fn structured() -> Self {
        Self::StructuredByPath { path: None }
    }

    /// Bind a composite value from the dotted `path`. An empty path means
    /// the whole document.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] when `path` is non-empty and malformed.
    pub fn structured_path(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Ok(Self::structured());
        }
        Ok(Self::structured().at(SignalPath::parse(path)?))
    }

    /// Use `path` instead of the default location.
    #[must_use]
    pub fn at(self, path: SignalPath) -> Self {
        match self {
            Self::ScalarByName { name, .. } => Self::ScalarByName {
                name,
                path: Some(path),
            },
            Self::StructuredByPath { .. } => Self::StructuredByPath { path: Some(path) },
        }
    }

    /// Bind from `doc`.
    ///
    /// Returns `Ok(None)` only for a scalar binding whose value is absent;
    /// the caller substitutes the type's default. Structured bindings never
    /// return `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalsError::InvalidPath`] when a scalar name is not a
    /// valid path, [`ResolveError::Coercion`] or [`SignalsError::Coercion`]
    /// when the value has the wrong shape, and [`ResolveError::NotFound`]
    /// when a structured path is missing.
    pub fn bind<T: DeserializeOwned>(&self, doc: &Value) -> Result<Option<T>, SignalsError> {
        match self {
            Self::ScalarByName { name, path } => {
                let lookup = match path {
                    Some(path) => path.clone(),
                    None => SignalPath::parse(name)?,
                };
                match path::resolve_typed(doc, &lookup) {
                    Ok(value) => Ok(Some(value)),
                    Err(ResolveError::NotFound { .. }) => Ok(None),
                    Err(err) => Err(err.into()),
                }
            }
            Self::StructuredByPath { path: Some(path) } => {
                Ok(Some(path::resolve_typed(doc, path)?))
            }
            Self::StructuredByPath { path: None } => T::deserialize(doc)
                .map(Some)
                .map_err(|source| SignalsError::Coercion { source }),
        }
    }

    /// Bind from `doc`, substituting `T::default()` for an absent scalar.
    ///
    /// # Errors
    ///
    /// Same as [`bind`](Self::bind).
    pub fn bind_or_default<T>(&self, doc: &Value) -> Result<T, SignalsError>
    where
        T: DeserializeOwned + Default,
    {
        self.bind(doc).map(Option::unwrap_or_default)
    }
}
