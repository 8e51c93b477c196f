//! Error types for the protocol engine.
//!
//! Reading signals and writing patches fail in different ways and are
//! reported through separate enums. [`SignalsError`] outcomes go back to the
//! immediate caller and leave the session usable. [`SessionError::Transport`]
//! and [`SessionError::Cancelled`] close the session: nothing further is
//! written to the stream.

use datastar_types::PatchError;

use crate::path::{PathError, ResolveError};

/// Errors from reading client signals.
#[derive(Debug, thiserror::Error)]
pub enum SignalsError {
    /// The request carried no signals at all.
    #[error("no signals were supplied with the request")]
    Missing,

    /// The signals text is not valid JSON.
    #[error("malformed signals: {source}")]
    Malformed {
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// The whole signals document does not convert to the requested type.
    #[error("signals document has the wrong shape: {source}")]
    Coercion {
        /// The underlying deserialization error.
        source: serde_json::Error,
    },

    /// Path lookup or type conversion failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The caller supplied an invalid path expression.
    #[error("invalid signal path: {0}")]
    InvalidPath(#[from] PathError),

    /// The request body was already consumed by an earlier read.
    #[error("request body already consumed; signals can be read from a body only once")]
    BodyConsumed,

    /// The request body exceeds the configured limit.
    #[error("signals body exceeds {limit} bytes")]
    TooLarge {
        /// The configured maximum.
        limit: usize,
    },

    /// The request body is not UTF-8.
    #[error("signals body is not UTF-8: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),

    /// Reading the request body failed.
    #[error("failed to read signals body: {0}")]
    Io(#[from] std::io::Error),

    /// The read was cancelled before the body was complete.
    #[error("signals read cancelled")]
    Cancelled,
}

impl SignalsError {
    /// Whether the error stems from bad client input rather than a server
    /// or transport fault.
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Missing
                | Self::Malformed { .. }
                | Self::Coercion { .. }
                | Self::Resolve(_)
                | Self::TooLarge { .. }
                | Self::NotUtf8(_)
        )
    }
}

/// Errors from opening the stream or emitting patches.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Writing or flushing the stream failed. The session is closed.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The cancellation signal fired. The session is closed.
    #[error("session cancelled")]
    Cancelled,

    /// `start` was called on a stream that is already open.
    #[error("event stream already started")]
    AlreadyStarted,

    /// The session was closed by an earlier failure or cancellation.
    #[error("event stream closed")]
    Closed,

    /// The host could not commit the response head.
    #[error("failed to open event stream: {0}")]
    Open(String),

    /// The patch could not be built.
    #[error("invalid patch: {0}")]
    InvalidPatch(#[from] PatchError),

    /// A typed signals value could not be serialized.
    #[error("failed to serialize signals: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Reading signals failed inside a session handler.
    #[error(transparent)]
    Signals(#[from] SignalsError),
}
