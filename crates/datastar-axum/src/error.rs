//! Error types for the axum adapter.
//!
//! [`DatastarRejection`] covers everything that can go wrong before a
//! stream is committed and converts into an axum response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Once the
//! stream is open, failures can only be logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use datastar_core::{SessionError, SignalsError};

/// Errors surfaced to the client as an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum DatastarRejection {
    /// Reading or binding signals failed.
    #[error(transparent)]
    Signals(#[from] SignalsError),

    /// The session failed before its stream was committed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The session task did not run to completion.
    #[error("session task failed: {0}")]
    Task(String),
}

impl DatastarRejection {
    /// Status code this rejection maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Signals(err) | Self::Session(SessionError::Signals(err))
                if err.is_client_error() =>
            {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DatastarRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
