//! The request side of a Datastar handler.
//!
//! [`DatastarRequest`] captures what the protocol engine needs from an
//! incoming request (method, raw query and the body as a streaming reader)
//! and implements [`SignalSource`] over it. A [`DatastarConfig`] installed
//! as a request extension (for example with `axum::Extension`) is picked up
//! automatically.
//!
//! A [`CancellationToken`] installed the same way bounds every signals read
//! made for the request and is the parent of the session token that
//! [`DatastarStream`](crate::DatastarStream) creates. Hosts that track
//! client disconnects or shutdown install one; without it each request
//! gets a fresh token.

use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::Method;
use datastar_core::{DatastarConfig, SignalSource};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

/// Streaming reader over a request body.
pub type BodyReader = StreamReader<BoxStream<'static, std::io::Result<Bytes>>, Bytes>;

/// An incoming request, ready to feed a session.
pub struct DatastarRequest {
    method: Method,
    query: Option<String>,
    body: Option<BodyReader>,
    config: DatastarConfig,
    cancel: CancellationToken,
}

impl DatastarRequest {
    /// Capture `request`. The body is not read until signals are.
    pub fn new(request: Request) -> Self {
        let (parts, body) = request.into_parts();
        let config = parts
            .extensions
            .get::<DatastarConfig>()
            .cloned()
            .unwrap_or_default();
        let cancel = parts
            .extensions
            .get::<CancellationToken>()
            .cloned()
            .unwrap_or_default();
        let stream = body
            .into_data_stream()
            .map_err(std::io::Error::other)
            .boxed();

        Self {
            query: parts.uri.query().map(str::to_owned),
            method: parts.method,
            body: Some(StreamReader::new(stream)),
            config,
            cancel,
        }
    }

    /// Configuration in effect for this request.
    pub const fn config(&self) -> &DatastarConfig {
        &self.config
    }

    /// Token cancelled when the host abandons this request.
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the body is still unread.
    pub const fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

impl std::fmt::Debug for DatastarRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatastarRequest")
            .field("method", &self.method)
            .field("query", &self.query)
            .field("body_unread", &self.body.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl SignalSource for DatastarRequest {
    type Body = BodyReader;

    fn method(&self) -> &Method {
        &self.method
    }

    fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    fn take_body(&mut self) -> Option<Self::Body> {
        self.body.take()
    }
}

impl<S: Send + Sync> FromRequest<S> for DatastarRequest {
    type Rejection = Infallible;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::new(req))
    }
}
