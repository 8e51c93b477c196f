//! Streaming responses driven by a session.
//!
//! [`DatastarStream::run`] hands the caller's handler a [`DatastarSession`]
//! on a spawned task and returns an axum [`Response`] as soon as the
//! session commits its head. The session writes frames into one end of an
//! in-memory pipe; the response body drains the other.
//!
//! When the client goes away the response body is dropped, which cancels
//! the session's token. In-flight writes and body reads then return
//! `Cancelled`. The session token is a child of the request's token, so
//! cancelling the request also ends the session.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use datastar_core::{DatastarConfig, PipeTransport, Session, SessionError, StreamHead};
use futures::Stream;
use tokio::io::DuplexStream;
use tokio_util::io::ReaderStream;
use tokio_util::sync::DropGuard;
use tracing::{debug, warn};

use crate::error::DatastarRejection;
use crate::request::DatastarRequest;

/// Session type handed to [`DatastarStream::run`] handlers.
pub type DatastarSession = Session<PipeTransport<DuplexStream>, DatastarRequest>;

/// Builder for an event-stream response.
#[derive(Debug)]
pub struct DatastarStream {
    request: DatastarRequest,
    config: DatastarConfig,
}

impl DatastarStream {
    /// Stream for `request`, using the configuration it carries.
    pub fn new(request: DatastarRequest) -> Self {
        let config = request.config().clone();
        Self { request, config }
    }

    /// Override the configuration.
    #[must_use]
    pub fn with_config(mut self, config: DatastarConfig) -> Self {
        self.config = config;
        self
    }

    /// Run `handler` with a fresh session and return the response.
    ///
    /// The stream ends when the handler returns and drops its session. If
    /// the handler fails before anything was emitted, the error becomes the
    /// response instead; later failures are logged.
    pub async fn run<F, Fut>(self, handler: F) -> Response
    where
        F: FnOnce(DatastarSession) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), SessionError>> + Send + 'static,
    {
        let (writer, reader) = tokio::io::duplex(self.config.stream_buffer_bytes.max(1));
        let (transport, head_rx) = PipeTransport::new(writer);
        let cancel = self.request.cancellation_token().child_token();
        let session = Session::with_config(transport, self.request, cancel.clone(), &self.config);

        let task = tokio::spawn(async move {
            let result = handler(session).await;
            if let Err(err) = &result {
                warn!(error = %err, "datastar handler failed");
            }
            result
        });

        let head = match head_rx.await {
            Ok(head) => head,
            Err(_dropped) => match task.await {
                Ok(Ok(())) => {
                    debug!("handler finished without emitting; sending an empty stream");
                    StreamHead::default()
                }
                Ok(Err(err)) => return DatastarRejection::from(err).into_response(),
                Err(err) => return DatastarRejection::Task(err.to_string()).into_response(),
            },
        };

        let body = CancelOnDrop {
            inner: ReaderStream::new(reader),
            _guard: cancel.drop_guard(),
        };
        let mut response = Body::from_stream(body).into_response();
        *response.status_mut() = head.status;
        *response.headers_mut() = head.headers;
        response
    }
}

/// Body stream that cancels the session once the host drops it.
struct CancelOnDrop<S> {
    inner: S,
    _guard: DropGuard,
}

impl<S: Stream + Unpin> Stream for CancelOnDrop<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
