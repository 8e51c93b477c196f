//! The response side of the host transport.
//!
//! A session commits exactly one [`StreamHead`] and receives the writer it
//! streams frames into. [`PipeTransport`] is the stock implementation: the
//! writer is known up front and the head is handed to the host through a
//! oneshot channel, so the host can build its response once the session
//! decides on headers.

use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tokio::io::AsyncWrite;
use tokio::sync::oneshot;
use tracing::warn;

use datastar_types::consts::headers::{
    CACHE_CONTROL_NO_CACHE, CONTENT_TYPE_EVENT_STREAM, X_ACCEL_BUFFERING, X_ACCEL_BUFFERING_NO,
};

use crate::error::SessionError;

/// Status and headers of the stream-open response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHead {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
}

impl Default for StreamHead {
    fn default() -> Self {
        Self::new(&HeaderMap::new())
    }
}

impl StreamHead {
    /// Build the head from caller headers plus the protocol headers.
    ///
    /// Protocol headers are written last and always win. A caller header
    /// that collides with one is dropped with a warning.
    pub fn new(extra: &HeaderMap) -> Self {
        let protocol = protocol_headers();
        let mut headers = HeaderMap::with_capacity(extra.len().saturating_add(protocol.len()));

        for (name, value) in extra {
            if protocol.contains_key(name) {
                warn!(header = %name, "caller header overrides a protocol header; ignoring it");
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
        headers.extend(protocol);

        Self {
            status: StatusCode::OK,
            headers,
        }
    }
}

fn protocol_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(CONTENT_TYPE_EVENT_STREAM),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_NO_CACHE));
    headers.insert(
        HeaderName::from_static(X_ACCEL_BUFFERING),
        HeaderValue::from_static(X_ACCEL_BUFFERING_NO),
    );
    headers
}

/// Commits the response head and yields the stream writer.
pub trait StreamTransport {
    /// Writer receiving encoded frames.
    type Writer: AsyncWrite + Unpin + Send;

    /// Commit `head` and hand over the writer. Called at most once.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Open`] when the host can no longer accept a
    /// response (e.g. the request was abandoned).
    fn open(self, head: StreamHead) -> Result<Self::Writer, SessionError>;
}

/// Transport over a pre-built writer that reports the head through a
/// oneshot channel.
#[derive(Debug)]
pub struct PipeTransport<W> {
    writer: W,
    head_tx: oneshot::Sender<StreamHead>,
}

impl<W> PipeTransport<W> {
    /// Wrap `writer`. The receiver yields the head once the session opens;
    /// it errors if the session is dropped without opening.
    pub fn new(writer: W) -> (Self, oneshot::Receiver<StreamHead>) {
        let (head_tx, head_rx) = oneshot::channel();
        (Self { writer, head_tx }, head_rx)
    }
}

impl<W: AsyncWrite + Unpin + Send> StreamTransport for PipeTransport<W> {
    type Writer = W;

    fn open(self, head: StreamHead) -> Result<W, SessionError> {
        self.head_tx
            .send(head)
            .map_err(|_head| SessionError::Open(String::from("response receiver dropped")))?;
        Ok(self.writer)
    }
}
