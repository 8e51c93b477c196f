//! The protocol session: one outbound event stream per request.
//!
//! A [`Session`] owns the transport for a single request/response cycle and
//! is driven by exactly one task. Every emit encodes a complete frame in
//! memory, writes it with one `write_all`, and flushes before returning, so
//! bytes reach the wire in call order and frames never interleave.
//!
//! The stream moves through three states:
//!
//! ```text
//! Pending --start / first emit--> Open --write failure / cancel--> Closed
//! ```
//!
//! Once closed, every emit returns [`SessionError::Closed`]. Signal reads do
//! not depend on the stream state.

use http::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use datastar_types::{
    ExecuteScriptOptions, PatchElementsOptions, PatchOperation, PatchSignalsOptions,
    RemoveElementOptions,
};

use crate::binding::SignalBinding;
use crate::config::DatastarConfig;
use crate::encoder::PatchEncoder;
use crate::error::{SessionError, SignalsError};
use crate::signals::{SignalReader, SignalSource, parse_signals};
use crate::transport::{StreamHead, StreamTransport};

enum StreamState<T: StreamTransport> {
    Pending(T),
    Open(T::Writer),
    Closed,
}

/// One request's event stream and signals.
pub struct Session<T: StreamTransport, S: SignalSource> {
    state: StreamState<T>,
    source: S,
    reader: SignalReader,
    encoder: PatchEncoder,
    cancel: CancellationToken,
}

impl<T: StreamTransport, S: SignalSource> Session<T, S> {
    /// Session with default configuration.
    ///
    /// `cancel` should fire when the request ends; it bounds every write and
    /// body read made through the session.
    pub fn new(transport: T, source: S, cancel: CancellationToken) -> Self {
        Self::with_config(transport, source, cancel, &DatastarConfig::default())
    }

    /// Session using the retry default, query key and body limit from
    /// `config`.
    pub fn with_config(
        transport: T,
        source: S,
        cancel: CancellationToken,
        config: &DatastarConfig,
    ) -> Self {
        Self {
            state: StreamState::Pending(transport),
            source,
            reader: SignalReader::from_config(config),
            encoder: PatchEncoder::new(config.default_retry()),
            cancel,
        }
    }

    /// The request-lifetime cancellation token.
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the stream-open response has been committed and the stream
    /// is still usable.
    pub const fn is_open(&self) -> bool {
        matches!(self.state, StreamState::Open(_))
    }

    /// Whether the session was closed by a failure or cancellation.
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, StreamState::Closed)
    }

    // ---- stream lifecycle ----

    /// Commit the stream-open response, merging `headers` under the
    /// protocol headers.
    ///
    /// Calling this is optional; the first emit starts the stream with no
    /// extra headers.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyStarted`] when the stream is open,
    /// [`SessionError::Closed`] when it was closed, and
    /// [`SessionError::Open`] when the host rejects the head.
    pub fn start(&mut self, headers: &HeaderMap) -> Result<(), SessionError> {
        match std::mem::replace(&mut self.state, StreamState::Closed) {
            StreamState::Pending(transport) => {
                let writer = transport.open(StreamHead::new(headers))?;
                self.state = StreamState::Open(writer);
                debug!(extra_headers = headers.len(), "event stream opened");
                Ok(())
            }
            open @ StreamState::Open(_) => {
                self.state = open;
                Err(SessionError::AlreadyStarted)
            }
            StreamState::Closed => Err(SessionError::Closed),
        }
    }

    /// Flush and shut down the stream, opening it first if nothing was
    /// emitted. A session that was already closed finishes quietly.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Open`] when the head cannot be committed and
    /// [`SessionError::Transport`] when the shutdown fails.
    pub async fn finish(mut self) -> Result<(), SessionError> {
        if matches!(self.state, StreamState::Pending(_)) {
            self.start(&HeaderMap::new())?;
        }
        if let StreamState::Open(writer) = &mut self.state {
            writer.shutdown().await?;
            debug!("event stream finished");
        }
        Ok(())
    }

    fn writer(&mut self) -> Result<&mut T::Writer, SessionError> {
        if matches!(self.state, StreamState::Pending(_)) {
            self.start(&HeaderMap::new())?;
        }
        match &mut self.state {
            StreamState::Open(writer) => Ok(writer),
            StreamState::Pending(_) | StreamState::Closed => Err(SessionError::Closed),
        }
    }

    fn close(&mut self, err: &SessionError) {
        self.state = StreamState::Closed;
        debug!(error = %err, "event stream closed");
    }

    // ---- patches ----

    /// Write one operation, bounded by the session's cancellation token.
    ///
    /// # Errors
    ///
    /// See [`emit_with`](Self::emit_with).
    pub async fn emit(&mut self, op: &PatchOperation) -> Result<(), SessionError> {
        let cancel = self.cancel.clone();
        self.emit_with(op, &cancel).await
    }

    /// Write one operation as a complete frame and flush it, giving up when
    /// `cancel` fires.
    ///
    /// A cancelled or failed write closes the session: the frame may be
    /// incomplete, so nothing more is written and the host drops the
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cancelled`] when `cancel` fires,
    /// [`SessionError::Transport`] when the write or flush fails, and
    /// [`SessionError::Closed`] when the session is already closed.
    pub async fn emit_with(
        &mut self,
        op: &PatchOperation,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        if cancel.is_cancelled() {
            let err = SessionError::Cancelled;
            if !self.is_closed() {
                self.close(&err);
            }
            return Err(err);
        }

        let frame = self.encoder.encode(op);
        let writer = self.writer()?;

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(SessionError::Cancelled),
            result = write_frame(writer, frame.as_bytes()) => result.map_err(SessionError::from),
        };

        match result {
            Ok(()) => {
                debug!(
                    event = %op.kind(),
                    bytes = frame.len(),
                    event_id = op.event_id(),
                    "frame written"
                );
                Ok(())
            }
            Err(err) => {
                self.close(&err);
                Err(err)
            }
        }
    }

    /// Patch `fragment` into the DOM.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidPatch`] for an invalid fragment or
    /// options, otherwise as [`emit`](Self::emit).
    pub async fn patch_elements(
        &mut self,
        fragment: impl Into<String>,
        options: &PatchElementsOptions,
    ) -> Result<(), SessionError> {
        let op = PatchOperation::elements(fragment, options)?;
        self.emit(&op).await
    }

    /// Remove the element matched by `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidPatch`] for a blank selector, otherwise
    /// as [`emit`](Self::emit).
    pub async fn remove_element(
        &mut self,
        selector: impl Into<String>,
        options: &RemoveElementOptions,
    ) -> Result<(), SessionError> {
        let op = PatchOperation::remove(selector, options)?;
        self.emit(&op).await
    }

    /// Merge the JSON object text `json` into the client signals.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidPatch`] when `json` is not a JSON
    /// object, otherwise as [`emit`](Self::emit).
    pub async fn patch_signals(
        &mut self,
        json: impl Into<String>,
        options: &PatchSignalsOptions,
    ) -> Result<(), SessionError> {
        let op = PatchOperation::signals(json, options)?;
        self.emit(&op).await
    }

    /// Serialize `signals` and merge it into the client signals.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Serialize`] when serialization fails and
    /// [`SessionError::InvalidPatch`] when `signals` is not an object.
    pub async fn patch_signals_value<V: Serialize + ?Sized>(
        &mut self,
        signals: &V,
        options: &PatchSignalsOptions,
    ) -> Result<(), SessionError> {
        let json = serde_json::to_string(signals)?;
        self.patch_signals(json, options).await
    }

    /// Run `script` on the client by appending a `<script>` to the body.
    ///
    /// # Errors
    ///
    /// As [`emit`](Self::emit).
    pub async fn execute_script(
        &mut self,
        script: &str,
        options: &ExecuteScriptOptions,
    ) -> Result<(), SessionError> {
        let op = PatchOperation::script(script, options)?;
        self.emit(&op).await
    }

    // ---- signals ----

    /// Read the raw signals text, bounded by the session's cancellation
    /// token. `Ok(None)` means the request carried no signals.
    ///
    /// # Errors
    ///
    /// See [`SignalReader::read_text`].
    pub async fn read_signals_text(&mut self) -> Result<Option<String>, SignalsError> {
        let cancel = self.cancel.clone();
        self.read_signals_text_with(&cancel).await
    }

    /// Read the raw signals text, giving up when `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`SignalReader::read_text`].
    pub async fn read_signals_text_with(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, SignalsError> {
        self.reader.read_text(&mut self.source, cancel).await
    }

    /// Read and parse the signals document.
    ///
    /// # Errors
    ///
    /// See [`SignalReader::read_value`].
    pub async fn read_signals_value(&mut self) -> Result<Option<Value>, SignalsError> {
        self.read_signals_text()
            .await?
            .map(|text| parse_signals(&text))
            .transpose()
    }

    /// Read the signals and bind a value of type `V` as `binding` states.
    ///
    /// `Ok(None)` means the request carried no signals. A scalar binding
    /// whose value is absent reads as `Some(V::default())`; a structured
    /// binding whose path is absent is an error.
    ///
    /// # Errors
    ///
    /// Returns [`SignalsError::Malformed`] for invalid JSON and any
    /// [`SignalBinding::bind`] error.
    pub async fn read_signals_typed<V>(
        &mut self,
        binding: &SignalBinding,
    ) -> Result<Option<V>, SignalsError>
    where
        V: DeserializeOwned + Default,
    {
        let Some(doc) = self.read_signals_value().await? else {
            return Ok(None);
        };
        binding.bind_or_default(&doc).map(Some)
    }

    /// Read a scalar signal by name, substituting `V::default()` when the
    /// signal is absent from the document.
    ///
    /// # Errors
    ///
    /// Returns [`SignalsError::Missing`] when the request carried no signals
    /// at all, and any [`SignalBinding::bind`] error.
    pub async fn read_signal<V>(&mut self, name: &str) -> Result<V, SignalsError>
    where
        V: DeserializeOwned + Default,
    {
        self.read_signals_typed(&SignalBinding::scalar(name))
            .await?
            .ok_or(SignalsError::Missing)
    }

    /// Read the signals and apply `binding`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalsError::Missing`] when the request carried no signals
    /// at all, and any [`SignalBinding::bind`] error.
    pub async fn bind<V: DeserializeOwned>(
        &mut self,
        binding: &SignalBinding,
    ) -> Result<Option<V>, SignalsError> {
        let doc = self
            .read_signals_value()
            .await?
            .ok_or(SignalsError::Missing)?;
        binding.bind(&doc)
    }
}

async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await
}
