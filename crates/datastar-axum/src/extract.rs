//! Extractor for handlers that only need the signals.

use axum::extract::{FromRequest, Request};
use datastar_core::{SignalReader, SignalsError};
use serde::de::DeserializeOwned;

use crate::error::DatastarRejection;
use crate::request::DatastarRequest;

/// Deserializes the whole signals document into `T`.
///
/// Rejects with `400 Bad Request` when the request carries no signals or
/// they do not match `T`. The body read stops early when the request's
/// [`CancellationToken`](tokio_util::sync::CancellationToken) extension is
/// cancelled; see [`DatastarRequest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadSignals<T>(pub T);

impl<T, S> FromRequest<S> for ReadSignals<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = DatastarRejection;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let mut request = DatastarRequest::new(req);
        let reader = SignalReader::from_config(request.config());
        let cancel = request.cancellation_token().clone();
        let doc = reader
            .read_value(&mut request, &cancel)
            .await?
            .ok_or(SignalsError::Missing)?;
        let value = T::deserialize(&doc).map_err(|source| SignalsError::Coercion { source })?;
        Ok(Self(value))
    }
}
