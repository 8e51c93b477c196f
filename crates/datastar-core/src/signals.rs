//! Reading client signals from a request.
//!
//! `GET` requests carry signals URL-encoded in a single query parameter
//! (`datastar` by default). Every other method carries them as the whole
//! request body. The query parameter can be read any number of times; the
//! body can be read exactly once, and a second attempt is reported as
//! [`SignalsError::BodyConsumed`] rather than silently yielding nothing.

use http::Method;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::DatastarConfig;
use crate::error::SignalsError;

/// The request side of the host transport.
pub trait SignalSource {
    /// Streaming request body.
    type Body: AsyncRead + Unpin + Send;

    /// HTTP method of the request.
    fn method(&self) -> &Method;

    /// Raw (still URL-encoded) query string, without the leading `?`.
    fn query(&self) -> Option<&str>;

    /// Hand out the body. Returns `None` once the body has been taken.
    fn take_body(&mut self) -> Option<Self::Body>;
}

/// Extracts signals text from a [`SignalSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalReader {
    query_key: String,
    max_bytes: usize,
}

impl Default for SignalReader {
    fn default() -> Self {
        Self::from_config(&DatastarConfig::default())
    }
}

impl SignalReader {
    /// Build a reader using the query key and body limit from `config`.
    pub fn from_config(config: &DatastarConfig) -> Self {
        Self {
            query_key: config.signals_query_key.clone(),
            max_bytes: config.max_signals_bytes,
        }
    }

    /// Read the raw signals JSON text.
    ///
    /// Returns `Ok(None)` when the request carries no signals (missing query
    /// parameter or empty body). Whether the text is valid JSON is not
    /// checked here.
    ///
    /// # Errors
    ///
    /// Returns [`SignalsError::BodyConsumed`] when the body was already read,
    /// [`SignalsError::TooLarge`] when it exceeds the configured limit,
    /// [`SignalsError::NotUtf8`] for non-UTF-8 bodies,
    /// [`SignalsError::Io`] when reading fails, and
    /// [`SignalsError::Cancelled`] when `cancel` fires first.
    pub async fn read_text<S: SignalSource>(
        &self,
        source: &mut S,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, SignalsError> {
        if *source.method() == Method::GET {
            return Ok(self.query_signals(source.query()));
        }

        let Some(body) = source.take_body() else {
            warn!(
                method = %source.method(),
                "signals body already consumed; \
                 is more than one signals read made for this request?"
            );
            return Err(SignalsError::BodyConsumed);
        };

        let bytes = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(SignalsError::Cancelled),
            result = self.read_limited(body) => result?,
        };

        let text = String::from_utf8(bytes)?;
        debug!(bytes = text.len(), "signals read from request body");
        Ok(non_blank(text))
    }

    /// Read and parse the signals document.
    ///
    /// # Errors
    ///
    /// Everything [`read_text`](Self::read_text) returns, plus
    /// [`SignalsError::Malformed`] when the text is not valid JSON.
    pub async fn read_value<S: SignalSource>(
        &self,
        source: &mut S,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, SignalsError> {
        self.read_text(source, cancel)
            .await?
            .map(|text| parse_signals(&text))
            .transpose()
    }

    fn query_signals(&self, query: Option<&str>) -> Option<String> {
        let query = query?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == self.query_key.as_str())
            .map(|(_, value)| value.into_owned())
            .and_then(non_blank)
    }

    async fn read_limited<B: AsyncRead + Unpin>(&self, body: B) -> Result<Vec<u8>, SignalsError> {
        let limit = u64::try_from(self.max_bytes).unwrap_or(u64::MAX);
        let mut bytes = Vec::new();
        body.take(limit.saturating_add(1))
            .read_to_end(&mut bytes)
            .await?;
        if bytes.len() > self.max_bytes {
            return Err(SignalsError::TooLarge {
                limit: self.max_bytes,
            });
        }
        Ok(bytes)
    }
}

/// Parse signals text into a JSON document.
///
/// # Errors
///
/// Returns [`SignalsError::Malformed`] when `text` is not valid JSON.
pub fn parse_signals(text: &str) -> Result<Value, SignalsError> {
    serde_json::from_str(text).map_err(|source| SignalsError::Malformed { source })
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    struct TestRequest {
        method: Method,
        query: Option<String>,
        body: Option<Cursor<Vec<u8>>>,
    }

    impl TestRequest {
        fn get(query: &str) -> Self {
            Self {
                method: Method::GET,
                query: Some(query.to_owned()),
                body: None,
            }
        }

        fn post(body: &str) -> Self {
            Self {
                method: Method::POST,
                query: None,
                body: Some(Cursor::new(body.as_bytes().to_vec())),
            }
        }
    }

    impl SignalSource for TestRequest {
        type Body = Cursor<Vec<u8>>;

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

    #[tokio::test]
    async fn get_reads_url_decoded_query_parameter() {
        let mut request = TestRequest::get("page=2&datastar=%7B%22x%22%3A1%7D");
        let reader = SignalReader::default();
        let text = reader
            .read_text(&mut request, &CancellationToken::new())
            .await;
        assert_eq!(text.ok().flatten().as_deref(), Some(r#"{"x":1}"#));
    }

    #[tokio::test]
    async fn get_reads_are_idempotent() {
        let mut request = TestRequest::get("datastar=%7B%22a%22%3Atrue%7D");
        let reader = SignalReader::default();
        let cancel = CancellationToken::new();
        let first = reader.read_text(&mut request, &cancel).await.ok().flatten();
        let second = reader.read_text(&mut request, &cancel).await.ok().flatten();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn get_without_parameter_is_absent() {
        let mut request = TestRequest::get("page=2");
        let reader = SignalReader::default();
        let text = reader
            .read_text(&mut request, &CancellationToken::new())
            .await;
        assert!(matches!(text, Ok(None)));
    }

    #[tokio::test]
    async fn post_reads_body_once() {
        let mut request = TestRequest::post(r#"{"count":5}"#);
        let reader = SignalReader::default();
        let cancel = CancellationToken::new();

        let first = reader.read_text(&mut request, &cancel).await;
        assert_eq!(first.ok().flatten().as_deref(), Some(r#"{"count":5}"#));

        let second = reader.read_text(&mut request, &cancel).await;
        assert!(matches!(second, Err(SignalsError::BodyConsumed)));
    }

    #[tokio::test]
    async fn empty_body_is_absent() {
        let mut request = TestRequest::post("  \n");
        let reader = SignalReader::default();
        let text = reader
            .read_text(&mut request, &CancellationToken::new())
            .await;
        assert!(matches!(text, Ok(None)));
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let config = DatastarConfig {
            max_signals_bytes: 4,
            ..DatastarConfig::default()
        };
        let mut request = TestRequest::post(r#"{"long":true}"#);
        let reader = SignalReader::from_config(&config);
        let text = reader
            .read_text(&mut request, &CancellationToken::new())
            .await;
        assert!(matches!(text, Err(SignalsError::TooLarge { limit: 4 })));
    }

    #[tokio::test]
    async fn cancelled_read_reports_cancellation() {
        let mut request = TestRequest::post("{}");
        let reader = SignalReader::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let text = reader.read_text(&mut request, &cancel).await;
        assert!(matches!(text, Err(SignalsError::Cancelled)));
    }

    #[tokio::test]
    async fn malformed_json_is_distinct_from_absent() {
        let mut request = TestRequest::post("{not json");
        let reader = SignalReader::default();
        let value = reader
            .read_value(&mut request, &CancellationToken::new())
            .await;
        assert!(matches!(value, Err(SignalsError::Malformed { .. })));
    }

    #[tokio::test]
    async fn custom_query_key() {
        let config = DatastarConfig {
            signals_query_key: String::from("ds"),
            ..DatastarConfig::default()
        };
        let mut request = TestRequest::get("datastar=%7B%7D&ds=%7B%22k%22%3A2%7D");
        let reader = SignalReader::from_config(&config);
        let value = reader
            .read_value(&mut request, &CancellationToken::new())
            .await;
        assert_eq!(value.ok().flatten(), Some(serde_json::json!({"k": 2})));
    }
}
