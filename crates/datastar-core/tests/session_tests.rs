//! Integration tests for the protocol session.
//!
//! Each test drives a [`Session`] over an in-memory duplex pipe and parses
//! the bytes that come out the other end, the way a client would.

#![allow(clippy::unwrap_used)]

use std::io::Cursor;
use std::time::Duration;

use datastar_core::{
    DatastarConfig, PipeTransport, ResolveError, Session, SessionError, SignalBinding, SignalPath,
    SignalSource, SignalsError,
};
use datastar_types::{
    ExecuteScriptOptions, PatchElementsOptions, PatchMode, PatchSignalsOptions,
    RemoveElementOptions,
};
use http::{HeaderMap, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, DuplexStream};
use tokio_util::sync::CancellationToken;

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

type TestSession = Session<PipeTransport<DuplexStream>, TestRequest>;

fn open(request: TestRequest) -> (TestSession, DuplexStream) {
    open_with(request, &DatastarConfig::default())
}

fn open_with(request: TestRequest, config: &DatastarConfig) -> (TestSession, DuplexStream) {
    let (writer, reader) = tokio::io::duplex(65_536);
    let (transport, head_rx) = PipeTransport::new(writer);
    // Keep the head receiver alive so the session can open its stream.
    tokio::spawn(async move {
        let _head = head_rx.await;
    });
    let session = Session::with_config(transport, request, CancellationToken::new(), config);
    (session, reader)
}

async fn drain(session: TestSession, mut reader: DuplexStream) -> String {
    session.finish().await.unwrap();
    let mut out = String::new();
    reader.read_to_string(&mut out).await.unwrap();
    out
}

/// Split a stream into frames, each a list of its non-blank lines.
fn frames(stream: &str) -> Vec<Vec<&str>> {
    stream
        .split("\n\n")
        .filter(|frame| !frame.is_empty())
        .map(|frame| frame.lines().collect())
        .collect()
}

fn data_values<'a>(frame: &[&'a str], key: &str) -> Vec<&'a str> {
    let prefix = format!("data: {key} ");
    frame
        .iter()
        .filter_map(|line| line.strip_prefix(prefix.as_str()))
        .collect()
}

// ---- emitting ----

#[tokio::test]
async fn signals_frame_parses_back() {
    let (mut session, reader) = open(TestRequest::get(""));
    session
        .patch_signals(r#"{"x":1}"#, &PatchSignalsOptions::default())
        .await
        .unwrap();
    let out = drain(session, reader).await;

    let frames = frames(&out);
    assert_eq!(frames.len(), 1);
    let frame = frames.first().unwrap();
    assert_eq!(frame.first(), Some(&"event: datastar-patch-signals"));
    let payload = data_values(frame, "signals").join("\n");
    let parsed: Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(parsed, json!({"x": 1}));
}

#[tokio::test]
async fn frames_appear_in_call_order() {
    let (mut session, reader) = open(TestRequest::get(""));
    session
        .patch_elements(r#"<div id="a">1</div>"#, &PatchElementsOptions::default())
        .await
        .unwrap();
    session
        .patch_signals(r#"{"n":2}"#, &PatchSignalsOptions::default())
        .await
        .unwrap();
    session
        .remove_element("#a", &RemoveElementOptions::default())
        .await
        .unwrap();
    session
        .execute_script("alert(3)", &ExecuteScriptOptions::default())
        .await
        .unwrap();
    let out = drain(session, reader).await;

    let frames = frames(&out);
    assert_eq!(frames.len(), 4);
    let events: Vec<_> = frames.iter().filter_map(|f| f.first().copied()).collect();
    assert_eq!(
        events,
        [
            "event: datastar-patch-elements",
            "event: datastar-patch-signals",
            "event: datastar-patch-elements",
            "event: datastar-patch-elements",
        ]
    );
    assert_eq!(
        data_values(frames.get(2).unwrap(), "mode"),
        [PatchMode::Remove.as_str()]
    );
    assert_eq!(
        data_values(frames.get(3).unwrap(), "selector"),
        ["body"]
    );
}

#[tokio::test]
async fn every_frame_is_terminated() {
    let (mut session, reader) = open(TestRequest::get(""));
    for i in 0..3 {
        session
            .patch_signals(format!(r#"{{"i":{i}}}"#), &PatchSignalsOptions::default())
            .await
            .unwrap();
    }
    let out = drain(session, reader).await;
    assert_eq!(out.matches("\n\n").count(), 3);
    assert!(out.ends_with("retry: 1000\n\n"));
}

#[tokio::test]
async fn configured_retry_applies_to_unset_options() {
    let config = DatastarConfig {
        default_retry_ms: 4000,
        ..DatastarConfig::default()
    };
    let (mut session, reader) = open_with(TestRequest::get(""), &config);
    session
        .patch_signals("{}", &PatchSignalsOptions::default())
        .await
        .unwrap();
    let explicit = PatchSignalsOptions {
        retry: Some(Duration::from_millis(10)),
        ..PatchSignalsOptions::default()
    };
    session.patch_signals("{}", &explicit).await.unwrap();
    let out = drain(session, reader).await;

    let frames = frames(&out);
    assert!(frames.first().unwrap().contains(&"retry: 4000"));
    assert!(frames.get(1).unwrap().contains(&"retry: 10"));
}

#[tokio::test]
async fn typed_signal_values_serialize() {
    #[derive(Serialize)]
    struct Progress {
        done: u32,
        total: u32,
    }

    let (mut session, reader) = open(TestRequest::get(""));
    session
        .patch_signals_value(&Progress { done: 3, total: 9 }, &PatchSignalsOptions::default())
        .await
        .unwrap();
    let rejected = session
        .patch_signals_value(&[1, 2, 3], &PatchSignalsOptions::default())
        .await;
    assert!(matches!(rejected, Err(SessionError::InvalidPatch(_))));
    let out = drain(session, reader).await;

    assert!(out.contains(r#"data: signals {"done":3,"total":9}"#));
}

#[tokio::test]
async fn explicit_start_carries_caller_headers() {
    let (writer, _reader) = tokio::io::duplex(1024);
    let (transport, head_rx) = PipeTransport::new(writer);
    let mut session = Session::new(transport, TestRequest::get(""), CancellationToken::new());

    let mut headers = HeaderMap::new();
    headers.insert("x-trace", HeaderValue::from_static("t-1"));
    session.start(&headers).unwrap();
    assert!(matches!(
        session.start(&HeaderMap::new()),
        Err(SessionError::AlreadyStarted)
    ));

    let head = head_rx.await.unwrap();
    assert_eq!(head.headers.get("x-trace").unwrap(), "t-1");
    assert_eq!(
        head.headers.get(http::header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
}

#[tokio::test]
async fn cancellation_closes_the_session() {
    let (writer, _reader) = tokio::io::duplex(1024);
    let (transport, _head_rx) = PipeTransport::new(writer);
    let cancel = CancellationToken::new();
    let mut session = Session::new(transport, TestRequest::get(""), cancel.clone());

    session
        .patch_signals("{}", &PatchSignalsOptions::default())
        .await
        .unwrap();
    cancel.cancel();

    let cancelled = session
        .patch_signals("{}", &PatchSignalsOptions::default())
        .await;
    assert!(matches!(cancelled, Err(SessionError::Cancelled)));
    let after = session
        .patch_signals("{}", &PatchSignalsOptions::default())
        .await;
    assert!(matches!(after, Err(SessionError::Cancelled)));
    assert!(session.is_closed());
}

#[tokio::test]
async fn cancellation_interrupts_a_blocked_write() {
    // A one-byte pipe that nobody reads blocks the first write.
    let (writer, _reader) = tokio::io::duplex(1);
    let (transport, _head_rx) = PipeTransport::new(writer);
    let mut session = Session::new(transport, TestRequest::get(""), CancellationToken::new());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let op = datastar_types::PatchOperation::signals("{}", &PatchSignalsOptions::default())
        .unwrap();
    let result = session.emit_with(&op, &cancel).await;
    assert!(matches!(result, Err(SessionError::Cancelled)));
    assert!(session.is_closed());

    let after = session
        .patch_signals("{}", &PatchSignalsOptions::default())
        .await;
    assert!(matches!(after, Err(SessionError::Closed)));
}

// ---- reading ----

#[tokio::test]
async fn get_signals_can_be_read_repeatedly() {
    let (mut session, _reader) = open(TestRequest::get("datastar=%7B%22q%22%3A%22rust%22%7D"));
    let first = session.read_signals_text().await.unwrap();
    let second = session.read_signals_text().await.unwrap();
    assert_eq!(first.as_deref(), Some(r#"{"q":"rust"}"#));
    assert_eq!(first, second);
}

#[tokio::test]
async fn body_signals_are_read_once() {
    let (mut session, _reader) = open(TestRequest::post(r#"{"q":"rust"}"#));
    let first: Option<Value> = session
        .read_signals_typed(&SignalBinding::structured())
        .await
        .unwrap();
    assert_eq!(first, Some(json!({"q": "rust"})));

    let second = session.read_signals_text().await;
    assert!(matches!(second, Err(SignalsError::BodyConsumed)));
}

#[tokio::test]
async fn typed_read_of_whole_document() {
    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Search {
        query: String,
        page: u32,
    }

    let (mut session, _reader) = open(TestRequest::post(r#"{"query":"x","page":2}"#));
    let binding = SignalBinding::structured_path("").unwrap();
    let search: Option<Search> = session.read_signals_typed(&binding).await.unwrap();
    assert_eq!(
        search,
        Some(Search {
            query: String::from("x"),
            page: 2
        })
    );
}

#[tokio::test]
async fn typed_read_at_path() {
    let (mut session, _reader) = open(TestRequest::post(r#"{"form":{"age":41}}"#));
    let age: Option<u8> = session
        .read_signals_typed(&SignalBinding::scalar("form.age"))
        .await
        .unwrap();
    assert_eq!(age, Some(41));
}

#[tokio::test]
async fn typed_read_reports_coercion_and_absence_separately() {
    let (mut session, _reader) = open(TestRequest::get("datastar=%7B%22n%22%3A%22many%22%7D"));
    let wrong = session
        .read_signals_typed::<u32>(&SignalBinding::scalar("n"))
        .await;
    assert!(matches!(
        wrong,
        Err(SignalsError::Resolve(ResolveError::Coercion { .. }))
    ));

    let missing = session
        .read_signals_typed::<u32>(&SignalBinding::scalar("m"))
        .await;
    assert!(matches!(missing, Ok(Some(0))));
    let missing_text = session
        .read_signals_typed::<String>(&SignalBinding::scalar("m"))
        .await;
    assert_eq!(missing_text.ok().flatten().as_deref(), Some(""));

    let structured = SignalBinding::structured_path("m").unwrap();
    let missing_object = session.read_signals_typed::<Value>(&structured).await;
    assert!(matches!(
        missing_object,
        Err(SignalsError::Resolve(ResolveError::NotFound { .. }))
    ));

    let bad_path = session
        .read_signals_typed::<u32>(&SignalBinding::scalar("a..b"))
        .await;
    assert!(matches!(bad_path, Err(SignalsError::InvalidPath(_))));
}

#[tokio::test]
async fn typed_read_without_signals_is_none() {
    let (mut session, _reader) = open(TestRequest::get(""));
    let absent = session
        .read_signals_typed::<u32>(&SignalBinding::scalar("n"))
        .await;
    assert!(matches!(absent, Ok(None)));
}

#[tokio::test]
async fn scalar_signal_defaults_when_absent() {
    let (mut session, _reader) = open(TestRequest::get("datastar=%7B%22n%22%3A5%7D"));
    let n: u32 = session.read_signal("n").await.unwrap();
    let other: String = session.read_signal("other").await.unwrap();
    assert_eq!(n, 5);
    assert_eq!(other, "");
}

#[tokio::test]
async fn malformed_signals_are_client_errors() {
    let (mut session, _reader) = open(TestRequest::post("{oops"));
    let result = session.read_signals_value().await;
    let err = result.unwrap_err();
    assert!(matches!(err, SignalsError::Malformed { .. }));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn binding_at_path() {
    let (mut session, _reader) = open(TestRequest::get(
        "datastar=%7B%22ui%22%3A%7B%22open%22%3Atrue%7D%7D",
    ));
    let binding = SignalBinding::scalar("open").at(SignalPath::parse("ui.open").unwrap());
    let open: Option<bool> = session.bind(&binding).await.unwrap();
    assert_eq!(open, Some(true));
}

#[tokio::test]
async fn reads_and_writes_interleave() {
    let (mut session, reader) = open(TestRequest::get("datastar=%7B%22count%22%3A1%7D"));
    let count: u32 = session.read_signal("count").await.unwrap();
    let next = count.saturating_add(1);
    session
        .patch_signals(json!({ "count": next }).to_string(), &PatchSignalsOptions::default())
        .await
        .unwrap();
    session
        .patch_elements(
            format!(r#"<span id="count">{next}</span>"#),
            &PatchElementsOptions::default(),
        )
        .await
        .unwrap();
    let out = drain(session, reader).await;
    assert!(out.contains(r#"data: signals {"count":2}"#));
    assert!(out.contains(r#"data: elements <span id="count">2</span>"#));
}
