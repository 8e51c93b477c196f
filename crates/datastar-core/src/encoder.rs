//! Event-stream framing of patch operations.
//!
//! Each [`PatchOperation`] becomes one complete frame:
//!
//! ```text
//! event: datastar-patch-elements
//! data: selector #target
//! data: mode inner
//! data: useViewTransition true
//! data: elements <div id="target">
//! data: elements   hello
//! data: elements </div>
//! id: 42
//! retry: 1000
//!
//! ```
//!
//! Optional data lines are written only when they differ from the protocol
//! default, always in the order shown. Multi-line fragments and payloads
//! are split into one data line per source line. The `retry` line is always
//! written.

use std::time::Duration;

use datastar_types::consts::{dataline, DEFAULT_RETRY};
use datastar_types::{ElementPatch, PatchMode, PatchOperation, SignalPatch};

/// Turns patch operations into event-stream frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchEncoder {
    default_retry: Duration,
}

impl Default for PatchEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY)
    }
}

impl PatchEncoder {
    /// Encoder applying `default_retry` to operations without their own.
    pub const fn new(default_retry: Duration) -> Self {
        Self { default_retry }
    }

    /// Encode `op` as one complete frame, blank terminator included.
    pub fn encode(&self, op: &PatchOperation) -> String {
        self.lines(op)
            .into_iter()
            .fold(String::new(), |mut frame, line| {
                frame.push_str(&line);
                frame.push('\n');
                frame
            })
    }

    /// The lines of the frame for `op`, without line terminators. The last
    /// element is the empty line that ends the frame.
    pub fn lines(&self, op: &PatchOperation) -> Vec<String> {
        let mut lines = vec![format!("event: {}", op.kind())];

        match op {
            PatchOperation::Elements(patch) => element_lines(patch, &mut lines),
            PatchOperation::Signals(patch) => signal_lines(patch, &mut lines),
        }

        if let Some(id) = op.event_id() {
            lines.push(format!("id: {id}"));
        }
        let retry = op.retry().unwrap_or(self.default_retry);
        lines.push(format!("retry: {}", retry.as_millis()));
        lines.push(String::new());
        lines
    }
}

fn element_lines(patch: &ElementPatch, lines: &mut Vec<String>) {
    if let Some(selector) = patch.selector() {
        lines.push(data_line(dataline::SELECTOR, selector));
    }
    if patch.mode() != PatchMode::Outer {
        lines.push(data_line(dataline::MODE, patch.mode().as_str()));
    }
    if patch.use_view_transition() {
        lines.push(data_line(dataline::USE_VIEW_TRANSITION, "true"));
    }
    lines.extend(
        physical_lines(patch.fragment())
            .into_iter()
            .map(|line| data_line(dataline::ELEMENTS, line)),
    );
}

fn signal_lines(patch: &SignalPatch, lines: &mut Vec<String>) {
    if patch.only_if_missing() {
        lines.push(data_line(dataline::ONLY_IF_MISSING, "true"));
    }
    lines.extend(
        physical_lines(patch.payload())
            .into_iter()
            .map(|line| data_line(dataline::SIGNALS, line)),
    );
}

/// Split on `\r\n`, `\r` and `\n`, the three terminators an event stream
/// recognises. A trailing terminator does not produce an empty last line.
fn physical_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some(end) = rest.find(['\r', '\n']) {
        let (line, tail) = rest.split_at(end);
        lines.push(line);
        rest = tail
            .strip_prefix("\r\n")
            .or_else(|| tail.get(1..))
            .unwrap_or_default();
    }
    if !rest.is_empty() {
        lines.push(rest);
    }
    lines
}

fn data_line(key: &str, value: &str) -> String {
    format!("data: {key} {value}")
}
