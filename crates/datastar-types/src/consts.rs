//! Wire constants and protocol defaults.
//!
//! A data line is only written when its value differs from the default
//! listed here, so these values are part of the wire contract.

use std::time::Duration;

use crate::enums::PatchMode;

/// Reserved query-string key carrying signals on read-only requests.
pub const DATASTAR_KEY: &str = "datastar";

/// Default client reconnect delay, in milliseconds.
pub const DEFAULT_RETRY_MS: u64 = 1000;

/// Default client reconnect delay.
pub const DEFAULT_RETRY: Duration = Duration::from_millis(DEFAULT_RETRY_MS);

/// Default element patch mode.
pub const DEFAULT_PATCH_MODE: PatchMode = PatchMode::Outer;

/// Default for `useViewTransition` on element patches.
pub const DEFAULT_USE_VIEW_TRANSITION: bool = false;

/// Default for `onlyIfMissing` on signal patches.
pub const DEFAULT_ONLY_IF_MISSING: bool = false;

/// Target selector for script execution patches.
pub const SCRIPT_TARGET_SELECTOR: &str = "body";

/// Attribute that makes an executed `<script>` element remove itself.
pub const SCRIPT_AUTO_REMOVE_ATTRIBUTE: &str = r#"data-effect="el.remove()""#;

/// Default for `auto_remove` on script execution.
pub const DEFAULT_SCRIPT_AUTO_REMOVE: bool = true;

// ---------------------------------------------------------------------------
// Data-line keys
// ---------------------------------------------------------------------------

/// Keys written after `data: ` on each data line.
pub mod dataline {
    /// CSS selector targeted by an element patch.
    pub const SELECTOR: &str = "selector";
    /// Patch mode of an element patch.
    pub const MODE: &str = "mode";
    /// One line of the element fragment.
    pub const ELEMENTS: &str = "elements";
    /// View transition flag of an element patch.
    pub const USE_VIEW_TRANSITION: &str = "useViewTransition";
    /// One line of the signals payload.
    pub const SIGNALS: &str = "signals";
    /// Only-if-missing flag of a signal patch.
    pub const ONLY_IF_MISSING: &str = "onlyIfMissing";
}

// ---------------------------------------------------------------------------
// Stream response headers
// ---------------------------------------------------------------------------

/// Header names and values that open an event stream.
pub mod headers {
    /// Content type of an event stream.
    pub const CONTENT_TYPE_EVENT_STREAM: &str = "text/event-stream";
    /// Cache policy that stops intermediaries from caching the stream.
    pub const CACHE_CONTROL_NO_CACHE: &str = "no-cache";
    /// Header asking reverse proxies not to buffer the stream.
    pub const X_ACCEL_BUFFERING: &str = "x-accel-buffering";
    /// Value disabling proxy buffering.
    pub const X_ACCEL_BUFFERING_NO: &str = "no";
}
