//! Caller-facing options for each patch operation.
//!
//! Options are plain data. They become a [`PatchOperation`] only through the
//! explicit constructors in [`crate::patch`]; there are no implicit
//! conversions between option structs and operations.
//!
//! `retry` is `None` when the caller did not choose a reconnect delay. The
//! session then applies its configured default.
//!
//! [`PatchOperation`]: crate::PatchOperation

use std::time::Duration;

use crate::consts::{
    DEFAULT_ONLY_IF_MISSING, DEFAULT_PATCH_MODE, DEFAULT_SCRIPT_AUTO_REMOVE,
    DEFAULT_USE_VIEW_TRANSITION,
};
use crate::enums::PatchMode;

/// Options for patching elements into the DOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchElementsOptions {
    /// CSS selector of the target element. When absent the client matches
    /// top-level elements of the fragment by `id`.
    pub selector: Option<String>,
    /// How the fragment is applied.
    pub mode: PatchMode,
    /// Whether the client wraps the patch in a view transition.
    pub use_view_transition: bool,
    /// Explicit event id.
    pub event_id: Option<String>,
    /// Client reconnect delay.
    pub retry: Option<Duration>,
}

impl Default for PatchElementsOptions {
    fn default() -> Self {
        Self {
            selector: None,
            mode: DEFAULT_PATCH_MODE,
            use_view_transition: DEFAULT_USE_VIEW_TRANSITION,
            event_id: None,
            retry: None,
        }
    }
}

impl PatchElementsOptions {
    /// Target `selector`.
    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Apply with `mode`.
    #[must_use]
    pub const fn with_mode(mut self, mode: PatchMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Options for removing an element from the DOM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveElementOptions {
    /// Whether the client wraps the removal in a view transition.
    pub use_view_transition: bool,
    /// Explicit event id.
    pub event_id: Option<String>,
    /// Client reconnect delay.
    pub retry: Option<Duration>,
}

/// Options for patching client signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSignalsOptions {
    /// Only set signals that the client does not already hold.
    pub only_if_missing: bool,
    /// Explicit event id.
    pub event_id: Option<String>,
    /// Client reconnect delay.
    pub retry: Option<Duration>,
}

impl Default for PatchSignalsOptions {
    fn default() -> Self {
        Self {
            only_if_missing: DEFAULT_ONLY_IF_MISSING,
            event_id: None,
            retry: None,
        }
    }
}

/// Options for executing a script on the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteScriptOptions {
    /// Remove the `<script>` element once it has run.
    pub auto_remove: bool,
    /// Extra attributes for the `<script>` tag, written verbatim
    /// (e.g. `type="module"`).
    pub attributes: Vec<String>,
    /// Explicit event id.
    pub event_id: Option<String>,
    /// Client reconnect delay.
    pub retry: Option<Duration>,
}

impl Default for ExecuteScriptOptions {
    fn default() -> Self {
        Self {
            auto_remove: DEFAULT_SCRIPT_AUTO_REMOVE,
            attributes: Vec::new(),
            event_id: None,
            retry: None,
        }
    }
}
