//! Patch operations: one variant per event kind.
//!
//! A [`PatchOperation`] is built from caller input plus options, validated
//! once at construction, handed to the encoder, and dropped. It has no
//! identity beyond the frame it produces.

use std::time::Duration;

use crate::consts::{SCRIPT_AUTO_REMOVE_ATTRIBUTE, SCRIPT_TARGET_SELECTOR};
use crate::enums::{EventKind, PatchMode};
use crate::options::{
    ExecuteScriptOptions, PatchElementsOptions, PatchSignalsOptions, RemoveElementOptions,
};

/// Reasons a patch operation cannot be built.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// A non-remove element patch was given no markup.
    #[error("element patch with mode `{mode}` requires a non-empty fragment")]
    EmptyFragment {
        /// The requested mode.
        mode: PatchMode,
    },

    /// A remove patch had neither a selector nor a fragment to match by id.
    #[error("remove patch requires a selector or a fragment")]
    MissingTarget,

    /// The signals payload is not a JSON object.
    #[error("signals payload is not a JSON object: {source}")]
    InvalidSignals {
        /// The underlying parse error.
        #[from]
        source: serde_json::Error,
    },

    /// A single-line field contains a line break, which would split the frame.
    #[error("{field} must not contain line breaks")]
    LineBreak {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// An element patch frame.
///
/// Fields are private so every instance passes through the validating
/// constructors on [`PatchOperation`]:
///
/// ```compile_fail
/// use datastar_types::{ElementPatch, PatchMode};
///
/// let patch = ElementPatch {
///     selector: Some(String::from("#a\ndata: mode remove")),
///     mode: PatchMode::Outer,
///     fragment: String::new(),
///     use_view_transition: false,
///     event_id: None,
///     retry: None,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPatch {
    selector: Option<String>,
    mode: PatchMode,
    fragment: String,
    use_view_transition: bool,
    event_id: Option<String>,
    retry: Option<Duration>,
}

impl ElementPatch {
    /// Target selector.
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    /// How the fragment is applied.
    pub const fn mode(&self) -> PatchMode {
        self.mode
    }

    /// Markup, possibly spanning several lines. Empty only for removals.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// View transition flag.
    pub const fn use_view_transition(&self) -> bool {
        self.use_view_transition
    }

    /// Explicit event id.
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    /// Reconnect delay; `None` defers to the session default.
    pub const fn retry(&self) -> Option<Duration> {
        self.retry
    }
}

/// A signal patch frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalPatch {
    payload: String,
    only_if_missing: bool,
    event_id: Option<String>,
    retry: Option<Duration>,
}

impl SignalPatch {
    /// JSON object text.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Only-if-missing flag.
    pub const fn only_if_missing(&self) -> bool {
        self.only_if_missing
    }

    /// Explicit event id.
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    /// Reconnect delay; `None` defers to the session default.
    pub const fn retry(&self) -> Option<Duration> {
        self.retry
    }
}

/// A single patch instruction for the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOperation {
    /// Modify rendered markup.
    Elements(ElementPatch),
    /// Modify signal state.
    Signals(SignalPatch),
}

impl PatchOperation {
    /// Build an element patch from `fragment` and `options`.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::EmptyFragment`] when `fragment` is blank and the
    /// mode is not [`PatchMode::Remove`], [`PatchError::MissingTarget`] for a
    /// remove with neither selector nor fragment, and
    /// [`PatchError::LineBreak`] when the selector or event id spans lines.
    pub fn elements(
        fragment: impl Into<String>,
        options: &PatchElementsOptions,
    ) -> Result<Self, PatchError> {
        let fragment = fragment.into();
        let blank = fragment.trim().is_empty();

        match options.mode {
            PatchMode::Remove if blank && options.selector.is_none() => {
                return Err(PatchError::MissingTarget);
            }
            PatchMode::Remove => {}
            mode if blank => return Err(PatchError::EmptyFragment { mode }),
            _ => {}
        }

        check_single_line("selector", options.selector.as_deref())?;
        check_single_line("event id", options.event_id.as_deref())?;

        Ok(Self::Elements(ElementPatch {
            selector: options.selector.clone(),
            mode: options.mode,
            fragment,
            use_view_transition: options.use_view_transition,
            event_id: options.event_id.clone(),
            retry: options.retry,
        }))
    }

    /// Build a removal of the element matched by `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::MissingTarget`] for a blank selector and
    /// [`PatchError::LineBreak`] when the selector or event id spans lines.
    pub fn remove(
        selector: impl Into<String>,
        options: &RemoveElementOptions,
    ) -> Result<Self, PatchError> {
        let selector = selector.into();
        if selector.trim().is_empty() {
            return Err(PatchError::MissingTarget);
        }
        check_single_line("selector", Some(&selector))?;
        check_single_line("event id", options.event_id.as_deref())?;

        Ok(Self::Elements(ElementPatch {
            selector: Some(selector),
            mode: PatchMode::Remove,
            fragment: String::new(),
            use_view_transition: options.use_view_transition,
            event_id: options.event_id.clone(),
            retry: options.retry,
        }))
    }

    /// Build a signal patch from JSON object text.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::InvalidSignals`] when `payload` is not a JSON
    /// object and [`PatchError::LineBreak`] when the event id spans lines.
    pub fn signals(
        payload: impl Into<String>,
        options: &PatchSignalsOptions,
    ) -> Result<Self, PatchError> {
        let payload = payload.into();
        serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&payload)?;
        check_single_line("event id", options.event_id.as_deref())?;

        Ok(Self::Signals(SignalPatch {
            payload,
            only_if_missing: options.only_if_missing,
            event_id: options.event_id.clone(),
            retry: options.retry,
        }))
    }

    /// Build a patch that appends an autorun `<script>` to the document body.
    ///
    /// View transitions are always off for scripts.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::LineBreak`] when the event id spans lines.
    pub fn script(script: &str, options: &ExecuteScriptOptions) -> Result<Self, PatchError> {
        check_single_line("event id", options.event_id.as_deref())?;

        Ok(Self::Elements(ElementPatch {
            selector: Some(SCRIPT_TARGET_SELECTOR.to_owned()),
            mode: PatchMode::Append,
            fragment: script_fragment(script, options),
            use_view_transition: false,
            event_id: options.event_id.clone(),
            retry: options.retry,
        }))
    }

    /// The event kind this operation is written as.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Elements(_) => EventKind::PatchElements,
            Self::Signals(_) => EventKind::PatchSignals,
        }
    }

    /// Explicit event id, if any.
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Self::Elements(patch) => patch.event_id(),
            Self::Signals(patch) => patch.event_id(),
        }
    }

    /// Reconnect delay chosen by the caller, if any.
    pub const fn retry(&self) -> Option<Duration> {
        match self {
            Self::Elements(patch) => patch.retry(),
            Self::Signals(patch) => patch.retry(),
        }
    }
}

fn script_fragment(script: &str, options: &ExecuteScriptOptions) -> String {
    let mut fragment = String::from("<script");
    if options.auto_remove {
        fragment.push(' ');
        fragment.push_str(SCRIPT_AUTO_REMOVE_ATTRIBUTE);
    }
    for attribute in &options.attributes {
        fragment.push(' ');
        fragment.push_str(attribute);
    }
    fragment.push('>');
    fragment.push_str(script);
    fragment.push_str("</script>");
    fragment
}

fn check_single_line(field: &'static str, value: Option<&str>) -> Result<(), PatchError> {
    match value {
        Some(v) if v.contains(['\n', '\r']) => Err(PatchError::LineBreak { field }),
        _ => Ok(()),
    }
}
