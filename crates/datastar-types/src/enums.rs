//! Enumerations with fixed wire tokens.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Patch mode
// ---------------------------------------------------------------------------

/// How a patched element is applied to the existing DOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchMode {
    /// Morphs the element into the existing element.
    #[default]
    Outer,
    /// Replaces the inner HTML of the existing element.
    Inner,
    /// Removes the existing element.
    Remove,
    /// Replaces the existing element with the new element.
    Replace,
    /// Prepends the element inside the existing element.
    Prepend,
    /// Appends the element inside the existing element.
    Append,
    /// Inserts the element before the existing element.
    Before,
    /// Inserts the element after the existing element.
    After,
}

impl PatchMode {
    /// Every mode, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Outer,
        Self::Inner,
        Self::Remove,
        Self::Replace,
        Self::Prepend,
        Self::Append,
        Self::Before,
        Self::After,
    ];

    /// Lowercase token written on the `mode` data line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Outer => "outer",
            Self::Inner => "inner",
            Self::Remove => "remove",
            Self::Replace => "replace",
            Self::Prepend => "prepend",
            Self::Append => "append",
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl std::fmt::Display for PatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Event kind
// ---------------------------------------------------------------------------

/// The kind of event frame written to the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Patches HTML elements into the DOM.
    PatchElements,
    /// Patches client signals.
    PatchSignals,
}

impl EventKind {
    /// Event name written on the `event:` line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PatchElements => "datastar-patch-elements",
            Self::PatchSignals => "datastar-patch-signals",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
