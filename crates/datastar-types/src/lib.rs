//! Protocol vocabulary for Datastar server-sent events.
//!
//! This crate is the single source of truth for the values that appear on
//! the wire: event names, data-line keys, patch modes, defaults, and the
//! [`PatchOperation`] variant that the encoder in `datastar-core` consumes.
//! It performs no I/O.
//!
//! # Modules
//!
//! - [`consts`] -- Wire constants and protocol defaults
//! - [`enums`] -- [`PatchMode`] and [`EventKind`] with their wire tokens
//! - [`options`] -- Caller-facing option structs for each operation
//! - [`patch`] -- [`PatchOperation`] and its validating constructors

pub mod consts;
pub mod enums;
pub mod options;
pub mod patch;

// Re-export all public types at crate root for convenience.
pub use enums::{EventKind, PatchMode};
pub use options::{
    ExecuteScriptOptions, PatchElementsOptions, PatchSignalsOptions, RemoveElementOptions,
};
pub use patch::{ElementPatch, PatchError, PatchOperation, SignalPatch};
