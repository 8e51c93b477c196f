//! Protocol engine for Datastar server-sent events.
//!
//! This crate turns patch operations into event-stream frames, reads client
//! signals from a request, and resolves dotted paths inside them. It knows
//! nothing about any HTTP framework: hosts plug in through the
//! [`SignalSource`] and [`StreamTransport`] traits.
//!
//! # Modules
//!
//! - [`binding`] -- Scalar-by-name and structured-by-path signal binding.
//! - [`config`] -- Configuration loading from YAML with environment
//!   overrides.
//! - [`encoder`] -- [`PatchEncoder`], the event-stream framing.
//! - [`error`] -- [`SignalsError`] and [`SessionError`].
//! - [`path`] -- [`SignalPath`] and dotted-path resolution over JSON.
//! - [`session`] -- [`Session`], one outbound stream per request.
//! - [`signals`] -- [`SignalReader`] and the [`SignalSource`] trait.
//! - [`transport`] -- [`StreamHead`] and the [`StreamTransport`] trait.

pub mod binding;
pub mod config;
pub mod encoder;
pub mod error;
pub mod path;
pub mod session;
pub mod signals;
pub mod transport;

pub use binding::SignalBinding;
pub use config::{ConfigError, DatastarConfig};
pub use encoder::PatchEncoder;
pub use error::{SessionError, SignalsError};
pub use path::{PathError, ResolveError, SignalPath};
pub use session::Session;
pub use signals::{SignalReader, SignalSource};
pub use transport::{PipeTransport, StreamHead, StreamTransport};
