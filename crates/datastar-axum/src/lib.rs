//! Axum host adapter for the Datastar protocol engine.
//!
//! Handlers take a [`DatastarRequest`] (or [`ReadSignals`] when they only
//! need signals) and answer with [`DatastarStream::run`]:
//!
//! ```rust,ignore
//! async fn counter(request: DatastarRequest) -> Response {
//!     DatastarStream::new(request)
//!         .run(|mut session| async move {
//!             let count: u64 = session.read_signal("count").await?;
//!             let patch = format!(r#"{{"count":{}}}"#, count + 1);
//!             session
//!                 .patch_signals(patch, &PatchSignalsOptions::default())
//!                 .await?;
//!             Ok::<(), SessionError>(())
//!         })
//!         .await
//! }
//! ```
//!
//! # Modules
//!
//! - [`error`] -- [`DatastarRejection`] and its HTTP mapping.
//! - [`extract`] -- The [`ReadSignals`] extractor.
//! - [`request`] -- [`DatastarRequest`], the request-side transport.
//! - [`stream`] -- [`DatastarStream`], the response-side transport.

pub mod error;
pub mod extract;
pub mod request;
pub mod stream;

pub use error::DatastarRejection;
pub use extract::ReadSignals;
pub use request::DatastarRequest;
pub use stream::{DatastarSession, DatastarStream};

pub use datastar_core::{DatastarConfig, SessionError, SignalBinding, SignalsError};
pub use datastar_types::{
    ExecuteScriptOptions, PatchElementsOptions, PatchMode, PatchSignalsOptions,
    RemoveElementOptions,
};
