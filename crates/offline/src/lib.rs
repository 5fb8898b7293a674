//! Deduplicated offline-mode reporting.
//!
//! Independent call sites (session bootstrap, machine registration, push
//! token fetch) report failures into one shared [`OfflineState`]. Failures
//! arriving shortly after the first one of an outage are folded into a single
//! consolidated warning; later ones are recorded silently until
//! [`OfflineState::recover`] re-arms it.

pub mod aggregator;
pub mod describe;
pub mod failure;

pub use aggregator::{
    OfflineMode, OfflineState, StdoutSink, WarningSink, DEFAULT_BACKEND, DEFAULT_FLUSH_WINDOW,
};
pub use describe::describe_error_code;
pub use failure::OfflineFailure;
