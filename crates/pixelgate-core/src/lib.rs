//! pixelgate core: transport-agnostic request parameter primitives.
//!
//! This crate defines the known transformation parameters, the constraint
//! registry and its built-in constraint kinds, and the conditional ETag
//! derivation shared by the gateway and its tests. It carries no HTTP or
//! runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Hostile query strings must surface as `PixelGateError`/`ConstraintError`
//! values, never as a crashed worker.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod constraint;
pub mod error;
pub mod etag;
pub mod params;
pub mod policy;

/// Shared result type.
pub use error::{ConstraintError, PixelGateError, Result};
pub use params::RequestParams;
pub use policy::{FailureMode, PolicyDecision};
