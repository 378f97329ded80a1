//! Parameter security policy (allow-list, deny-list, constraints).
//!
//! Configured once at startup, validated, then shared read-only by every
//! request through the pipeline.

pub mod allowlist;
pub mod engine;

pub use engine::SecurityPolicy;
pub use pixelgate_core::policy::{FailureMode, PolicyDecision};
