//! pixelgate gateway library entry.
//!
//! This crate wires config, the security policy, the transform engine and the
//! image pipeline into an axum stack. It is consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod pipeline;
pub mod policy;
pub mod router;
pub mod transform;
pub mod transport;
