//! Top-level facade crate for pixelgate.
//!
//! Re-exports the parameter/constraint core and the gateway library so users
//! can depend on a single crate.

pub mod core {
    pub use pixelgate_core::*;
}

pub mod gateway {
    pub use pixelgate_gateway::*;
}
