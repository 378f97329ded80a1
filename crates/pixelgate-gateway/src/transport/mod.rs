//! HTTP transport glue.
//!
//! The image processor is an axum middleware: it lets the inner service
//! produce the upstream response, then buffers and rewrites it.

pub mod middleware;
