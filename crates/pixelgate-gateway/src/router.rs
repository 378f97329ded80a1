//! Axum router wiring.
//!
//! `/healthz` and `/metrics` are served directly; every other path is a file
//! under `gateway.root`, passed through the image processor.

use axum::{middleware, routing::get, Router};
use tower_http::services::ServeDir;

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    let files = Router::new().fallback_service(ServeDir::new(&state.cfg().gateway.root));

    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .with_state(state.clone())
        .merge(with_image_processor(files, state))
}

/// Wrap any upstream router with the image processor.
pub fn with_image_processor(upstream: Router, state: AppState) -> Router {
    upstream.layer(middleware::from_fn_with_state(
        state,
        transport::middleware::image_processor,
    ))
}
