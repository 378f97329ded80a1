//! pixelgate gateway
//!
//! - Static files from `gateway.root`, transformed on the fly from query params
//! - Parameter security policy (allow/deny lists, constraints)
//! - `/healthz`, `/metrics`
//!
//! Config path: first argument, else `PIXELGATE_CONFIG`, else `pixelgate.yaml`.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use pixelgate_core::constraint::{registry, ConstraintRegistry};
use pixelgate_core::error::{PixelGateError, Result};
use pixelgate_gateway::transform::RasterTransformer;
use pixelgate_gateway::{app_state, config, router};

const DEFAULT_CONFIG: &str = "pixelgate.yaml";

fn config_path() -> String {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PIXELGATE_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string())
}

async fn run() -> Result<()> {
    // must happen before any constraint is decoded
    registry::install(ConstraintRegistry::with_builtin())?;

    let path = config_path();
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.gateway.listen.parse().map_err(|e| {
        PixelGateError::Config(format!("gateway.listen must be a valid SocketAddr: {e}"))
    })?;

    let state = app_state::AppState::new(cfg, Arc::new(RasterTransformer::new()))?;
    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "pixelgate starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| PixelGateError::Internal(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| PixelGateError::Internal(format!("server failed: {e}")))
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "pixelgate stopped");
        std::process::exit(1);
    }
}
