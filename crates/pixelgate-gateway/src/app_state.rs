//! Shared application state.
//!
//! Everything here is built once at startup and read concurrently by every
//! request task.

use std::sync::Arc;

use pixelgate_core::error::Result;

use crate::config::GatewayConfig;
use crate::obs::GatewayMetrics;
use crate::pipeline::Pipeline;
use crate::transform::ImageTransformer;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    pipeline: Pipeline,
    metrics: Arc<GatewayMetrics>,
}

impl AppState {
    /// Validate `cfg` and build the pipeline around `transformer`.
    pub fn new(cfg: GatewayConfig, transformer: Arc<dyn ImageTransformer>) -> Result<Self> {
        cfg.validate()?;

        let metrics = Arc::new(GatewayMetrics::default());
        let ip = &cfg.image_processor;
        let pipeline = Pipeline::new(ip.on_fail, ip.security.clone(), transformer)
            .with_metrics(Arc::clone(&metrics));

        tracing::info!(
            on_fail = ?ip.on_fail,
            security = ip.security.is_some(),
            "image pipeline ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                pipeline,
                metrics,
            }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.inner.metrics)
    }
}
