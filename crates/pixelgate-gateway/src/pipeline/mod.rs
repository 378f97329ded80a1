//! Per-request image pipeline.
//!
//! Flow:
//! - upstream not 200 or empty body -> pass through
//! - decode `Content-Encoding` (unsupported -> hard error)
//! - keep known params only (none left -> pass through)
//! - security policy (bypass -> pass through, abort -> 400)
//! - conditional ETag (`If-None-Match` hit -> 304)
//! - parse options, transform (failure -> `on_fail`)

pub mod decode;
pub mod response;

use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use pixelgate_core::error::{PixelGateError, Result};
use pixelgate_core::etag::derive_etag;
use pixelgate_core::params::RequestParams;
use pixelgate_core::policy::PolicyDecision;

use crate::obs::GatewayMetrics;
use crate::policy::SecurityPolicy;
use crate::transform::{ImageTransformer, TransformOptions};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// What to do when options cannot be parsed or the transform fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnFail {
    /// Answer 500 with the error message.
    Abort,
    /// Serve the upstream response unchanged.
    #[default]
    Bypass,
}

/// Buffered upstream response as seen by the pipeline.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn is_transformable(&self) -> bool {
        self.status == StatusCode::OK && !self.body.is_empty()
    }

    pub fn header_str(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    PassThrough,
    NotModified {
        etag: String,
    },
    ClientError(String),
    ServerError(String),
    Transformed {
        body: Bytes,
        content_type: String,
        etag: Option<String>,
    },
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::PassThrough => "pass_through",
            Outcome::NotModified { .. } => "not_modified",
            Outcome::ClientError(_) => "client_error",
            Outcome::ServerError(_) => "server_error",
            Outcome::Transformed { .. } => "transformed",
        }
    }
}

/// Keeps `transforms_inflight` honest when the request future is dropped.
struct InflightGuard<'a> {
    metrics: &'a GatewayMetrics,
}

impl<'a> InflightGuard<'a> {
    fn enter(metrics: &'a GatewayMetrics) -> Self {
        metrics.transforms_inflight.inc(&[]);
        Self { metrics }
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.metrics.transforms_inflight.dec(&[]);
    }
}

pub struct Pipeline {
    on_fail: OnFail,
    security: Option<Arc<SecurityPolicy>>,
    transformer: Arc<dyn ImageTransformer>,
    metrics: Arc<GatewayMetrics>,
}

impl Pipeline {
    pub fn new(
        on_fail: OnFail,
        security: Option<SecurityPolicy>,
        transformer: Arc<dyn ImageTransformer>,
    ) -> Self {
        Self {
            on_fail,
            security: security.map(Arc::new),
            transformer,
            metrics: Arc::new(GatewayMetrics::default()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run one request through the pipeline.
    ///
    /// `Err` is reserved for hard errors (unsupported or corrupt
    /// `Content-Encoding`); every other failure resolves into an [`Outcome`].
    pub async fn process(
        &self,
        mut params: RequestParams,
        if_none_match: Option<&str>,
        upstream: &UpstreamResponse,
    ) -> Result<Outcome> {
        if params.is_empty() || !upstream.is_transformable() {
            return Ok(Outcome::PassThrough);
        }

        let body = decode::decode_body(
            upstream.header_str(&header::CONTENT_ENCODING),
            upstream.body.clone(),
        )
        .await?;

        params.retain_known();
        if params.is_empty() {
            return Ok(Outcome::PassThrough);
        }

        if let Some(policy) = &self.security {
            let decision = policy.evaluate(&mut params);
            self.metrics
                .policy_decisions
                .inc(&[("decision", decision.as_str())]);
            match decision {
                PolicyDecision::Pass => {}
                PolicyDecision::Bypass => return Ok(Outcome::PassThrough),
                PolicyDecision::Reject { param, reason } => {
                    tracing::info!(%param, %reason, "request rejected by security policy");
                    return Ok(Outcome::ClientError(reason));
                }
            }
            if params.is_empty() {
                return Ok(Outcome::PassThrough);
            }
        }

        let etag = upstream
            .header_str(&header::ETAG)
            .and_then(|tag| derive_etag(tag, &params));
        if let (Some(etag), Some(wanted)) = (&etag, if_none_match) {
            if wanted.trim() == etag {
                return Ok(Outcome::NotModified { etag: etag.clone() });
            }
        }

        let options = match TransformOptions::from_params(&params) {
            Ok(o) => o,
            Err(e) => return Ok(self.fail(e)),
        };

        let started = Instant::now();
        let result = {
            let _inflight = InflightGuard::enter(&self.metrics);
            self.transformer.transform(body, &options).await
        };
        self.metrics
            .transform_duration
            .observe(&[], started.elapsed());

        match result {
            Ok(out) => {
                let content_type = self
                    .transformer
                    .mime_type(&out)
                    .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
                tracing::debug!(bytes = out.len(), %content_type, "image transformed");
                Ok(Outcome::Transformed {
                    body: out,
                    content_type,
                    etag,
                })
            }
            Err(e) => Ok(self.fail(e)),
        }
    }

    fn fail(&self, err: PixelGateError) -> Outcome {
        self.metrics
            .pipeline_errors
            .inc(&[("code", err.client_code().as_str())]);
        match self.on_fail {
            OnFail::Bypass => {
                tracing::warn!(error = %err, "image transform failed, serving original");
                Outcome::PassThrough
            }
            OnFail::Abort => {
                tracing::error!(error = %err, "image transform failed");
                Outcome::ServerError(err.to_string())
            }
        }
    }
}
