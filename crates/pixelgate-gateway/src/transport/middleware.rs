//! `image_processor` middleware (axum `from_fn_with_state`).
//!
//! - no query string: not buffered, not touched
//! - upstream non-200 or larger than `gateway.max_body_bytes`: not buffered
//!   (a body that only turns out too large while streaming is replayed as is)
//! - otherwise: buffer, run the [`Pipeline`](crate::pipeline::Pipeline), render

use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures_util::{stream, StreamExt};

use pixelgate_core::params::RequestParams;

use crate::app_state::AppState;
use crate::pipeline::{response, UpstreamResponse};

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

enum Buffered {
    Complete(Bytes),
    /// Over the limit: the frames read so far chained with the unread rest.
    Overflow(Body),
}

/// Collect `body` up to `limit` bytes without losing anything on overflow.
async fn buffer_body(body: Body, limit: usize) -> Result<Buffered, axum::Error> {
    let mut frames = body.into_data_stream();
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut total = 0usize;

    while let Some(chunk) = frames.next().await {
        let chunk = chunk?;
        total = total.saturating_add(chunk.len());
        chunks.push(chunk);
        if total > limit {
            let read = stream::iter(chunks.into_iter().map(Ok::<_, axum::Error>));
            return Ok(Buffered::Overflow(Body::from_stream(read.chain(frames))));
        }
    }

    if chunks.len() == 1 {
        return Ok(Buffered::Complete(chunks.swap_remove(0)));
    }
    let mut buf = BytesMut::with_capacity(total);
    for c in &chunks {
        buf.extend_from_slice(c);
    }
    Ok(Buffered::Complete(buf.freeze()))
}

#[tracing::instrument(name = "image_processor", skip_all, fields(path = %req.uri().path()))]
pub async fn image_processor(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if req.uri().query().map_or(true, str::is_empty) {
        return next.run(req).await;
    }

    let params = match Query::<Vec<(String, String)>>::try_from_uri(req.uri()) {
        Ok(Query(pairs)) => RequestParams::from_pairs(pairs),
        Err(e) => {
            tracing::debug!(error = %e, "malformed query string");
            return (StatusCode::BAD_REQUEST, format!("invalid query string: {e}")).into_response();
        }
    };
    let if_none_match = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let res = next.run(req).await;
    if res.status() != StatusCode::OK {
        return res;
    }

    let limit = state.cfg().gateway.max_body_bytes;
    if content_length(res.headers()).is_some_and(|len| len > limit) {
        tracing::debug!(limit, "upstream body over limit, not buffering");
        return res;
    }

    let (parts, body) = res.into_parts();
    let bytes = match buffer_body(body, limit).await {
        Ok(Buffered::Complete(b)) => b,
        Ok(Buffered::Overflow(replay)) => {
            tracing::debug!(limit, "upstream body over limit while streaming, passing through");
            return Response::from_parts(parts, replay);
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to buffer upstream body");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to read upstream body")
                .into_response();
        }
    };

    let metrics = state.metrics();
    let upstream = UpstreamResponse::new(parts.status, parts.headers.clone(), bytes.clone());
    let outcome = match state
        .pipeline()
        .process(params, if_none_match.as_deref(), &upstream)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, "image pipeline failed, serving upstream response");
            metrics
                .pipeline_errors
                .inc(&[("code", e.client_code().as_str())]);
            metrics.pipeline_outcomes.inc(&[("outcome", "error")]);
            return response::passthrough(parts, bytes);
        }
    };

    metrics.pipeline_outcomes.inc(&[("outcome", outcome.as_str())]);
    response::render(outcome, parts, bytes)
}
