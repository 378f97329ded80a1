//! Turning an [`Outcome`] back into an HTTP response.

use axum::body::Body;
use axum::http::{header, response::Parts, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use super::Outcome;

/// Rebuild the upstream response untouched.
pub fn passthrough(parts: Parts, body: Bytes) -> Response {
    Response::from_parts(parts, Body::from(body))
}

fn plain_text(status: StatusCode, message: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message,
    )
        .into_response()
}

/// Render `outcome` against the upstream head and (original) body.
pub fn render(outcome: Outcome, mut parts: Parts, upstream_body: Bytes) -> Response {
    match outcome {
        Outcome::PassThrough => passthrough(parts, upstream_body),
        Outcome::NotModified { etag } => {
            let mut res = StatusCode::NOT_MODIFIED.into_response();
            if let Ok(v) = HeaderValue::from_str(&etag) {
                res.headers_mut().insert(header::ETAG, v);
            }
            res
        }
        Outcome::ClientError(reason) => {
            plain_text(StatusCode::BAD_REQUEST, format!("request aborted: {reason}"))
        }
        Outcome::ServerError(message) => plain_text(StatusCode::INTERNAL_SERVER_ERROR, message),
        Outcome::Transformed {
            body,
            content_type,
            etag,
        } => {
            // the body is no longer the upstream entity
            for name in [
                header::CONTENT_TYPE,
                header::CONTENT_LENGTH,
                header::CONTENT_ENCODING,
                header::VARY,
                header::ETAG,
            ] {
                parts.headers.remove(name);
            }
            if let Ok(v) = HeaderValue::from_str(&content_type) {
                parts.headers.insert(header::CONTENT_TYPE, v);
            }
            parts
                .headers
                .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
            if let Some(v) = etag.and_then(|t| HeaderValue::from_str(&t).ok()) {
                parts.headers.insert(header::ETAG, v);
            }
            parts.status = StatusCode::OK;
            Response::from_parts(parts, Body::from(body))
        }
    }
}
