//! Conditional ETag derivation.
//!
//! A transformed variant gets its own validator: the upstream tag body with
//! a hash of the accepted parameters appended. Pairs are sorted before
//! hashing so arrival order never changes the result.

use std::sync::OnceLock;

use regex::Regex;
use xxhash_rust::xxh64::xxh64;

use crate::params::RequestParams;

const ETAG_SHAPE: &str = r#"^(W/"|")(.*?)(")$"#;

fn etag_shape() -> Option<&'static Regex> {
    static SHAPE: OnceLock<Option<Regex>> = OnceLock::new();
    SHAPE.get_or_init(|| Regex::new(ETAG_SHAPE).ok()).as_ref()
}

/// Hash of the sorted, separator-less `name=value` pairs, as 16 lowercase hex digits.
pub fn params_digest(params: &RequestParams) -> String {
    let mut pairs: Vec<String> = params
        .first_values()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    pairs.sort();
    format!("{:016x}", xxh64(pairs.concat().as_bytes(), 0))
}

/// Derive the variant ETag from the upstream one.
///
/// Returns `None` when upstream sent no tag, the upstream tag unchanged when
/// it is not a quoted (optionally weak) entity tag, and
/// `<prefix><body>-<digest>"` otherwise.
pub fn derive_etag(upstream: &str, params: &RequestParams) -> Option<String> {
    if upstream.is_empty() {
        return None;
    }

    let Some(caps) = etag_shape().and_then(|re| re.captures(upstream)) else {
        return Some(upstream.to_string());
    };

    let prefix = caps.get(1).map_or("", |m| m.as_str());
    let body = caps.get(2).map_or("", |m| m.as_str());
    let close = caps.get(3).map_or("", |m| m.as_str());

    Some(format!("{prefix}{body}-{}{close}", params_digest(params)))
}
