//! Upstream `Content-Encoding` handling.

use std::io::Read;

use bytes::Bytes;
use flate2::read::GzDecoder;

use pixelgate_core::error::{PixelGateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Zstd,
}

impl ContentEncoding {
    /// Absent or empty means identity. Anything unknown is refused before the
    /// body is touched.
    pub fn parse(header: Option<&str>) -> Result<Self> {
        let raw = header.map(str::trim).unwrap_or_default();
        if raw.is_empty() || raw.eq_ignore_ascii_case("identity") {
            return Ok(Self::Identity);
        }
        if raw.eq_ignore_ascii_case("gzip") || raw.eq_ignore_ascii_case("x-gzip") {
            return Ok(Self::Gzip);
        }
        if raw.eq_ignore_ascii_case("zstd") {
            return Ok(Self::Zstd);
        }
        Err(PixelGateError::UnsupportedEncoding(raw.to_string()))
    }
}

fn decode_sync(encoding: ContentEncoding, body: Bytes) -> Result<Bytes> {
    match encoding {
        ContentEncoding::Identity => Ok(body),
        ContentEncoding::Gzip => {
            let mut out = Vec::with_capacity(body.len() * 2);
            GzDecoder::new(body.as_ref())
                .read_to_end(&mut out)
                .map_err(|e| PixelGateError::Decode(format!("gzip: {e}")))?;
            Ok(Bytes::from(out))
        }
        ContentEncoding::Zstd => zstd::stream::decode_all(body.as_ref())
            .map(Bytes::from)
            .map_err(|e| PixelGateError::Decode(format!("zstd: {e}"))),
    }
}

/// Decode `body` according to the upstream `Content-Encoding` header.
pub async fn decode_body(header: Option<&str>, body: Bytes) -> Result<Bytes> {
    let encoding = ContentEncoding::parse(header)?;
    if encoding == ContentEncoding::Identity {
        return Ok(body);
    }
    tokio::task::spawn_blocking(move || decode_sync(encoding, body))
        .await
        .map_err(|e| PixelGateError::Internal(format!("decode task failed: {e}")))?
}
