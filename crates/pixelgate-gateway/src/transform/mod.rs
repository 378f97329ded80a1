//! Transform engine seam.
//!
//! The pipeline only knows [`ImageTransformer`]; [`RasterTransformer`] is the
//! pure-Rust engine wired in by the binary. Tests plug in their own.

pub mod options;
pub mod raster;

use async_trait::async_trait;
use bytes::Bytes;

use pixelgate_core::Result;

pub use options::{Color, ImageType, TransformOptions};
pub use raster::RasterTransformer;

#[async_trait]
pub trait ImageTransformer: Send + Sync {
    /// Apply `options` to the encoded `image`, returning the encoded result.
    async fn transform(&self, image: Bytes, options: &TransformOptions) -> Result<Bytes>;

    /// MIME type of an encoded image produced by [`ImageTransformer::transform`].
    fn mime_type(&self, image: &[u8]) -> Option<String>;
}
