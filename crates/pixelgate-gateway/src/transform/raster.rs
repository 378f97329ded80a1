//! Pure-Rust raster engine on top of the `image` crate.
//!
//! Order of operations: orient, extract area, resize, zoom, mirror, rotate,
//! filters, encode. Decoding and encoding are CPU-bound and run on the
//! blocking pool.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Frame, ImageDecoder, ImageFormat, ImageReader, Rgb, RgbImage, Rgba, RgbaImage};

use pixelgate_core::error::{PixelGateError, Result};

use super::options::{Color, ImageType, TransformOptions};
use super::ImageTransformer;

/// Largest edge the engine will produce.
pub const MAX_DIMENSION: u32 = 16_384;
/// Largest total pixel count of any intermediate or output image (~8K x 5K).
pub const MAX_PIXELS: u64 = 40_000_000;
/// Gaussian kernel size grows with sigma; anything above this is refused.
pub const MAX_BLUR_SIGMA: f64 = 100.0;

const DEFAULT_JPEG_QUALITY: u8 = 80;
const JPEG_MATTE: Color = Color::rgb(255, 255, 255);
const EMBED_BACKGROUND: Color = Color::rgb(0, 0, 0);

#[derive(Debug, Clone, Default)]
pub struct RasterTransformer;

impl RasterTransformer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageTransformer for RasterTransformer {
    async fn transform(&self, image: Bytes, options: &TransformOptions) -> Result<Bytes> {
        let options = options.clone();
        tokio::task::spawn_blocking(move || process(&image, &options))
            .await
            .map_err(|e| PixelGateError::Internal(format!("transform task failed: {e}")))?
    }

    fn mime_type(&self, image: &[u8]) -> Option<String> {
        image::guess_format(image)
            .ok()
            .map(|f| f.to_mime_type().to_string())
    }
}

fn img_err(e: image::ImageError) -> PixelGateError {
    PixelGateError::Transform(e.to_string())
}

/// Synchronous transform of one encoded image.
pub fn process(input: &[u8], o: &TransformOptions) -> Result<Bytes> {
    let reader = ImageReader::new(Cursor::new(input))
        .with_guessed_format()
        .map_err(|e| PixelGateError::Transform(e.to_string()))?;
    let input_format = reader
        .format()
        .ok_or_else(|| PixelGateError::Transform("unrecognized image format".into()))?;

    let mut decoder = reader.into_decoder().map_err(img_err)?;
    let orientation = if o.no_auto_rotate {
        None
    } else {
        decoder.orientation().ok()
    };
    let mut img = DynamicImage::from_decoder(decoder).map_err(img_err)?;
    if let Some(orientation) = orientation {
        img.apply_orientation(orientation);
    }

    if o.area_width > 0 && o.area_height > 0 {
        img = img.crop_imm(
            non_negative(o.left),
            non_negative(o.top),
            non_negative(o.area_width),
            non_negative(o.area_height),
        );
    }

    img = resize(img, o)?;

    if o.zoom > 1 {
        let factor = non_negative(o.zoom);
        let (w, h) = (
            img.width().saturating_mul(factor),
            img.height().saturating_mul(factor),
        );
        ensure_dimensions(w, h)?;
        img = img.resize_exact(w, h, FilterType::Nearest);
    }

    if o.flip {
        img = img.flipv();
    }
    if o.flop {
        img = img.fliph();
    }

    img = match o.rotate {
        0 => img,
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        other => {
            return Err(PixelGateError::Transform(format!(
                "rotation by {other} degrees is not supported"
            )))
        }
    };

    if o.blur_sigma > 0.0 {
        if o.blur_sigma > MAX_BLUR_SIGMA {
            return Err(PixelGateError::Transform(format!(
                "blur sigma {} exceeds {MAX_BLUR_SIGMA}",
                o.blur_sigma
            )));
        }
        img = img.blur(o.blur_sigma as f32);
    }
    if o.brightness != 0.0 {
        img = img.brighten(o.brightness.round() as i32);
    }
    if o.contrast != 0.0 {
        img = img.adjust_contrast(o.contrast as f32);
    }
    if o.gamma > 0.0 && o.gamma != 1.0 {
        img = apply_gamma(&img, o.gamma);
    }

    let format = o.format.unwrap_or_else(|| output_type(input_format));
    encode(&img, format, o)
}

fn non_negative(v: i32) -> u32 {
    u32::try_from(v).unwrap_or(0)
}

fn positive(v: i32) -> Option<u32> {
    u32::try_from(v).ok().filter(|v| *v > 0)
}

fn ensure_dimensions(w: u32, h: u32) -> Result<()> {
    if w > MAX_DIMENSION || h > MAX_DIMENSION {
        return Err(PixelGateError::Transform(format!(
            "requested size {w}x{h} exceeds {MAX_DIMENSION}px"
        )));
    }
    let pixels = u64::from(w) * u64::from(h);
    if pixels > MAX_PIXELS {
        return Err(PixelGateError::Transform(format!(
            "requested size {w}x{h} ({pixels} pixels) exceeds {MAX_PIXELS} pixels"
        )));
    }
    Ok(())
}

/// Size `resize_to_fill` scales to before cropping back to `tw`x`th`.
fn fill_dimensions(cw: u32, ch: u32, tw: u32, th: u32) -> (u32, u32) {
    let (cw64, ch64) = (u64::from(cw.max(1)), u64::from(ch.max(1)));
    // compare tw/cw against th/ch without floats
    if u64::from(tw) * ch64 >= u64::from(th) * cw64 {
        (tw, scaled(ch, tw, cw))
    } else {
        (scaled(cw, th, ch), th)
    }
}

/// `other * target / this`, at least 1.
fn scaled(other: u32, target: u32, this: u32) -> u32 {
    let v = u64::from(other) * u64::from(target) / u64::from(this.max(1));
    u32::try_from(v).unwrap_or(u32::MAX).max(1)
}

fn resize(img: DynamicImage, o: &TransformOptions) -> Result<DynamicImage> {
    let (cw, ch) = (img.width(), img.height());
    let (tw, th) = match (positive(o.width), positive(o.height)) {
        (None, None) => return Ok(img),
        (Some(w), None) => (w, scaled(ch, w, cw)),
        (None, Some(h)) => (scaled(cw, h, ch), h),
        (Some(w), Some(h)) => (w, h),
    };
    ensure_dimensions(tw, th)?;

    if !o.enlarge && !o.force && (tw > cw || th > ch) {
        return Ok(img);
    }

    let both = o.width > 0 && o.height > 0;
    let out = if o.force || !both {
        img.resize_exact(tw, th, FilterType::Lanczos3)
    } else if o.crop {
        let (fw, fh) = fill_dimensions(cw, ch, tw, th);
        ensure_dimensions(fw, fh)?;
        img.resize_to_fill(tw, th, FilterType::Lanczos3)
    } else if o.embed {
        embed(&img, tw, th, o.background.unwrap_or(EMBED_BACKGROUND))
    } else {
        img.resize(tw, th, FilterType::Lanczos3)
    };
    Ok(out)
}

/// Fit inside `w`x`h` and center on a solid canvas.
fn embed(img: &DynamicImage, w: u32, h: u32, bg: Color) -> DynamicImage {
    let fitted = img.resize(w, h, FilterType::Lanczos3).to_rgba8();
    let mut canvas = RgbaImage::from_pixel(w, h, Rgba([bg.r, bg.g, bg.b, 255]));
    let x = i64::from((w - fitted.width().min(w)) / 2);
    let y = i64::from((h - fitted.height().min(h)) / 2);
    imageops::overlay(&mut canvas, &fitted, x, y);
    DynamicImage::ImageRgba8(canvas)
}

fn apply_gamma(img: &DynamicImage, gamma: f64) -> DynamicImage {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        let v = 255.0 * (i as f64 / 255.0).powf(1.0 / gamma);
        *slot = v.round().clamp(0.0, 255.0) as u8;
    }
    let mut buf = img.to_rgba8();
    for p in buf.pixels_mut() {
        for c in 0..3 {
            p[c] = lut[usize::from(p[c])];
        }
    }
    DynamicImage::ImageRgba8(buf)
}

/// Composite onto `matte` and drop the alpha channel.
fn flatten(img: &DynamicImage, matte: Color) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let blend = |c: u8, m: u8, a: u8| -> u8 {
        let (c, m, a) = (u32::from(c), u32::from(m), u32::from(a));
        u8::try_from((c * a + m * (255 - a)) / 255).unwrap_or(u8::MAX)
    };
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        Rgb([
            blend(p[0], matte.r, p[3]),
            blend(p[1], matte.g, p[3]),
            blend(p[2], matte.b, p[3]),
        ])
    })
}

fn output_type(input: ImageFormat) -> ImageType {
    match input {
        ImageFormat::Jpeg => ImageType::Jpeg,
        ImageFormat::Gif => ImageType::Gif,
        ImageFormat::WebP => ImageType::Webp,
        _ => ImageType::Png,
    }
}

fn png_compression(level: i32) -> CompressionType {
    match level {
        1..=3 => CompressionType::Fast,
        7..=9 => CompressionType::Best,
        _ => CompressionType::Default,
    }
}

fn encode(img: &DynamicImage, format: ImageType, o: &TransformOptions) -> Result<Bytes> {
    let mut out: Vec<u8> = Vec::new();
    match format {
        ImageType::Jpeg => {
            let quality = u8::try_from(o.quality)
                .ok()
                .filter(|q| (1..=100).contains(q))
                .unwrap_or(DEFAULT_JPEG_QUALITY);
            let rgb = flatten(img, o.background.unwrap_or(JPEG_MATTE));
            DynamicImage::ImageRgb8(rgb)
                .write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
                .map_err(img_err)?;
        }
        ImageType::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut out,
                png_compression(o.compression),
                PngFilter::Adaptive,
            );
            img.write_with_encoder(encoder).map_err(img_err)?;
        }
        ImageType::Webp => {
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_with_encoder(WebPEncoder::new_lossless(&mut out))
                .map_err(img_err)?;
        }
        ImageType::Gif => {
            let mut encoder = GifEncoder::new(&mut out);
            encoder
                .encode_frame(Frame::new(img.to_rgba8()))
                .map_err(img_err)?;
        }
        ImageType::Avif => {
            return Err(PixelGateError::Transform(
                "avif output is not supported by the raster engine".into(),
            ))
        }
    }
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([200, 10, 10, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn dims(encoded: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(encoded).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn resize_by_width_keeps_aspect() {
        let o = TransformOptions {
            width: 20,
            ..TransformOptions::default()
        };
        let out = process(&png(40, 20), &o).unwrap();
        assert_eq!(dims(&out), (20, 10));
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn no_upscale_without_enlarge() {
        let o = TransformOptions {
            width: 80,
            ..TransformOptions::default()
        };
        assert_eq!(dims(&process(&png(40, 20), &o).unwrap()), (40, 20));

        let o = TransformOptions {
            width: 80,
            enlarge: true,
            ..TransformOptions::default()
        };
        assert_eq!(dims(&process(&png(40, 20), &o).unwrap()), (80, 40));
    }

    #[test]
    fn crop_fills_exact_box() {
        let o = TransformOptions {
            width: 10,
            height: 10,
            crop: true,
            ..TransformOptions::default()
        };
        assert_eq!(dims(&process(&png(40, 20), &o).unwrap()), (10, 10));
    }

    #[test]
    fn rotate_and_convert() {
        let o = TransformOptions {
            rotate: 90,
            format: Some(ImageType::Jpeg),
            ..TransformOptions::default()
        };
        let out = process(&png(40, 20), &o).unwrap();
        assert_eq!(dims(&out), (20, 40));
        assert_eq!(
            RasterTransformer::new().mime_type(&out).as_deref(),
            Some("image/jpeg")
        );
    }

    #[test]
    fn diagonal_rotation_is_a_transform_error() {
        let o = TransformOptions {
            rotate: 45,
            ..TransformOptions::default()
        };
        assert!(matches!(
            process(&png(4, 4), &o),
            Err(PixelGateError::Transform(_))
        ));
    }

    #[test]
    fn oversized_request_is_refused() {
        let o = TransformOptions {
            width: 100_000,
            enlarge: true,
            ..TransformOptions::default()
        };
        assert!(process(&png(4, 4), &o).is_err());
    }

    #[test]
    fn huge_blur_sigma_is_refused_before_allocating() {
        let o = TransformOptions {
            blur_sigma: 1e9,
            ..TransformOptions::default()
        };
        assert!(matches!(
            process(&png(8, 8), &o),
            Err(PixelGateError::Transform(ref m)) if m.contains("blur sigma")
        ));

        let o = TransformOptions {
            blur_sigma: MAX_BLUR_SIGMA,
            ..TransformOptions::default()
        };
        assert_eq!(dims(&process(&png(8, 8), &o).unwrap()), (8, 8));
    }

    #[test]
    fn embed_canvas_is_bounded_by_total_pixels() {
        // each edge is within MAX_DIMENSION, the area is not
        let o = TransformOptions {
            width: 16_384,
            height: 16_384,
            enlarge: true,
            embed: true,
            ..TransformOptions::default()
        };
        assert!(matches!(
            process(&png(8, 8), &o),
            Err(PixelGateError::Transform(ref m)) if m.contains("pixels")
        ));
    }

    #[test]
    fn zoom_output_is_bounded_by_total_pixels() {
        let o = TransformOptions {
            width: 5000,
            height: 1000,
            force: true,
            zoom: 3,
            ..TransformOptions::default()
        };
        assert!(matches!(
            process(&png(8, 8), &o),
            Err(PixelGateError::Transform(ref m)) if m.contains("pixels")
        ));
    }

    #[test]
    fn crop_intermediate_is_bounded() {
        // filling 10000x1 from a 1x40 strip needs a 10000x400000 intermediate
        let o = TransformOptions {
            width: 10_000,
            height: 1,
            crop: true,
            enlarge: true,
            ..TransformOptions::default()
        };
        assert!(process(&png(1, 40), &o).is_err());
        assert_eq!(fill_dimensions(40, 20, 10, 10), (20, 10));
    }

    #[test]
    fn flatten_blends_alpha_onto_matte() {
        let mut rgba = RgbaImage::new(3, 1);
        rgba.put_pixel(0, 0, Rgba([255, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([255, 0, 0, 255]));
        rgba.put_pixel(2, 0, Rgba([0, 0, 0, 128]));
        let out = flatten(&DynamicImage::ImageRgba8(rgba), Color::rgb(255, 255, 255));
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(2, 0), &Rgb([127, 127, 127]));
    }

    #[test]
    fn garbage_input_is_a_transform_error() {
        let o = TransformOptions::default();
        assert!(matches!(
            process(b"definitely not an image", &o),
            Err(PixelGateError::Transform(_))
        ));
    }

    #[tokio::test]
    async fn async_transform_runs_on_blocking_pool() {
        let o = TransformOptions {
            height: 10,
            format: Some(ImageType::Webp),
            ..TransformOptions::default()
        };
        let t = RasterTransformer::new();
        let out = t.transform(Bytes::from(png(40, 20)), &o).await.unwrap();
        assert_eq!(t.mime_type(&out).as_deref(), Some("image/webp"));
        assert_eq!(dims(&out), (20, 10));
    }
}
