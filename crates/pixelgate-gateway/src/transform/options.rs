//! Query parameters → structured transform options.

use pixelgate_core::error::{PixelGateError, Result};
use pixelgate_core::params::RequestParams;

/// Rotation angles accepted by `r`.
pub const ROTATIONS: [u16; 7] = [45, 90, 135, 180, 235, 270, 315];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn named(name: &str) -> Option<Self> {
        let c = match name {
            "white" => Self::rgb(255, 255, 255),
            "black" => Self::rgb(0, 0, 0),
            "red" => Self::rgb(255, 0, 0),
            "magenta" => Self::rgb(255, 0, 255),
            "blue" => Self::rgb(0, 0, 255),
            "cyan" => Self::rgb(0, 255, 255),
            "green" => Self::rgb(0, 255, 0),
            "yellow" => Self::rgb(255, 255, 0),
            _ => return None,
        };
        Some(c)
    }

    fn hex(value: &str) -> Option<Self> {
        let digits = value.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Jpeg,
    Png,
    Gif,
    Webp,
    Avif,
}

impl ImageType {
    pub fn name(self) -> &'static str {
        match self {
            ImageType::Jpeg => "jpeg",
            ImageType::Png => "png",
            ImageType::Gif => "gif",
            ImageType::Webp => "webp",
            ImageType::Avif => "avif",
        }
    }
}

/// Option bag handed to the transform engine. Zero means "not requested"
/// for the numeric fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOptions {
    pub width: i32,
    pub height: i32,
    pub area_width: i32,
    pub area_height: i32,
    pub top: i32,
    pub left: i32,
    pub quality: i32,
    pub compression: i32,
    pub zoom: i32,
    pub crop: bool,
    pub enlarge: bool,
    pub embed: bool,
    pub flip: bool,
    pub flop: bool,
    pub force: bool,
    pub no_auto_rotate: bool,
    pub no_profile: bool,
    pub interlace: bool,
    pub strip_metadata: bool,
    pub trim: bool,
    pub lossless: bool,
    pub threshold: f64,
    pub gamma: f64,
    pub brightness: f64,
    pub contrast: f64,
    pub rotate: u16,
    pub blur_sigma: f64,
    pub background: Option<Color>,
    pub format: Option<ImageType>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            area_width: 0,
            area_height: 0,
            top: 0,
            left: 0,
            quality: 0,
            compression: 0,
            zoom: 0,
            crop: false,
            enlarge: false,
            embed: false,
            flip: false,
            flop: false,
            force: false,
            no_auto_rotate: false,
            no_profile: false,
            interlace: true,
            strip_metadata: true,
            trim: false,
            lossless: false,
            threshold: 0.0,
            gamma: 0.0,
            brightness: 0.0,
            contrast: 0.0,
            rotate: 0,
            blur_sigma: 0.0,
            background: None,
            format: None,
        }
    }
}

impl TransformOptions {
    /// Parse every known parameter present in `params`. Empty values are
    /// skipped; unknown names are ignored (they were filtered earlier).
    pub fn from_params(params: &RequestParams) -> Result<Self> {
        let mut o = Self::default();

        for (name, value) in params.first_values() {
            if value.is_empty() {
                continue;
            }
            match name {
                "h" => o.height = int(name, value)?,
                "w" => o.width = int(name, value)?,
                "ah" => o.area_height = int(name, value)?,
                "aw" => o.area_width = int(name, value)?,
                "t" => o.top = int(name, value)?,
                "l" => o.left = int(name, value)?,
                "q" => o.quality = int(name, value)?,
                "cp" => o.compression = int(name, value)?,
                "z" => o.zoom = int(name, value)?,
                "crop" => o.crop = boolean(name, value)?,
                "en" => o.enlarge = boolean(name, value)?,
                "em" => o.embed = boolean(name, value)?,
                "flip" => o.flip = boolean(name, value)?,
                "flop" => o.flop = boolean(name, value)?,
                "force" => o.force = boolean(name, value)?,
                "nar" => o.no_auto_rotate = boolean(name, value)?,
                "np" => o.no_profile = boolean(name, value)?,
                "itl" => o.interlace = boolean(name, value)?,
                "smd" => o.strip_metadata = boolean(name, value)?,
                "tr" => o.trim = boolean(name, value)?,
                "ll" => o.lossless = boolean(name, value)?,
                "th" => o.threshold = float(name, value)?,
                "g" => o.gamma = float(name, value)?,
                "br" => o.brightness = float(name, value)?,
                "c" => o.contrast = float(name, value)?,
                "b" => o.blur_sigma = float(name, value)?,
                "r" => o.rotate = rotation(name, value)?,
                "bg" => o.background = Some(color(name, value)?),
                "fm" => o.format = Some(image_type(name, value)?),
                _ => {}
            }
        }
        Ok(o)
    }
}

fn invalid(param: &str, reason: impl Into<String>) -> PixelGateError {
    PixelGateError::InvalidOption {
        param: param.to_string(),
        reason: reason.into(),
    }
}

fn int(param: &str, value: &str) -> Result<i32> {
    value
        .parse()
        .map_err(|_| invalid(param, format!("'{value}' is not an integer")))
}

fn float(param: &str, value: &str) -> Result<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(invalid(param, format!("'{value}' is not a number"))),
    }
}

fn boolean(param: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(invalid(param, format!("'{value}' is not a boolean"))),
    }
}

fn rotation(param: &str, value: &str) -> Result<u16> {
    let angle: u16 = value
        .parse()
        .map_err(|_| invalid(param, format!("'{value}' is not an integer")))?;
    if ROTATIONS.contains(&angle) {
        Ok(angle)
    } else {
        Err(invalid(
            param,
            "possible values are 45, 90, 135, 180, 235, 270, 315",
        ))
    }
}

fn color(param: &str, value: &str) -> Result<Color> {
    Color::named(value).or_else(|| Color::hex(value)).ok_or_else(|| {
        invalid(
            param,
            "possible values are white, black, red, magenta, blue, cyan, green, yellow or a #rrggbb hex string",
        )
    })
}

fn image_type(param: &str, value: &str) -> Result<ImageType> {
    match value {
        "jpg" | "jpeg" => Ok(ImageType::Jpeg),
        "png" => Ok(ImageType::Png),
        "gif" => Ok(ImageType::Gif),
        "webp" => Ok(ImageType::Webp),
        "avif" => Ok(ImageType::Avif),
        _ => Err(invalid(
            param,
            "possible values are jpg, jpeg, png, gif, webp, avif",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pairs: &[(&str, &str)]) -> Result<TransformOptions> {
        TransformOptions::from_params(&RequestParams::from_pairs(pairs.iter().copied()))
    }

    #[test]
    fn defaults() {
        let o = parse(&[]).unwrap();
        assert!(o.interlace);
        assert!(o.strip_metadata);
        assert_eq!(o.format, None);
    }

    #[test]
    fn parses_every_kind() {
        let o = parse(&[
            ("w", "320"),
            ("h", "200"),
            ("crop", "true"),
            ("smd", "0"),
            ("br", "-12.5"),
            ("r", "90"),
            ("bg", "#ff8000"),
            ("fm", "jpg"),
            ("b", "3"),
        ])
        .unwrap();
        assert_eq!((o.width, o.height), (320, 200));
        assert!(o.crop);
        assert!(!o.strip_metadata);
        assert_eq!(o.brightness, -12.5);
        assert_eq!(o.rotate, 90);
        assert_eq!(o.background, Some(Color::rgb(255, 128, 0)));
        assert_eq!(o.format, Some(ImageType::Jpeg));
        assert_eq!(o.blur_sigma, 3.0);
    }

    #[test]
    fn named_background() {
        let o = parse(&[("bg", "magenta")]).unwrap();
        assert_eq!(o.background, Some(Color::rgb(255, 0, 255)));
    }

    #[test]
    fn empty_values_are_skipped() {
        let o = parse(&[("w", ""), ("fm", "")]).unwrap();
        assert_eq!(o, TransformOptions::default());
    }

    #[test]
    fn rejects_bad_values() {
        for (k, v) in [
            ("r", "33"),
            ("fm", "bmp"),
            ("bg", "#zz0000"),
            ("bg", "#fff"),
            ("crop", "maybe"),
            ("w", "wide"),
            ("g", "NaN"),
        ] {
            let err = parse(&[(k, v)]).unwrap_err();
            assert!(
                matches!(err, PixelGateError::InvalidOption { ref param, .. } if param == k),
                "{k}={v} gave {err}"
            );
        }
    }
}
