//! Image decoding and resizing to the working resolution.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces an RGB
//! image at the configured canonical size (640x480 by default). Every
//! downstream kernel size and area band is tuned for that resolution, so
//! the resize always happens, even when it distorts the aspect ratio.

use std::fmt;

use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, InspectionError};

/// Resampling filter used when resizing to the working resolution.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl ResizeFilter {
    const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Decode raw image bytes into a [`DynamicImage`].
///
/// # Errors
///
/// Returns [`InspectionError::EmptyInput`] if `bytes` is empty.
/// Returns [`InspectionError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, InspectionError> {
    if bytes.is_empty() {
        return Err(InspectionError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Resize a decoded image to exactly `size`, dropping any alpha channel.
///
/// Images already at `size` are converted without resampling.
#[must_use = "returns the resized image"]
pub fn resize_to(image: &DynamicImage, size: Dimensions, filter: ResizeFilter) -> RgbImage {
    if image.width() == size.width && image.height() == size.height {
        return image.to_rgb8();
    }
    image
        .resize_exact(size.width, size.height, filter.to_image_filter())
        .to_rgb8()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode(&[]);
        assert!(matches!(result, Err(InspectionError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(InspectionError::ImageDecode(_))));
    }

    #[test]
    fn valid_png_decodes() {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let decoded = decode(&encode_png(&img)).unwrap();
        assert_eq!(decoded.width(), 3);
        assert_eq!(decoded.height(), 2);
    }

    #[test]
    fn default_filter_is_triangle() {
        assert_eq!(ResizeFilter::default(), ResizeFilter::Triangle);
    }

    #[test]
    fn resize_ignores_aspect_ratio() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, image::Rgb([1, 2, 3])));
        let resized = resize_to(&img, Dimensions::CANONICAL, ResizeFilter::Triangle);
        assert_eq!(resized.dimensions(), (640, 480));
    }

    #[test]
    fn resize_at_target_size_is_lossless() {
        let rgb = RgbImage::from_fn(8, 6, |x, y| {
            image::Rgb([u8::try_from(x * 30).unwrap(), u8::try_from(y * 40).unwrap(), 7])
        });
        let img = DynamicImage::ImageRgb8(rgb.clone());
        let size = Dimensions {
            width: 8,
            height: 6,
        };
        assert_eq!(resize_to(&img, size, ResizeFilter::Lanczos3), rgb);
    }

    #[test]
    fn alpha_is_dropped() {
        let rgba = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 100, 50, 0]));
        let size = Dimensions {
            width: 4,
            height: 4,
        };
        let rgb = resize_to(&DynamicImage::ImageRgba8(rgba), size, ResizeFilter::Nearest);
        assert_eq!(rgb.get_pixel(0, 0).0, [200, 100, 50]);
    }
}
