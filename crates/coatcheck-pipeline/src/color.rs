//! Color-space conversions and per-pixel channel arithmetic.
//!
//! Channels use the common 8-bit encodings: HSV value is `max(R, G, B)`,
//! and the CIE L\*a\*b\* chroma axes (sRGB primaries, D65 white, converted
//! with [`palette`]) are stored as `a + 128` and `b + 128`, so a neutral
//! gray has `a = b = 128`.

use image::{GrayImage, Luma, Rgb, RgbImage};
use palette::{IntoColor, Lab, Srgb};

/// Extract the HSV value channel: `max(R, G, B)` per pixel.
#[must_use = "returns the value channel"]
pub fn value_channel(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Luma([r.max(g).max(b)])
    })
}

/// 8-bit encoded L\*a\*b\* chroma planes. Lightness is not kept.
#[derive(Debug, Clone)]
pub struct LabChroma {
    /// Green-red opponent axis, offset by 128.
    pub a: GrayImage,
    /// Blue-yellow opponent axis, offset by 128.
    pub b: GrayImage,
}

/// Convert one sRGB pixel to L\*a\*b\* (D65).
#[must_use]
pub fn lab_of(pixel: Rgb<u8>) -> Lab {
    let [r, g, b] = pixel.0;
    Srgb::new(r, g, b).into_format::<f32>().into_linear().into_color()
}

/// Convert an sRGB image to 8-bit encoded a\* and b\* planes.
#[must_use = "returns the chroma planes"]
pub fn to_lab(image: &RgbImage) -> LabChroma {
    let (w, h) = image.dimensions();
    let mut a = GrayImage::new(w, h);
    let mut b = GrayImage::new(w, h);
    for (x, y, pixel) in image.enumerate_pixels() {
        let lab = lab_of(*pixel);
        a.put_pixel(x, y, Luma([saturate(f64::from(lab.a) + 128.0)]));
        b.put_pixel(x, y, Luma([saturate(f64::from(lab.b) + 128.0)]));
    }
    LabChroma { a, b }
}

/// Round and clamp a floating-point intensity into `0..=255`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn saturate(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Per-pixel `lhs - rhs`, clamped at zero.
#[must_use = "returns the difference image"]
pub fn saturating_sub(lhs: &GrayImage, rhs: &GrayImage) -> GrayImage {
    GrayImage::from_fn(lhs.width(), lhs.height(), |x, y| {
        Luma([lhs.get_pixel(x, y).0[0].saturating_sub(rhs.get_pixel(x, y).0[0])])
    })
}

/// Per-pixel `numerator * 255 / denominator`, saturating at 255.
///
/// Pixels with a zero denominator become 0.
#[must_use = "returns the scaled quotient image"]
pub fn divide_scaled(numerator: &GrayImage, denominator: &GrayImage) -> GrayImage {
    GrayImage::from_fn(numerator.width(), numerator.height(), |x, y| {
        let n = f64::from(numerator.get_pixel(x, y).0[0]);
        let d = f64::from(denominator.get_pixel(x, y).0[0]);
        if d == 0.0 {
            Luma([0])
        } else {
            Luma([saturate(n * 255.0 / d)])
        }
    })
}

/// Linearly rescale intensities so the minimum maps to 0 and the maximum
/// to 255.
///
/// A constant image has no range to stretch and maps to all zeros.
#[must_use = "returns the rescaled image"]
pub fn normalize_min_max(image: &GrayImage) -> GrayImage {
    let (min, max) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if max <= min {
        return GrayImage::new(image.width(), image.height());
    }
    let scale = 255.0 / f64::from(max - min);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = f64::from(image.get_pixel(x, y).0[0] - min);
        Luma([saturate(v * scale)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(r: u8, g: u8, b: u8) -> RgbImage {
        RgbImage::from_pixel(2, 2, image::Rgb([r, g, b]))
    }

    #[test]
    fn value_is_channel_maximum() {
        let v = value_channel(&solid(10, 200, 30));
        assert_eq!(v.get_pixel(1, 1).0[0], 200);
    }

    #[test]
    fn neutral_gray_has_centered_chroma() {
        let lab = to_lab(&solid(128, 128, 128));
        let a = i16::from(lab.a.get_pixel(0, 0).0[0]);
        let b = i16::from(lab.b.get_pixel(0, 0).0[0]);
        assert!((a - 128).abs() <= 1, "a = {a}");
        assert!((b - 128).abs() <= 1, "b = {b}");
    }

    #[test]
    fn white_has_full_lightness() {
        let lab = lab_of(Rgb([255, 255, 255]));
        assert!((lab.l - 100.0).abs() < 0.01, "L = {}", lab.l);
    }

    #[test]
    fn red_is_positive_on_green_red_axis() {
        let lab = to_lab(&solid(220, 30, 30));
        assert!(lab.a.get_pixel(0, 0).0[0] > 180);
        let green = to_lab(&solid(30, 200, 30));
        assert!(green.a.get_pixel(0, 0).0[0] < 80);
    }

    #[test]
    fn yellow_is_positive_on_blue_yellow_axis() {
        let lab = to_lab(&solid(230, 220, 40));
        assert!(lab.b.get_pixel(0, 0).0[0] > 180);
    }

    #[test]
    fn blue_is_negative_on_blue_yellow_axis() {
        let lab = to_lab(&solid(20, 40, 230));
        assert!(lab.b.get_pixel(0, 0).0[0] < 80);
    }

    #[test]
    fn saturating_sub_clamps_at_zero() {
        let lhs = GrayImage::from_pixel(1, 1, Luma([10]));
        let rhs = GrayImage::from_pixel(1, 1, Luma([50]));
        assert_eq!(saturating_sub(&lhs, &rhs).get_pixel(0, 0).0[0], 0);
        assert_eq!(saturating_sub(&rhs, &lhs).get_pixel(0, 0).0[0], 40);
    }

    #[test]
    fn divide_scaled_handles_zero_denominator() {
        let n = GrayImage::from_pixel(1, 1, Luma([100]));
        let zero = GrayImage::from_pixel(1, 1, Luma([0]));
        assert_eq!(divide_scaled(&n, &zero).get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn divide_scaled_saturates() {
        let n = GrayImage::from_pixel(1, 1, Luma([200]));
        let d = GrayImage::from_pixel(1, 1, Luma([100]));
        assert_eq!(divide_scaled(&n, &d).get_pixel(0, 0).0[0], 255);
        assert_eq!(divide_scaled(&d, &n).get_pixel(0, 0).0[0], 128);
    }

    #[test]
    fn normalize_stretches_to_full_range() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([[50, 75, 100][x as usize]]));
        let out = normalize_min_max(&img);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(1, 0).0[0], 128);
        assert_eq!(out.get_pixel(2, 0).0[0], 255);
    }

    #[test]
    fn normalize_constant_image_is_zero() {
        let img = GrayImage::from_pixel(4, 4, Luma([77]));
        assert!(normalize_min_max(&img).pixels().all(|p| p.0[0] == 0));
    }
}
