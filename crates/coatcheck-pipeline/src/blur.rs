//! Smoothing filters: Gaussian blur and the edge-preserving bilateral
//! filter.
//!
//! [`gaussian_blur`] wraps [`imageproc::filter::gaussian_blur_f32`].
//! Stages that are configured by an odd kernel size instead of a sigma go
//! through [`gaussian_blur_kernel`], which derives the sigma the usual way
//! (`0.3 * ((k - 1) / 2 - 1) + 0.8`).
//!
//! [`bilateral_filter`] wraps [`imageproc::filter::bilateral_filter`]: it
//! averages each pixel with its square neighborhood, weighting every
//! neighbor by both spatial distance and intensity difference, so flat
//! areas are smoothed while strong edges survive.

use image::GrayImage;
use imageproc::filter::bilateral::GaussianEuclideanColorDistance;
use serde::{Deserialize, Serialize};


/// Apply Gaussian blur to a grayscale image.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Sigma of the Gaussian whose support matches a `kernel_size` window.
///
/// 51 maps to 8.0 and 21 maps to 3.5.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    let half = (kernel_size.saturating_sub(1) / 2) as f32;
    0.3f32.mul_add(half - 1.0, 0.8)
}

/// Gaussian blur parameterized by an odd kernel size.
///
/// Kernel sizes below 3 leave the image unchanged.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur_kernel(image: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size < 3 {
        return image.clone();
    }
    gaussian_blur(image, sigma_for_kernel(kernel_size))
}

/// Parameters of the bilateral filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BilateralConfig {
    /// Neighborhood diameter in pixels; the window radius is `diameter / 2`.
    pub diameter: u32,
    /// Intensity difference at which a neighbor's weight falls to `e^-0.5`.
    pub sigma_color: f64,
    /// Spatial distance at which a neighbor's weight falls to `e^-0.5`.
    pub sigma_space: f64,
}

impl BilateralConfig {
    /// Default window diameter.
    pub const DEFAULT_DIAMETER: u32 = 9;
    /// Default range sigma.
    pub const DEFAULT_SIGMA_COLOR: f64 = 75.0;
    /// Default spatial sigma.
    pub const DEFAULT_SIGMA_SPACE: f64 = 75.0;
}

impl Default for BilateralConfig {
    fn default() -> Self {
        Self {
            diameter: Self::DEFAULT_DIAMETER,
            sigma_color: Self::DEFAULT_SIGMA_COLOR,
            sigma_space: Self::DEFAULT_SIGMA_SPACE,
        }
    }
}

/// Largest supported bilateral window diameter.
pub const MAX_BILATERAL_DIAMETER: u32 = 511;

/// Apply an edge-preserving bilateral filter.
///
/// Wraps [`imageproc::filter::bilateral_filter`]: the window is the square
/// of radius `diameter / 2` and pixels outside the image repeat the
/// nearest edge pixel. Diameters above [`MAX_BILATERAL_DIAMETER`] are
/// clamped. A diameter below 3 or a non-positive sigma returns the image
/// unchanged.
#[must_use = "returns the filtered image"]
#[allow(clippy::cast_possible_truncation)]
pub fn bilateral_filter(image: &GrayImage, config: &BilateralConfig) -> GrayImage {
    let radius = config.diameter.min(MAX_BILATERAL_DIAMETER) / 2;
    if radius < 1
        || config.sigma_color <= 0.0
        || config.sigma_space <= 0.0
        || image.width() == 0
        || image.height() == 0
    {
        return image.clone();
    }
    imageproc::filter::bilateral_filter(
        image,
        u8::try_from(radius).unwrap_or(u8::MAX),
        config.sigma_space as f32,
        GaussianEuclideanColorDistance::new(config.sigma_color as f32),
    )
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    /// Create a test image with a sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _y| if x < 5 { Luma([0]) } else { Luma([255]) })
    }

    #[test]
    fn zero_sigma_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur(&img, 0.0), img);
    }

    #[test]
    fn blur_smooths_sharp_edge() {
        let blurred = gaussian_blur(&sharp_edge_image(), 2.0);
        assert!(blurred.get_pixel(4, 5).0[0] > 0);
        assert!(blurred.get_pixel(5, 5).0[0] < 255);
    }

    #[test]
    fn sigma_from_kernel_size() {
        assert!((sigma_for_kernel(51) - 8.0).abs() < 1e-5);
        assert!((sigma_for_kernel(21) - 3.5).abs() < 1e-5);
        assert!((sigma_for_kernel(3) - 0.8).abs() < 1e-5);
    }

    #[test]
    fn tiny_kernel_is_identity() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur_kernel(&img, 1), img);
    }

    #[test]
    fn bilateral_keeps_uniform_image() {
        let img = GrayImage::from_pixel(12, 12, Luma([90]));
        let out = bilateral_filter(&img, &BilateralConfig::default());
        assert!(out.pixels().all(|p| p.0[0].abs_diff(90) <= 1));
    }

    #[test]
    fn bilateral_preserves_strong_edge_better_than_gaussian() {
        let img = sharp_edge_image();
        let config = BilateralConfig {
            diameter: 9,
            sigma_color: 20.0,
            sigma_space: 75.0,
        };
        let bilateral = bilateral_filter(&img, &config);
        let gaussian = gaussian_blur(&img, 2.0);
        assert!(bilateral.get_pixel(4, 5).0[0] <= gaussian.get_pixel(4, 5).0[0]);
        assert!(bilateral.get_pixel(4, 5).0[0] < 5);
        assert!(bilateral.get_pixel(5, 5).0[0] > 250);
    }

    #[test]
    fn bilateral_smooths_small_noise() {
        let img = GrayImage::from_fn(9, 9, |x, y| {
            if (x, y) == (4, 4) { Luma([130]) } else { Luma([100]) }
        });
        let out = bilateral_filter(&img, &BilateralConfig::default());
        let center = out.get_pixel(4, 4).0[0];
        assert!(center < 130 && center >= 100, "center = {center}");
    }

    #[test]
    fn bilateral_zero_diameter_is_identity() {
        let img = sharp_edge_image();
        let config = BilateralConfig {
            diameter: 0,
            ..BilateralConfig::default()
        };
        assert_eq!(bilateral_filter(&img, &config), img);
    }

    /// Sigmas wide enough that every window pixel weighs about the same.
    const FLAT: BilateralConfig = BilateralConfig {
        diameter: 9,
        sigma_color: 1000.0,
        sigma_space: 1000.0,
    };

    #[test]
    fn bilateral_window_is_square() {
        // The far corner of the 9x9 window still contributes.
        let mut img = GrayImage::new(9, 9);
        img.put_pixel(8, 8, Luma([255]));
        assert!(bilateral_filter(&img, &FLAT).get_pixel(4, 4).0[0] > 0);
    }

    #[test]
    fn bilateral_border_repeats_edge_pixel() {
        // Column 0 is bright. At (0, 4) the five window columns at or left
        // of the border all read column 0, so more than half the window is
        // bright.
        let img = GrayImage::from_fn(9, 9, |x, _| Luma([if x == 0 { 255 } else { 0 }]));
        let edge = bilateral_filter(&img, &FLAT).get_pixel(0, 4).0[0];
        assert!(edge > 127, "edge = {edge}");
    }

    #[test]
    fn bilateral_oversized_diameter_is_clamped() {
        let img = GrayImage::from_pixel(4, 4, Luma([60]));
        let config = BilateralConfig {
            diameter: 100_000,
            ..BilateralConfig::default()
        };
        let out = bilateral_filter(&img, &config);
        assert!(out.pixels().all(|p| p.0[0].abs_diff(60) <= 1));
    }
}
