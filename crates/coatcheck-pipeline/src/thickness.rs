//! Coating-thickness uniformity.
//!
//! Thicker coating fluoresces brighter, so after smoothing away pixel
//! noise the spread of the score over the board tracks how evenly the
//! coating was applied.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::blur::gaussian_blur_kernel;
use crate::mask::is_set;

/// Thickness analysis parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThicknessConfig {
    /// Odd Gaussian kernel size applied to the score before measuring.
    pub kernel_size: u32,
}

impl ThicknessConfig {
    /// Default smoothing kernel size.
    pub const DEFAULT_KERNEL_SIZE: u32 = 21;
}

impl Default for ThicknessConfig {
    fn default() -> Self {
        Self {
            kernel_size: Self::DEFAULT_KERNEL_SIZE,
        }
    }
}

/// Smoothed score and its spread over the board.
#[derive(Debug, Clone, PartialEq)]
pub struct ThicknessMap {
    /// The blurred score channel.
    pub smoothed: GrayImage,
    /// Population standard deviation of `smoothed` where the board mask is
    /// set.
    pub std_dev: f64,
}

/// Blur the score and measure its spread inside `pcb_mask`.
#[must_use = "returns the thickness map"]
pub fn analyze_thickness(
    score: &GrayImage,
    pcb_mask: &GrayImage,
    config: &ThicknessConfig,
) -> ThicknessMap {
    let smoothed = gaussian_blur_kernel(score, config.kernel_size);
    let std_dev = masked_std_dev(&smoothed, pcb_mask);
    ThicknessMap { smoothed, std_dev }
}

/// Population standard deviation of `image` over the set pixels of
/// `mask`. Zero for an empty mask.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn masked_std_dev(image: &GrayImage, mask: &GrayImage) -> f64 {
    let (n, sum, sum_sq) = image
        .pixels()
        .zip(mask.pixels())
        .filter(|(_, m)| is_set(m.0[0]))
        .fold((0u64, 0.0, 0.0), |(n, s, sq), (p, _)| {
            let v = f64::from(p.0[0]);
            (n + 1, s + v, v.mul_add(v, sq))
        });
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::types::FOREGROUND;

    #[test]
    fn uniform_coating_has_zero_spread() {
        let score = GrayImage::from_pixel(40, 40, Luma([180]));
        let pcb = GrayImage::from_pixel(40, 40, Luma([FOREGROUND]));
        let map = analyze_thickness(&score, &pcb, &ThicknessConfig::default());
        assert!(map.std_dev < 1.0, "std = {}", map.std_dev);
    }

    #[test]
    fn two_level_population_std() {
        let img = GrayImage::from_fn(4, 1, |x, _| Luma([if x < 2 { 10 } else { 30 }]));
        let mask = GrayImage::from_pixel(4, 1, Luma([FOREGROUND]));
        assert!((masked_std_dev(&img, &mask) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn pixels_outside_mask_are_ignored() {
        let img = GrayImage::from_fn(4, 1, |x, _| Luma([if x == 3 { 250 } else { 40 }]));
        let mask = GrayImage::from_fn(4, 1, |x, _| Luma([if x == 3 { 0 } else { FOREGROUND }]));
        assert!(masked_std_dev(&img, &mask).abs() < 1e-9);
    }

    #[test]
    fn empty_mask_is_zero() {
        let img = GrayImage::from_pixel(4, 4, Luma([99]));
        assert!(masked_std_dev(&img, &GrayImage::new(4, 4)).abs() < f64::EPSILON);
    }

    #[test]
    fn uneven_coating_spreads() {
        let score = GrayImage::from_fn(80, 40, |x, _| Luma([if x < 40 { 80 } else { 220 }]));
        let pcb = GrayImage::from_pixel(80, 40, Luma([FOREGROUND]));
        let map = analyze_thickness(&score, &pcb, &ThicknessConfig::default());
        assert!(map.std_dev > 40.0, "std = {}", map.std_dev);
    }
}
