//! Coating segmentation: score channel to binary coating mask.
//!
//! Optional bilateral smoothing, Otsu's global threshold, then
//! morphological cleanup (closing before opening) with an elliptical
//! element.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::blur::{BilateralConfig, bilateral_filter};
use crate::mask::{StructuringElement, close, open};
use crate::types::{BACKGROUND, FOREGROUND};

/// Morphological cleanup parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphologyConfig {
    /// Elliptical element size (odd).
    pub kernel_size: u32,
    /// Closing passes: this many dilations, then this many erosions.
    pub close_iterations: u32,
    /// Opening passes, applied after closing.
    pub open_iterations: u32,
}

impl MorphologyConfig {
    /// Default element size.
    pub const DEFAULT_KERNEL_SIZE: u32 = 5;
    /// Default closing passes.
    pub const DEFAULT_CLOSE_ITERATIONS: u32 = 2;
    /// Default opening passes.
    pub const DEFAULT_OPEN_ITERATIONS: u32 = 1;
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            kernel_size: Self::DEFAULT_KERNEL_SIZE,
            close_iterations: Self::DEFAULT_CLOSE_ITERATIONS,
            open_iterations: Self::DEFAULT_OPEN_ITERATIONS,
        }
    }
}

/// Output of [`segment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    /// Cleaned binary coating mask.
    pub mask: GrayImage,
    /// Threshold chosen by Otsu's method; pixels strictly above it are
    /// coating.
    pub otsu_level: u8,
}

/// Binarize the score channel and clean the result.
#[must_use = "returns the coating segmentation"]
pub fn segment(
    score: &GrayImage,
    bilateral: Option<&BilateralConfig>,
    morphology: &MorphologyConfig,
) -> Segmentation {
    let smoothed = bilateral.map_or_else(|| score.clone(), |cfg| bilateral_filter(score, cfg));
    let otsu_level = imageproc::contrast::otsu_level(&smoothed);
    let binary = threshold(&smoothed, otsu_level);

    let element = StructuringElement::ellipse(morphology.kernel_size);
    let closed = close(&binary, &element, morphology.close_iterations);
    let mask = open(&closed, &element, morphology.open_iterations);

    Segmentation { mask, otsu_level }
}

/// `value > level` becomes foreground.
#[must_use = "returns the binary mask"]
pub fn threshold(image: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y).0[0] > level {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}
