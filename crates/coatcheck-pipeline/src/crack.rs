//! Crack detection: Canny edges confined to the board footprint.
//!
//! Runs [`crate::canny::canny`], which smooths internally, computes
//! gradients, applies non-maximum suppression and hysteresis. Edge pixels
//! outside the footprint (the board outline against the background, stray
//! texture) are discarded.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::mask::{and, count_foreground};

/// Minimum allowed Canny threshold.
///
/// A zero low threshold turns every pixel with any gradient into an edge
/// candidate and can stall hysteresis.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Hysteresis thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CannyConfig {
    /// Gradient magnitude below which a pixel is never an edge.
    pub low_threshold: f32,
    /// Gradient magnitude above which a pixel is always an edge.
    pub high_threshold: f32,
}

impl CannyConfig {
    /// Default low threshold.
    pub const DEFAULT_LOW_THRESHOLD: f32 = 40.0;
    /// Default high threshold.
    pub const DEFAULT_HIGH_THRESHOLD: f32 = 120.0;

    /// `(low, high)` as applied: both at least [`MIN_THRESHOLD`], low at
    /// most high.
    #[must_use]
    pub const fn effective_thresholds(&self) -> (f32, f32) {
        let high = self.high_threshold.max(MIN_THRESHOLD);
        let low = self.low_threshold.max(MIN_THRESHOLD).min(high);
        (low, high)
    }
}

impl Default for CannyConfig {
    fn default() -> Self {
        Self {
            low_threshold: Self::DEFAULT_LOW_THRESHOLD,
            high_threshold: Self::DEFAULT_HIGH_THRESHOLD,
        }
    }
}

/// Edge pixels inside the footprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrackMap {
    /// Binary edge map masked by the footprint.
    pub mask: GrayImage,
    /// Foreground pixel count of `mask`.
    pub pixel_count: u64,
}

/// Binary Canny edge map: 255 for edges, 0 elsewhere.
///
/// Both thresholds are clamped to at least [`MIN_THRESHOLD`] and the low
/// threshold to at most the high one.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, config: &CannyConfig) -> GrayImage {
    let (low, high) = config.effective_thresholds();
    crate::canny::canny(image, low, high)
}

/// Detect edges in `intensity` and keep those inside `pcb_mask`.
#[must_use = "returns the crack map"]
pub fn detect_cracks(intensity: &GrayImage, pcb_mask: &GrayImage, config: &CannyConfig) -> CrackMap {
    let mask = and(&canny(intensity, config), pcb_mask);
    let pixel_count = count_foreground(&mask);
    CrackMap { mask, pixel_count }
}
