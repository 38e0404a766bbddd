//! Contrast extraction: turn the resized color image into the channels the
//! analysis stages consume.
//!
//! This module defines the [`ContrastExtractor`] trait for pluggable
//! coating-contrast strategies and the [`ContrastStrategy`] enum for
//! selecting one from configuration.
//!
//! # Strategy pattern
//!
//! Different lighting setups make the coating stand out in different
//! ways. Under UV the coating fluoresces yellow-green, so a chroma
//! difference isolates it; under white light only the brightness contrast
//! is usable. Both strategies produce the same [`ContrastChannels`] so the
//! rest of the pipeline runs unchanged.

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::blur::{BilateralConfig, bilateral_filter, gaussian_blur_kernel};
use crate::color::{divide_scaled, normalize_min_max, saturating_sub, to_lab, value_channel};
use crate::contrast::{ClaheConfig, clahe};

/// Channels derived from the color image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContrastChannels {
    /// Coating score: brighter means more likely coated. Fed to
    /// segmentation and thickness analysis.
    pub score: GrayImage,
    /// Brightness channel fed to crack detection.
    pub intensity: GrayImage,
}

/// Selects how the coating score is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ContrastStrategy {
    /// Lab `b - a` chroma difference, min-max rescaled.
    ///
    /// The intensity channel is the HSV value divided by its own
    /// large-kernel blur, which flattens uneven illumination.
    ColorDifference {
        /// Odd Gaussian kernel size estimating the illumination field.
        illumination_kernel: u32,
    },
    /// Bilateral-smoothed HSV value followed by CLAHE.
    ///
    /// The enhanced channel serves as both score and intensity.
    ContrastEnhanced {
        /// Edge-preserving smoothing applied before equalization.
        bilateral: BilateralConfig,
        /// Local equalization parameters.
        clahe: ClaheConfig,
    },
}

impl ContrastStrategy {
    /// Default illumination-estimation kernel size.
    pub const DEFAULT_ILLUMINATION_KERNEL: u32 = 51;

    /// The chroma-difference strategy with default parameters.
    #[must_use]
    pub const fn color_difference() -> Self {
        Self::ColorDifference {
            illumination_kernel: Self::DEFAULT_ILLUMINATION_KERNEL,
        }
    }

    /// The equalized-brightness strategy with default parameters.
    #[must_use]
    pub fn contrast_enhanced() -> Self {
        Self::ContrastEnhanced {
            bilateral: BilateralConfig::default(),
            clahe: ClaheConfig::default(),
        }
    }

    /// Short name used in logs and diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ColorDifference { .. } => "color-difference",
            Self::ContrastEnhanced { .. } => "contrast-enhanced",
        }
    }
}

impl Default for ContrastStrategy {
    fn default() -> Self {
        Self::color_difference()
    }
}

/// Trait for coating-contrast strategies.
pub trait ContrastExtractor {
    /// Derive the score and intensity channels from a color image.
    fn extract(&self, image: &RgbImage) -> ContrastChannels;
}

impl ContrastExtractor for ContrastStrategy {
    fn extract(&self, image: &RgbImage) -> ContrastChannels {
        match self {
            Self::ColorDifference {
                illumination_kernel,
            } => ContrastChannels {
                score: coating_score(image),
                intensity: illumination_corrected_value(image, *illumination_kernel),
            },
            Self::ContrastEnhanced { bilateral, clahe } => {
                let enhanced = enhanced_value(image, bilateral, clahe);
                ContrastChannels {
                    score: enhanced.clone(),
                    intensity: enhanced,
                }
            }
        }
    }
}

/// HSV value divided by its Gaussian-blurred self, scaled to `0..=255`.
#[must_use = "returns the corrected value channel"]
pub fn illumination_corrected_value(image: &RgbImage, kernel_size: u32) -> GrayImage {
    let value = value_channel(image);
    let illumination = gaussian_blur_kernel(&value, kernel_size);
    divide_scaled(&value, &illumination)
}

/// Yellow-green coating score: Lab `b - a`, clamped at zero, then
/// stretched to the full range.
#[must_use = "returns the coating score"]
pub fn coating_score(image: &RgbImage) -> GrayImage {
    let lab = to_lab(image);
    normalize_min_max(&saturating_sub(&lab.b, &lab.a))
}

/// Bilateral-smoothed, CLAHE-equalized HSV value.
#[must_use = "returns the enhanced value channel"]
pub fn enhanced_value(
    image: &RgbImage,
    bilateral: &BilateralConfig,
    clahe_config: &ClaheConfig,
) -> GrayImage {
    let smoothed = bilateral_filter(&value_channel(image), bilateral);
    clahe(&smoothed, clahe_config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgb;

    use super::*;

    /// Dark substrate with a yellow-green coated square in the middle.
    fn coated_square() -> RgbImage {
        RgbImage::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                Rgb([200, 220, 60])
            } else {
                Rgb([30, 40, 50])
            }
        })
    }

    #[test]
    fn default_is_color_difference() {
        assert_eq!(
            ContrastStrategy::default(),
            ContrastStrategy::ColorDifference {
                illumination_kernel: 51
            }
        );
    }

    #[test]
    fn coating_scores_above_substrate() {
        let score = coating_score(&coated_square());
        assert_eq!(score.get_pixel(20, 20).0[0], 255);
        assert_eq!(score.get_pixel(2, 2).0[0], 0);
    }

    #[test]
    fn uniform_image_scores_zero() {
        let img = RgbImage::from_pixel(8, 8, Rgb([200, 220, 60]));
        assert!(coating_score(&img).pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn illumination_correction_flattens_uniform_field() {
        let img = RgbImage::from_pixel(30, 30, Rgb([0, 100, 0]));
        let corrected = illumination_corrected_value(&img, 21);
        for p in corrected.pixels() {
            assert!((i16::from(p.0[0]) - 255).abs() <= 3, "got {}", p.0[0]);
        }
    }

    #[test]
    fn illumination_correction_zero_where_dark() {
        let img = RgbImage::new(10, 10);
        let corrected = illumination_corrected_value(&img, 5);
        assert!(corrected.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn color_difference_produces_both_channels() {
        let img = coated_square();
        let channels = ContrastStrategy::color_difference().extract(&img);
        assert_eq!(channels.score.dimensions(), (40, 40));
        assert_eq!(channels.intensity.dimensions(), (40, 40));
        assert_ne!(channels.score, channels.intensity);
    }

    #[test]
    fn contrast_enhanced_uses_one_channel_for_both() {
        let channels = ContrastStrategy::contrast_enhanced().extract(&coated_square());
        assert_eq!(channels.score, channels.intensity);
        assert!(channels.score.get_pixel(20, 20).0[0] > channels.score.get_pixel(2, 2).0[0]);
    }

    #[test]
    fn strategy_serde_round_trip() {
        let strategy = ContrastStrategy::contrast_enhanced();
        let json = serde_json::to_string(&strategy).unwrap();
        let back: ContrastStrategy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, strategy);
    }
}
