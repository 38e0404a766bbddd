//! Bubble detection: small, near-circular regions of the coating mask.
//!
//! Every external contour of the coating mask is a candidate. Candidates
//! whose area falls outside the configured band, or whose perimeter is
//! zero, are skipped. The rest are bubbles when their circularity exceeds
//! the threshold; the circularity then doubles as the detection
//! confidence.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::contour::{Contour, DefectCandidate, external_contours};
use crate::types::Bubble;

/// Bubble classification thresholds.
///
/// Both area bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BubbleConfig {
    /// Candidates must enclose more than this many pixels.
    pub min_area: f64,
    /// Candidates must enclose fewer than this many pixels.
    pub max_area: f64,
    /// Candidates must be strictly more circular than this.
    pub min_circularity: f64,
}

impl BubbleConfig {
    /// Area band and threshold for UV-fluorescence imaging.
    pub const UV_FLUORESCENCE: Self = Self {
        min_area: 40.0,
        max_area: 800.0,
        min_circularity: 0.65,
    };

    /// Area band and threshold for white-light value contrast.
    pub const VALUE_CONTRAST: Self = Self {
        min_area: 30.0,
        max_area: 600.0,
        min_circularity: 0.6,
    };

    /// Whether `area` lies strictly inside the band.
    #[must_use]
    pub fn area_in_band(&self, area: f64) -> bool {
        area > self.min_area && area < self.max_area
    }
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self::UV_FLUORESCENCE
    }
}

/// Outcome of bubble classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BubbleSummary {
    /// Accepted bubbles, in contour discovery order.
    pub bubbles: Vec<Bubble>,
    /// Contours of the accepted bubbles, parallel to `bubbles`.
    pub contours: Vec<Contour>,
    /// Sum of the accepted bubbles' circularities.
    pub confidence_sum: f64,
    /// Contours examined.
    pub candidates: usize,
    /// In-band contours skipped for having no perimeter.
    pub degenerate: usize,
}

impl BubbleSummary {
    /// Number of accepted bubbles.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn count(&self) -> u32 {
        self.bubbles.len() as u32
    }

    /// Mean circularity of the accepted bubbles, 0 when there are none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_confidence(&self) -> f64 {
        self.confidence_sum / self.bubbles.len().max(1) as f64
    }

    fn record(&mut self, candidate: DefectCandidate, circularity: f64) {
        self.confidence_sum += circularity;
        self.bubbles.push(Bubble {
            centroid: candidate.contour.centroid(),
            area: candidate.area,
            perimeter: candidate.perimeter,
            circularity,
        });
        self.contours.push(candidate.contour);
    }
}

/// Classify the external contours of `coating_mask`.
#[must_use = "returns the bubble summary"]
pub fn detect_bubbles(coating_mask: &GrayImage, config: &BubbleConfig) -> BubbleSummary {
    classify(external_contours(coating_mask), config)
}

/// Classify already-traced contours.
#[must_use = "returns the bubble summary"]
pub fn classify(contours: Vec<Contour>, config: &BubbleConfig) -> BubbleSummary {
    let mut summary = BubbleSummary {
        candidates: contours.len(),
        ..BubbleSummary::default()
    };
    for contour in contours {
        let candidate = DefectCandidate::from_contour(contour);
        if !config.area_in_band(candidate.area) {
            continue;
        }
        let Some(circularity) = candidate.circularity() else {
            summary.degenerate += 1;
            continue;
        };
        if circularity > config.min_circularity {
            summary.record(candidate, circularity);
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::types::{FOREGROUND, Point};

    fn draw_disc(img: &mut GrayImage, cx: i32, cy: i32, r: i32) {
        for y in 0..img.height() {
            for x in 0..img.width() {
                let dx = x.cast_signed() - cx;
                let dy = y.cast_signed() - cy;
                if dx * dx + dy * dy <= r * r {
                    img.put_pixel(x, y, Luma([FOREGROUND]));
                }
            }
        }
    }

    fn square(x0: i32, side: i32) -> Contour {
        Contour::new(vec![
            Point::new(x0, 0),
            Point::new(x0 + side, 0),
            Point::new(x0 + side, side),
            Point::new(x0, side),
        ])
    }

    #[test]
    fn single_disc_is_a_bubble() {
        let mut img = GrayImage::new(60, 60);
        draw_disc(&mut img, 30, 30, 8);
        let summary = detect_bubbles(&img, &BubbleConfig::default());
        assert_eq!(summary.count(), 1);
        assert!(summary.average_confidence() > 0.8);
        let (cx, cy) = summary.bubbles[0].centroid;
        assert!((cx - 30.0).abs() < 1.0 && (cy - 30.0).abs() < 1.0);
    }

    #[test]
    fn no_bubbles_means_zero_confidence() {
        let summary = detect_bubbles(&GrayImage::new(10, 10), &BubbleConfig::default());
        assert_eq!(summary.count(), 0);
        assert!(summary.average_confidence().abs() < f64::EPSILON);
    }

    #[test]
    fn area_band_is_exclusive() {
        let config = BubbleConfig {
            min_area: 16.0,
            max_area: 100.0,
            min_circularity: 0.1,
        };
        assert!(!config.area_in_band(16.0));
        assert!(!config.area_in_band(100.0));
        let summary = classify(vec![square(0, 4), square(10, 5), square(20, 10)], &config);
        assert_eq!(summary.count(), 1);
        assert!((summary.bubbles[0].area - 25.0).abs() < f64::EPSILON);
        assert_eq!(summary.candidates, 3);
    }

    #[test]
    fn zero_perimeter_is_skipped_not_counted() {
        let config = BubbleConfig {
            min_area: -1.0,
            max_area: 100.0,
            min_circularity: 0.0,
        };
        let summary = classify(vec![Contour::new(vec![Point::new(1, 1)])], &config);
        assert_eq!(summary.count(), 0);
        assert_eq!(summary.degenerate, 1);
        assert!(summary.average_confidence().is_finite());
    }

    #[test]
    fn circularity_threshold_separates_square() {
        // A square has circularity π/4 ≈ 0.7854.
        let config = |min_circularity| BubbleConfig {
            min_area: 0.0,
            max_area: 1000.0,
            min_circularity,
        };
        assert_eq!(classify(vec![square(0, 10)], &config(0.786)).count(), 0);
        assert_eq!(classify(vec![square(0, 10)], &config(0.785)).count(), 1);
    }

    #[test]
    fn large_region_is_not_a_bubble() {
        let mut img = GrayImage::new(100, 100);
        draw_disc(&mut img, 50, 50, 30);
        assert_eq!(detect_bubbles(&img, &BubbleConfig::default()).count(), 0);
    }

    #[test]
    fn average_is_mean_of_circularities() {
        let config = BubbleConfig {
            min_area: 0.0,
            max_area: 1000.0,
            min_circularity: 0.5,
        };
        let summary = classify(vec![square(0, 10), square(20, 6)], &config);
        assert_eq!(summary.count(), 2);
        let expected = std::f64::consts::FRAC_PI_4;
        assert!((summary.average_confidence() - expected).abs() < 1e-9);
    }

    #[test]
    fn profiles_differ() {
        assert_ne!(BubbleConfig::UV_FLUORESCENCE, BubbleConfig::VALUE_CONTRAST);
        assert_eq!(BubbleConfig::default(), BubbleConfig::UV_FLUORESCENCE);
    }
}
