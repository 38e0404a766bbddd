//! Contour extraction and shape measurement.
//!
//! Outer borders are traced with Suzuki-Abe border following
//! ([`imageproc::contours::find_contours`]); only borders without a parent
//! are kept, so holes and regions nested inside holes are ignored.
//!
//! Shape measures follow the usual polygon conventions: the enclosed area
//! is the shoelace formula over the traced pixel centers, and the
//! perimeter is the closed arc length (the last point connects back to
//! the first).

use std::f64::consts::PI;

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};

use crate::types::Point;

/// Closed outer boundary of one connected foreground region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    points: Vec<Point>,
}

impl Contour {
    /// Create a contour from its boundary points, in tracing order.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// The boundary points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Enclosed area by the shoelace formula.
    ///
    /// Zero for contours with fewer than three points.
    #[must_use]
    pub fn area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let twice: i64 = self
            .closed_edges()
            .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let twice = twice as f64;
        twice.abs() / 2.0
    }

    /// Closed arc length.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.closed_edges().map(|(a, b)| a.distance(b)).sum()
    }

    /// Mean of the boundary points.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> (f64, f64) {
        if self.points.is_empty() {
            return (0.0, 0.0);
        }
        let n = self.points.len() as f64;
        let (sx, sy) = self.points.iter().fold((0.0, 0.0), |(sx, sy), p| {
            (sx + f64::from(p.x), sy + f64::from(p.y))
        });
        (sx / n, sy / n)
    }

    fn closed_edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.points
            .iter()
            .copied()
            .zip(self.points.iter().copied().cycle().skip(1))
    }
}

/// Trace the outermost contours of a binary mask.
///
/// Non-zero pixels are foreground. Contours are returned in discovery
/// order (raster scan of their first pixel).
#[must_use = "returns the external contours"]
#[allow(clippy::cast_possible_wrap)]
pub fn external_contours(mask: &GrayImage) -> Vec<Contour> {
    find_contours::<u32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            Contour::new(
                c.points
                    .into_iter()
                    .map(|p| Point::new(p.x as i32, p.y as i32))
                    .collect(),
            )
        })
        .collect()
}

/// A contour measured for shape classification.
#[derive(Debug, Clone, PartialEq)]
pub struct DefectCandidate {
    /// The traced boundary.
    pub contour: Contour,
    /// Enclosed shoelace area in pixels.
    pub area: f64,
    /// Closed arc length in pixels.
    pub perimeter: f64,
}

impl DefectCandidate {
    /// Measure a contour.
    #[must_use]
    pub fn from_contour(contour: Contour) -> Self {
        let area = contour.area();
        let perimeter = contour.perimeter();
        Self {
            contour,
            area,
            perimeter,
        }
    }

    /// `4π·area/perimeter²`: 1.0 for a perfect circle, smaller for
    /// elongated or ragged shapes.
    ///
    /// `None` when the perimeter is zero.
    #[must_use]
    pub fn circularity(&self) -> Option<f64> {
        if self.perimeter <= 0.0 {
            return None;
        }
        Some(4.0 * PI * self.area / (self.perimeter * self.perimeter))
    }
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::types::FOREGROUND;

    fn square_contour(side: i32) -> Contour {
        Contour::new(vec![
            Point::new(0, 0),
            Point::new(side, 0),
            Point::new(side, side),
            Point::new(0, side),
        ])
    }

    fn disc(size: u32, cx: i32, cy: i32, r: i32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let dx = x.cast_signed() - cx;
            let dy = y.cast_signed() - cy;
            if dx * dx + dy * dy <= r * r {
                Luma([FOREGROUND])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn shoelace_area_of_square() {
        assert!((square_contour(10).area() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn area_ignores_orientation() {
        let mut points = square_contour(4).points().to_vec();
        points.reverse();
        assert!((Contour::new(points).area() - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn perimeter_is_closed() {
        assert!((square_contour(10).perimeter() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn single_point_has_zero_perimeter() {
        let c = DefectCandidate::from_contour(Contour::new(vec![Point::new(3, 3)]));
        assert!(c.perimeter.abs() < f64::EPSILON);
        assert_eq!(c.circularity(), None);
    }

    #[test]
    fn centroid_of_square() {
        assert_eq!(square_contour(10).centroid(), (5.0, 5.0));
    }

    #[test]
    fn empty_mask_has_no_contours() {
        assert!(external_contours(&GrayImage::new(10, 10)).is_empty());
    }

    #[test]
    fn holes_and_nested_regions_are_skipped() {
        // Ring with an island in its hole.
        let img = GrayImage::from_fn(30, 30, |x, y| {
            let inside = |lo: u32, hi: u32| (lo..hi).contains(&x) && (lo..hi).contains(&y);
            if inside(12, 18) || (inside(3, 27) && !inside(8, 22)) {
                Luma([FOREGROUND])
            } else {
                Luma([0])
            }
        });
        let contours = external_contours(&img);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].area() > 400.0);
    }

    #[test]
    fn separate_regions_each_get_a_contour() {
        let img = GrayImage::from_fn(30, 10, |x, _| {
            if (2..6).contains(&x) || (20..25).contains(&x) {
                Luma([FOREGROUND])
            } else {
                Luma([0])
            }
        });
        assert_eq!(external_contours(&img).len(), 2);
    }

    #[test]
    fn disc_is_nearly_circular() {
        let contours = external_contours(&disc(40, 20, 20, 8));
        assert_eq!(contours.len(), 1);
        let candidate = DefectCandidate::from_contour(contours[0].clone());
        let circularity = candidate.circularity().unwrap_or_default();
        assert!(circularity > 0.8, "circularity = {circularity}");
        assert!(circularity <= 1.05, "circularity = {circularity}");
    }

    #[test]
    fn thin_bar_is_not_circular() {
        let img = GrayImage::from_fn(60, 10, |x, y| {
            if (5..55).contains(&x) && (4..7).contains(&y) {
                Luma([FOREGROUND])
            } else {
                Luma([0])
            }
        });
        let contours = external_contours(&img);
        let candidate = DefectCandidate::from_contour(contours[0].clone());
        assert!(candidate.circularity().unwrap_or_default() < 0.3);
    }
}
