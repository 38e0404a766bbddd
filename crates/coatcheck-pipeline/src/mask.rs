//! Binary mask algebra and morphology.
//!
//! Masks are [`GrayImage`]s holding only [`FOREGROUND`] and
//! [`BACKGROUND`]. Any non-zero pixel is read as foreground, so masks
//! produced elsewhere (for example by Canny) can be combined directly.

use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

use crate::types::{BACKGROUND, FOREGROUND};

/// Whether a mask pixel counts as foreground.
#[must_use]
pub const fn is_set(value: u8) -> bool {
    value != BACKGROUND
}

const fn to_mask(set: bool) -> Luma<u8> {
    if set { Luma([FOREGROUND]) } else { Luma([BACKGROUND]) }
}

/// Pixel-wise `lhs AND rhs`.
#[must_use = "returns the intersection mask"]
pub fn and(lhs: &GrayImage, rhs: &GrayImage) -> GrayImage {
    GrayImage::from_fn(lhs.width(), lhs.height(), |x, y| {
        to_mask(is_set(lhs.get_pixel(x, y).0[0]) && is_set(rhs.get_pixel(x, y).0[0]))
    })
}

/// Pixel-wise `lhs AND NOT rhs`.
#[must_use = "returns the difference mask"]
pub fn and_not(lhs: &GrayImage, rhs: &GrayImage) -> GrayImage {
    GrayImage::from_fn(lhs.width(), lhs.height(), |x, y| {
        to_mask(is_set(lhs.get_pixel(x, y).0[0]) && !is_set(rhs.get_pixel(x, y).0[0]))
    })
}

/// Number of foreground pixels.
#[must_use]
pub fn count_foreground(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| is_set(p.0[0])).count() as u64
}

/// Largest supported structuring element side.
pub const MAX_ELEMENT_SIZE: u32 = 511;

/// A binary structuring element anchored at its center.
///
/// Holds both the element raster and the [`Mask`] built from it, which
/// drives [`imageproc::morphology::grayscale_dilate`] and
/// [`imageproc::morphology::grayscale_erode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    shape: GrayImage,
    mask: Mask,
}

impl StructuringElement {
    /// The ellipse inscribed in a `size`x`size` square, anchored at its
    /// center.
    ///
    /// Size 5 gives the familiar rounded cross: full rows at `dy` in
    /// `-1..=1` and a single pixel at `dy = ±2`. Even sizes are rounded up
    /// to the next odd size; 0 and 1 give the single-pixel element. Sizes
    /// above [`MAX_ELEMENT_SIZE`] are clamped.
    #[must_use]
    pub fn ellipse(size: u32) -> Self {
        let r = size.min(MAX_ELEMENT_SIZE - 1) / 2;
        let side = 2 * r + 1;
        let r_f = f64::from(r);
        let shape = GrayImage::from_fn(side, side, |x, y| {
            if r == 0 {
                return to_mask(true);
            }
            let dy = f64::from(y) - r_f;
            let dx = (f64::from(x) - r_f).abs();
            let half = (r_f * ((r_f * r_f - dy * dy) / (r_f * r_f)).sqrt()).round();
            to_mask(dx <= half)
        });
        // `r` is at most 255 after the clamp above.
        let center = u8::try_from(r).unwrap_or(u8::MAX);
        let mask = Mask::from_image(&shape, center, center);
        Self { shape, mask }
    }

    /// Number of pixels in the element.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from(count_foreground(&self.shape)).unwrap_or(usize::MAX)
    }

    /// Whether the element has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `(dx, dy)` is part of the element.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn contains(&self, dx: i32, dy: i32) -> bool {
        let r = (self.shape.width() / 2) as i32;
        let (x, y) = (dx + r, dy + r);
        if x < 0 || y < 0 {
            return false;
        }
        self.shape
            .get_pixel_checked(x as u32, y as u32)
            .is_some_and(|p| is_set(p.0[0]))
    }
}

/// Map every non-zero pixel to [`FOREGROUND`].
fn binarize(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        to_mask(is_set(mask.get_pixel(x, y).0[0]))
    })
}

/// Set every pixel whose element-shaped neighborhood touches foreground.
///
/// Pixels outside the image never contribute.
#[must_use = "returns the dilated mask"]
pub fn dilate(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_dilate(&binarize(mask), &element.mask)
}

/// Keep only pixels whose whole element-shaped neighborhood is foreground.
///
/// Pixels outside the image are ignored, so the image border does not
/// erode the mask.
#[must_use = "returns the eroded mask"]
pub fn erode(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_erode(&binarize(mask), &element.mask)
}

/// Dilate `iterations` times, then erode as many times.
///
/// Fills gaps and pinholes narrower than the element.
#[must_use = "returns the closed mask"]
pub fn close(mask: &GrayImage, element: &StructuringElement, iterations: u32) -> GrayImage {
    let mut out = binarize(mask);
    for _ in 0..iterations {
        out = grayscale_dilate(&out, &element.mask);
    }
    for _ in 0..iterations {
        out = grayscale_erode(&out, &element.mask);
    }
    out
}

/// Erode `iterations` times, then dilate as many times.
///
/// Removes specks narrower than the element.
#[must_use = "returns the opened mask"]
pub fn open(mask: &GrayImage, element: &StructuringElement, iterations: u32) -> GrayImage {
    let mut out = binarize(mask);
    for _ in 0..iterations {
        out = grayscale_erode(&out, &element.mask);
    }
    for _ in 0..iterations {
        out = grayscale_dilate(&out, &element.mask);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: u32, lo: u32, hi: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            to_mask((lo..hi).contains(&x) && (lo..hi).contains(&y))
        })
    }

    #[test]
    fn ellipse_5_is_rounded_cross() {
        let e = StructuringElement::ellipse(5);
        assert_eq!(e.len(), 17);
        assert!(e.contains(0, -2));
        assert!(e.contains(2, 1));
        assert!(e.contains(-2, -1));
        assert!(!e.contains(1, 2));
        assert!(!e.contains(-2, 2));
    }

    #[test]
    fn ellipse_1_is_single_pixel() {
        let e = StructuringElement::ellipse(1);
        assert_eq!(e.len(), 1);
        assert!(e.contains(0, 0));
    }

    #[test]
    fn and_not_subtracts() {
        let a = square(10, 0, 10);
        let b = square(10, 2, 8);
        let diff = and_not(&a, &b);
        assert_eq!(count_foreground(&diff), 100 - 36);
        assert_eq!(count_foreground(&and(&a, &b)), 36);
    }

    #[test]
    fn dilate_grows_single_pixel_to_element() {
        let mut img = GrayImage::new(9, 9);
        img.put_pixel(4, 4, Luma([FOREGROUND]));
        let out = dilate(&img, &StructuringElement::ellipse(5));
        assert_eq!(count_foreground(&out), 17);
    }

    #[test]
    fn erode_ignores_image_border() {
        let full = GrayImage::from_pixel(6, 6, Luma([FOREGROUND]));
        let out = erode(&full, &StructuringElement::ellipse(5));
        assert_eq!(out, full);
    }

    #[test]
    fn close_fills_pinhole() {
        let mut img = square(20, 2, 18);
        img.put_pixel(10, 10, Luma([BACKGROUND]));
        let out = close(&img, &StructuringElement::ellipse(5), 2);
        assert!(is_set(out.get_pixel(10, 10).0[0]));
    }

    #[test]
    fn open_removes_speck() {
        let mut img = square(30, 5, 25);
        img.put_pixel(1, 1, Luma([FOREGROUND]));
        let out = open(&img, &StructuringElement::ellipse(5), 1);
        assert!(!is_set(out.get_pixel(1, 1).0[0]));
        assert!(is_set(out.get_pixel(15, 15).0[0]));
    }

    #[test]
    fn non_binary_values_count_as_foreground() {
        let img = GrayImage::from_pixel(3, 3, Luma([7]));
        assert_eq!(count_foreground(&img), 9);
    }

    #[test]
    fn ellipse_size_is_clamped() {
        let e = StructuringElement::ellipse(2001);
        assert!(e.contains(0, 255));
        assert!(!e.contains(0, 256));
    }

    #[test]
    fn erode_keeps_foreground_touching_border() {
        // A bar along the left edge, 3 px wide: the element reaches past
        // the border but only the inner side is checked.
        let img = GrayImage::from_fn(12, 12, |x, _| to_mask(x < 3));
        let out = erode(&img, &StructuringElement::ellipse(3));
        assert!(is_set(out.get_pixel(0, 5).0[0]));
        assert!(is_set(out.get_pixel(1, 5).0[0]));
        assert!(!is_set(out.get_pixel(2, 5).0[0]));
    }

    #[test]
    fn dilate_does_not_wrap_around_edges() {
        let mut img = GrayImage::new(8, 8);
        img.put_pixel(0, 0, Luma([FOREGROUND]));
        let out = dilate(&img, &StructuringElement::ellipse(5));
        assert!(is_set(out.get_pixel(2, 0).0[0]));
        assert!(is_set(out.get_pixel(0, 2).0[0]));
        assert!(!is_set(out.get_pixel(7, 0).0[0]));
        assert!(!is_set(out.get_pixel(0, 7).0[0]));
        assert!(!is_set(out.get_pixel(2, 2).0[0]));
    }

    #[test]
    fn morphology_outputs_are_binary() {
        let img = GrayImage::from_fn(16, 16, |x, y| {
            Luma([if (4..12).contains(&x) && y > 3 { 7 } else { 0 }])
        });
        let element = StructuringElement::ellipse(5);
        for out in [close(&img, &element, 2), open(&img, &element, 1), dilate(&img, &element)] {
            assert!(out.pixels().all(|p| p.0[0] == FOREGROUND || p.0[0] == BACKGROUND));
        }
    }
}
