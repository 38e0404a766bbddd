//! Canny edge detection with eight-neighbor hysteresis.
//!
//! Same steps as `imageproc::edges::canny` (Gaussian blur with sigma 1.4,
//! Sobel gradients, non-maximum suppression, hysteresis) but hysteresis
//! follows weak edges in all eight directions and stays inside the image.
//! The upstream version skips the north and north-east neighbors, so weak
//! edges reachable only from below a strong edge are dropped
//! (<https://github.com/image-rs/imageproc/issues/705>).

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::{filter_clamped, gaussian_blur_f32};
use imageproc::kernel;

use crate::types::FOREGROUND;

/// Smoothing applied before the gradients.
const SIGMA: f32 = 1.4;

const NEIGHBORS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Gradient direction quantized to the four axes non-maximum suppression
/// compares along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Horizontal,
    Diagonal,
    Vertical,
    AntiDiagonal,
}

impl Direction {
    fn of(gx: i16, gy: i16) -> Self {
        let mut angle = f32::from(gy).atan2(f32::from(gx)).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if !(22.5..157.5).contains(&angle) {
            Self::Horizontal
        } else if angle < 67.5 {
            Self::Diagonal
        } else if angle < 112.5 {
            Self::Vertical
        } else {
            Self::AntiDiagonal
        }
    }
}

/// Binary edge map: [`FOREGROUND`] on edges, 0 elsewhere.
///
/// Callers keep `low <= high`. Images narrower or shorter than 3 pixels
/// have no interior and yield an empty map.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    if image.width() < 3 || image.height() < 3 {
        return GrayImage::new(image.width(), image.height());
    }
    let blurred = gaussian_blur_f32(image, SIGMA);
    let gx: Image<Luma<i16>> = filter_clamped(&blurred, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(&blurred, kernel::SOBEL_VERTICAL_3X3);
    let magnitude: Image<Luma<f32>> = Image::from_fn(image.width(), image.height(), |x, y| {
        let h = f32::from(gx.get_pixel(x, y).0[0]);
        let v = f32::from(gy.get_pixel(x, y).0[0]);
        Luma([h.hypot(v)])
    });
    let thinned = suppress_non_maxima(&magnitude, &gx, &gy);
    hysteresis(&thinned, low, high)
}

/// Zero every pixel that is not a local maximum across its gradient.
/// The one-pixel image border is always zeroed.
fn suppress_non_maxima(
    magnitude: &Image<Luma<f32>>,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Image<Luma<f32>> {
    let (w, h) = magnitude.dimensions();
    let mut out = Image::from_pixel(w, h, Luma([0.0f32]));
    let at = |x: u32, y: u32| magnitude.get_pixel(x, y).0[0];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let value = at(x, y);
            let (a, b) = match Direction::of(gx.get_pixel(x, y).0[0], gy.get_pixel(x, y).0[0]) {
                Direction::Horizontal => (at(x - 1, y), at(x + 1, y)),
                Direction::Diagonal => (at(x + 1, y + 1), at(x - 1, y - 1)),
                Direction::Vertical => (at(x, y - 1), at(x, y + 1)),
                Direction::AntiDiagonal => (at(x - 1, y + 1), at(x + 1, y - 1)),
            };
            if value >= a && value >= b {
                out.put_pixel(x, y, Luma([value]));
            }
        }
    }
    out
}

fn neighbors(x: u32, y: u32, w: u32, h: u32) -> impl Iterator<Item = (u32, u32)> {
    NEIGHBORS.into_iter().filter_map(move |(dx, dy)| {
        let nx = u32::try_from(i64::from(x) + dx).ok()?;
        let ny = u32::try_from(i64::from(y) + dy).ok()?;
        (nx < w && ny < h).then_some((nx, ny))
    })
}

/// Keep pixels at or above `high`, plus every pixel at or above `low`
/// connected to one of them through 8-connected pixels at or above `low`.
fn hysteresis(thinned: &Image<Luma<f32>>, low: f32, high: f32) -> GrayImage {
    let (w, h) = thinned.dimensions();
    let mut out = GrayImage::new(w, h);
    let mut stack = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if thinned.get_pixel(x, y).0[0] < high || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma([FOREGROUND]));
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                for (nx, ny) in neighbors(cx, cy, w, h) {
                    if thinned.get_pixel(nx, ny).0[0] >= low && out.get_pixel(nx, ny).0[0] == 0 {
                        out.put_pixel(nx, ny, Luma([FOREGROUND]));
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}
