//! Annotated overlay: bubble outlines drawn over the resized original.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;

use crate::contour::Contour;

/// Outline color.
pub const BUBBLE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Copy `original` and trace every contour in [`BUBBLE_COLOR`] with a
/// roughly 2 px stroke.
#[must_use = "returns the annotated image"]
pub fn draw_bubbles(original: &RgbImage, contours: &[Contour]) -> RgbImage {
    let mut canvas = original.clone();
    for contour in contours {
        // Border-following contours are 8-connected, so stamping every
        // point yields a continuous stroke.
        for p in contour.points() {
            draw_filled_circle_mut(&mut canvas, (p.x, p.y), 1, BUBBLE_COLOR);
        }
    }
    canvas
}
