//! Void detection: bare spots inside the board footprint.

use image::GrayImage;

use crate::mask::{and_not, count_foreground};

/// Uncoated pixels inside the footprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoidMap {
    /// `pcb_mask AND NOT coating_mask`.
    pub mask: GrayImage,
    /// Foreground pixel count of `mask`.
    pub area: u64,
}

/// Subtract the coating from the footprint.
#[must_use = "returns the void map"]
pub fn detect_voids(pcb_mask: &GrayImage, coating_mask: &GrayImage) -> VoidMap {
    let mask = and_not(pcb_mask, coating_mask);
    let area = count_foreground(&mask);
    VoidMap { mask, area }
}
