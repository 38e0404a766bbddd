//! Board isolation: the largest coated region, filled, is the PCB
//! footprint.

use std::collections::HashSet;

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::contour::{Contour, external_contours};
use crate::mask::{count_foreground, is_set};
use crate::types::{BACKGROUND, FOREGROUND, InspectionError};

/// The isolated board footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct PcbRegion {
    /// Outer boundary of the selected region.
    pub contour: Contour,
    /// The region with every hole filled.
    pub mask: GrayImage,
    /// Foreground pixel count of `mask`.
    pub area: u64,
    /// How many external contours competed for selection.
    pub candidate_count: usize,
}

/// Select the external contour of `coating_mask` with the largest
/// enclosed area and fill it.
///
/// On equal areas the contour discovered first wins.
///
/// # Errors
///
/// Returns [`InspectionError::NoRegionFound`] if the mask has no
/// foreground, and [`InspectionError::DegenerateRegion`] if the filled
/// footprint is empty.
pub fn isolate(coating_mask: &GrayImage) -> Result<PcbRegion, InspectionError> {
    let contours = external_contours(coating_mask);
    let candidate_count = contours.len();
    let contour = largest_contour(contours).ok_or(InspectionError::NoRegionFound)?;
    let mask = fill_region(coating_mask, &contour);
    let area = nonzero_area(count_foreground(&mask))?;
    Ok(PcbRegion {
        contour,
        mask,
        area,
        candidate_count,
    })
}

/// The contour with the largest shoelace area, first one on ties.
#[must_use]
pub fn largest_contour(contours: Vec<Contour>) -> Option<Contour> {
    contours
        .into_iter()
        .map(|c| (c.area(), c))
        .fold(None, |best: Option<(f64, Contour)>, (area, c)| match best {
            Some((best_area, _)) if area <= best_area => best,
            _ => Some((area, c)),
        })
        .map(|(_, c)| c)
}

/// Reject an empty footprint.
///
/// # Errors
///
/// Returns [`InspectionError::DegenerateRegion`] when `area` is zero.
pub const fn nonzero_area(area: u64) -> Result<u64, InspectionError> {
    if area == 0 {
        Err(InspectionError::DegenerateRegion)
    } else {
        Ok(area)
    }
}

/// Render the region bounded by `contour` as a solid mask: the connected
/// component under the contour plus everything it encloses.
///
/// Enclosed pixels are those background pixels that cannot reach the image
/// border through 4-connected background.
#[must_use = "returns the filled region mask"]
#[allow(clippy::cast_sign_loss)]
pub fn fill_region(mask: &GrayImage, contour: &Contour) -> GrayImage {
    let (w, h) = mask.dimensions();
    let Some(seed) = contour.points().first() else {
        return GrayImage::new(w, h);
    };

    let labels = connected_components(mask, Connectivity::Eight, Luma([BACKGROUND]));
    let target = labels.get_pixel(seed.x as u32, seed.y as u32).0[0];
    if target == 0 {
        return GrayImage::new(w, h);
    }

    // Everything that is not the selected component, labelled by
    // 4-connected reachability.
    let outside = GrayImage::from_fn(w, h, |x, y| {
        if labels.get_pixel(x, y).0[0] == target {
            Luma([BACKGROUND])
        } else {
            Luma([FOREGROUND])
        }
    });
    let outside_labels = connected_components(&outside, Connectivity::Four, Luma([BACKGROUND]));
    let border_labels: HashSet<u32> = border_pixels(w, h)
        .map(|(x, y)| outside_labels.get_pixel(x, y).0[0])
        .filter(|&label| label != 0)
        .collect();

    GrayImage::from_fn(w, h, |x, y| {
        let in_component = !is_set(outside.get_pixel(x, y).0[0]);
        let label = outside_labels.get_pixel(x, y).0[0];
        if in_component || !border_labels.contains(&label) {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}

fn border_pixels(w: u32, h: u32) -> impl Iterator<Item = (u32, u32)> {
    let rows = (0..w).flat_map(move |x| [(x, 0), (x, h.saturating_sub(1))]);
    let cols = (0..h).flat_map(move |y| [(0, y), (w.saturating_sub(1), y)]);
    rows.chain(cols)
}
