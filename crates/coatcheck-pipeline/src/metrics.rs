//! Scalar quality metrics from the per-stage counts.

use crate::bubble::BubbleSummary;
use crate::region::nonzero_area;
use crate::types::{InspectionError, Metrics};

/// Pixel counts gathered by the detection stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaCounts {
    /// Board footprint pixels.
    pub pcb_area: u64,
    /// Uncoated pixels inside the footprint.
    pub void_area: u64,
    /// Edge pixels inside the footprint.
    pub crack_pixel_count: u64,
}

/// Aggregate the stage outputs into [`Metrics`].
///
/// Coverage and void ratio share the `pcb_area` denominator and add up to
/// 100.
///
/// # Errors
///
/// Returns [`InspectionError::DegenerateRegion`] when `pcb_area` is zero.
#[allow(clippy::cast_precision_loss)]
pub fn compute_metrics(
    counts: AreaCounts,
    bubbles: &BubbleSummary,
    thickness_std: Option<f64>,
) -> Result<Metrics, InspectionError> {
    let pcb_area = nonzero_area(counts.pcb_area)?;
    let total = pcb_area as f64;
    let void = counts.void_area.min(pcb_area) as f64;

    Ok(Metrics {
        coverage_pct: (total - void) / total * 100.0,
        void_ratio_pct: void / total * 100.0,
        bubble_count: bubbles.count(),
        avg_bubble_confidence: bubbles.average_confidence(),
        crack_density: counts.crack_pixel_count as f64 / total,
        thickness_std,
        pcb_area,
        void_area: counts.void_area,
        crack_pixel_count: counts.crack_pixel_count,
    })
}
