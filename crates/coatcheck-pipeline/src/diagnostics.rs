//! Inspection diagnostics: timing and per-stage measurements.
//!
//! [`inspect_with_diagnostics`] runs the staged pipeline and records how
//! long each stage took together with the stage's [`StageMetrics`]. The
//! clock is injected through the [`Clock`] trait so the core stays free of
//! platform time sources and tests can use a deterministic clock.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decision::Grade;
use crate::pipeline::{Inspection, PipelineStage};
use crate::types::{InspectionError, StagedInspection};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single inspection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Decoding and resizing to the working resolution.
    pub decode: StageDiagnostics,
    /// Score and intensity channel extraction.
    pub preprocess: StageDiagnostics,
    /// Thresholding and morphological cleanup.
    pub segment: StageDiagnostics,
    /// Board footprint isolation.
    pub isolate: StageDiagnostics,
    /// Void detection.
    pub voids: StageDiagnostics,
    /// Crack detection.
    pub cracks: StageDiagnostics,
    /// Bubble classification and overlay drawing.
    pub bubbles: StageDiagnostics,
    /// Thickness analysis (timed even when disabled).
    pub thickness: StageDiagnostics,
    /// Metrics aggregation and verdict.
    pub decide: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Headline numbers of the run.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific measurements.
    pub metrics: StageMetrics,
}

/// Stage-specific measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Raw input, before any processing.
    Source {
        /// Size of the encoded input.
        input_bytes: usize,
    },
    /// Decoding and resizing.
    Decode {
        /// Size of the encoded input (0 when starting from a decoded image).
        input_bytes: usize,
        /// Decoded width before resizing.
        source_width: u32,
        /// Decoded height before resizing.
        source_height: u32,
        /// Working width.
        width: u32,
        /// Working height.
        height: u32,
    },
    /// Channel extraction.
    Preprocess {
        /// Name of the contrast strategy.
        strategy: String,
        /// Mean of the score channel.
        mean_score: f64,
    },
    /// Segmentation.
    Segment {
        /// Otsu threshold.
        otsu_level: u8,
        /// Foreground pixels of the cleaned coating mask.
        coating_pixels: u64,
    },
    /// Board isolation.
    Isolate {
        /// External contours that competed.
        candidate_count: usize,
        /// Filled footprint pixels.
        pcb_area: u64,
    },
    /// Void detection.
    Voids {
        /// Uncoated pixels inside the footprint.
        void_area: u64,
    },
    /// Crack detection.
    Cracks {
        /// Low hysteresis threshold (after clamping).
        low_threshold: f32,
        /// High hysteresis threshold (after clamping).
        high_threshold: f32,
        /// Edge pixels inside the footprint.
        crack_pixel_count: u64,
    },
    /// Bubble classification.
    Bubbles {
        /// Contours examined.
        candidates: usize,
        /// Contours accepted as bubbles.
        bubble_count: u32,
        /// In-band contours skipped for zero perimeter.
        degenerate: usize,
        /// Mean circularity of the accepted bubbles.
        avg_confidence: f64,
    },
    /// Thickness analysis.
    Thickness {
        /// Smoothing kernel, `None` when the analysis is disabled.
        kernel_size: Option<u32>,
        /// Score spread over the footprint.
        std_dev: Option<f64>,
    },
    /// Verdict.
    Decide {
        /// Applied scheme.
        scheme: String,
        /// Verdict label.
        label: String,
        /// Verdict grade.
        grade: Grade,
    },
}

/// Headline numbers of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Working width in pixels.
    pub image_width: u32,
    /// Working height in pixels.
    pub image_height: u32,
    /// Board footprint pixels.
    pub pcb_area: u64,
    /// Accepted bubbles.
    pub bubble_count: u32,
    /// Verdict grade.
    pub grade: Grade,
}

impl PipelineDiagnostics {
    /// Stages in execution order, with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 9] {
        [
            ("Decode", &self.decode),
            ("Preprocess", &self.preprocess),
            ("Segment", &self.segment),
            ("Isolate", &self.isolate),
            ("Voids", &self.voids),
            ("Cracks", &self.cracks),
            ("Bubbles", &self.bubbles),
            ("Thickness", &self.thickness),
            ("Decide", &self.decide),
        ]
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Inspection Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}  |  PCB area: {} px",
            self.summary.image_width, self.summary.image_height, self.summary.pcb_area,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration)
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<14} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<14} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Bubbles: {}  |  Grade: {}",
            self.summary.bubble_count, self.summary.grade,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Source { input_bytes } => format!("{input_bytes} bytes"),
        StageMetrics::Decode {
            input_bytes,
            source_width,
            source_height,
            width,
            height,
        } => format!("{input_bytes} bytes, {source_width}x{source_height} -> {width}x{height}"),
        StageMetrics::Preprocess {
            strategy,
            mean_score,
        } => format!("{strategy} mean_score={mean_score:.1}"),
        StageMetrics::Segment {
            otsu_level,
            coating_pixels,
        } => format!("otsu={otsu_level} coating={coating_pixels}"),
        StageMetrics::Isolate {
            candidate_count,
            pcb_area,
        } => format!("{candidate_count} regions, pcb_area={pcb_area}"),
        StageMetrics::Voids { void_area } => format!("void_area={void_area}"),
        StageMetrics::Cracks {
            low_threshold,
            high_threshold,
            crack_pixel_count,
        } => format!("low={low_threshold:.1} high={high_threshold:.1} edges={crack_pixel_count}"),
        StageMetrics::Bubbles {
            candidates,
            bubble_count,
            degenerate,
            avg_confidence,
        } => format!(
            "{bubble_count}/{candidates} contours (skipped {degenerate}) conf={avg_confidence:.2}"
        ),
        StageMetrics::Thickness {
            kernel_size,
            std_dev,
        } => match (kernel_size, std_dev) {
            (Some(k), Some(s)) => format!("k={k} std={s:.2}"),
            _ => "disabled".to_owned(),
        },
        StageMetrics::Decide {
            scheme,
            label,
            grade,
        } => format!("{scheme}: {label} ({grade})"),
    }
}

/// Time one stage transition and capture its metrics.
fn timed<C: Clock, S: PipelineStage>(
    clock: &C,
    advance: impl FnOnce() -> Result<S, InspectionError>,
) -> Result<(S, StageDiagnostics), InspectionError> {
    let start = clock.now();
    let stage = advance()?;
    let duration = clock.elapsed(&start);
    let metrics = stage.metrics();
    Ok((stage, StageDiagnostics { duration, metrics }))
}

/// Run the full inspection, timing every stage.
///
/// # Errors
///
/// Returns the same errors as [`crate::inspect_staged`].
pub fn inspect_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &crate::InspectionConfig,
    clock: &C,
) -> Result<(StagedInspection, PipelineDiagnostics), InspectionError> {
    let start = clock.now();
    let pending = Inspection::new(image_bytes.to_vec(), config.clone());

    let (decoded, decode) = timed(clock, || pending.decode())?;
    let (preprocessed, preprocess) = timed(clock, || Ok(decoded.preprocess()))?;
    let (segmented, segment) = timed(clock, || Ok(preprocessed.segment()))?;
    let (isolated, isolate) = timed(clock, || segmented.isolate())?;
    let (voided, voids) = timed(clock, || Ok(isolated.detect_voids()))?;
    let (cracked, cracks) = timed(clock, || Ok(voided.detect_cracks()))?;
    let (bubbled, bubbles) = timed(clock, || Ok(cracked.detect_bubbles()))?;
    let (thick, thickness) = timed(clock, || Ok(bubbled.analyze_thickness()))?;
    let (decided, decide) = timed(clock, || thick.decide())?;

    let total_duration = clock.elapsed(&start);
    let staged = decided.into_result();
    let summary = PipelineSummary {
        image_width: staged.report.dimensions.width,
        image_height: staged.report.dimensions.height,
        pcb_area: staged.report.metrics.pcb_area,
        bubble_count: staged.report.metrics.bubble_count,
        grade: staged.report.decision.grade,
    };

    Ok((
        staged,
        PipelineDiagnostics {
            decode,
            preprocess,
            segment,
            isolate,
            voids,
            cracks,
            bubbles,
            thickness,
            decide,
            total_duration,
            summary,
        },
    ))
}
