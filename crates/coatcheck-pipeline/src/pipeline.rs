//! Incremental inspection: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::inspect_staged`] which runs every stage in one call,
//! [`Inspection`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use coatcheck_pipeline::{Inspection, InspectionConfig, InspectionError};
//! # fn run(png: Vec<u8>) -> Result<(), InspectionError> {
//! let config = InspectionConfig::default();
//! let inspection = Inspection::new(png, config)
//!     .decode()?
//!     .preprocess()
//!     .segment()
//!     .isolate()?
//!     .detect_voids()
//!     .detect_cracks()
//!     .detect_bubbles()
//!     .analyze_thickness()
//!     .decide()?;
//!
//! let staged = inspection.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state (or
//! `Result` for fallible stages), carrying every intermediate the later
//! stages or [`StagedInspection`] need.

use image::{DynamicImage, GenericImageView};
use tracing::{debug, warn};

use crate::bubble::{BubbleSummary, detect_bubbles};
use crate::config::InspectionConfig;
use crate::crack::{CrackMap, detect_cracks};
use crate::decode::{decode, resize_to};
use crate::diagnostics::StageMetrics;
use crate::mask::count_foreground;
use crate::metrics::{AreaCounts, compute_metrics};
use crate::overlay::draw_bubbles;
use crate::preprocess::{ContrastChannels, ContrastExtractor};
use crate::region::{PcbRegion, isolate};
use crate::segment::{Segmentation, segment};
use crate::thickness::{ThicknessMap, analyze_thickness};
use crate::types::{
    Dimensions, GrayImage, InspectionError, InspectionReport, RgbImage, StagedInspection,
};
use crate::void::{VoidMap, detect_voids};

fn dimensions_of(image: &RgbImage) -> Dimensions {
    Dimensions {
        width: image.width(),
        height: image.height(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_value(image: &GrayImage) -> f64 {
    let n = u64::from(image.width()) * u64::from(image.height());
    if n == 0 {
        return 0.0;
    }
    let sum: u64 = image.pixels().map(|p| u64::from(p.0[0])).sum();
    sum as f64 / n as f64
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Inspection state before any processing has occurred.
///
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "inspection stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    config: InspectionConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the config, decode the source and resize it to the
    /// working resolution.
    ///
    /// # Errors
    ///
    /// Returns [`InspectionError::InvalidConfig`] for a bad config,
    /// [`InspectionError::EmptyInput`] for empty bytes and
    /// [`InspectionError::ImageDecode`] for unreadable data.
    pub fn decode(self) -> Result<Decoded, InspectionError> {
        self.config.validate()?;
        let image = decode(&self.source)?;
        Ok(Decoded::resize(&image, self.config, self.source.len()))
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Inspection state after decoding and resizing.
///
/// Call [`preprocess`](Self::preprocess) to advance.
#[must_use = "inspection stages are consumed by advancing; call .preprocess() to continue"]
pub struct Decoded {
    config: InspectionConfig,
    source_len: usize,
    source_dimensions: Dimensions,
    original: RgbImage,
}

impl Decoded {
    fn resize(image: &DynamicImage, config: InspectionConfig, source_len: usize) -> Self {
        let (width, height) = image.dimensions();
        let original = resize_to(image, config.canonical_size, config.resize_filter);
        debug!(
            width,
            height,
            resized = %format!("{}x{}", original.width(), original.height()),
            filter = %config.resize_filter,
            "decoded"
        );
        Self {
            config,
            source_len,
            source_dimensions: Dimensions { width, height },
            original,
        }
    }

    /// The resized color image.
    #[must_use]
    pub const fn original(&self) -> &RgbImage {
        &self.original
    }

    /// Size of the image before resizing.
    #[must_use]
    pub const fn source_dimensions(&self) -> Dimensions {
        self.source_dimensions
    }

    /// Derive the score and intensity channels.
    pub fn preprocess(self) -> Preprocessed {
        let channels = self.config.contrast.extract(&self.original);
        debug!(strategy = self.config.contrast.name(), "preprocessed");
        Preprocessed {
            config: self.config,
            original: self.original,
            channels,
        }
    }
}

// ──────────────────────── Stage 2: Preprocessed ──────────────────────

/// Inspection state after channel extraction.
///
/// Call [`segment`](Self::segment) to advance.
#[must_use = "inspection stages are consumed by advancing; call .segment() to continue"]
pub struct Preprocessed {
    config: InspectionConfig,
    original: RgbImage,
    channels: ContrastChannels,
}

impl Preprocessed {
    /// The coating score channel.
    #[must_use]
    pub const fn score(&self) -> &GrayImage {
        &self.channels.score
    }

    /// The intensity channel used for crack detection.
    #[must_use]
    pub const fn intensity(&self) -> &GrayImage {
        &self.channels.intensity
    }

    /// Threshold the score and clean up the resulting mask.
    pub fn segment(self) -> Segmented {
        let segmentation = segment(
            &self.channels.score,
            self.config.segment_bilateral.as_ref(),
            &self.config.morphology,
        );
        debug!(otsu_level = segmentation.otsu_level, "segmented");
        Segmented {
            config: self.config,
            original: self.original,
            channels: self.channels,
            segmentation,
        }
    }
}

// ───────────────────────── Stage 3: Segmented ────────────────────────

/// Inspection state after coating segmentation.
///
/// Call [`isolate`](Self::isolate) to advance.
#[must_use = "inspection stages are consumed by advancing; call .isolate() to continue"]
pub struct Segmented {
    config: InspectionConfig,
    original: RgbImage,
    channels: ContrastChannels,
    segmentation: Segmentation,
}

impl Segmented {
    /// The cleaned coating mask.
    #[must_use]
    pub const fn coating_mask(&self) -> &GrayImage {
        &self.segmentation.mask
    }

    /// The Otsu threshold chosen for the score channel.
    #[must_use]
    pub const fn otsu_level(&self) -> u8 {
        self.segmentation.otsu_level
    }

    /// Take the largest coated region as the board footprint.
    ///
    /// # Errors
    ///
    /// Returns [`InspectionError::NoRegionFound`] if nothing was segmented
    /// and [`InspectionError::DegenerateRegion`] if the footprint is empty.
    pub fn isolate(self) -> Result<Isolated, InspectionError> {
        let region = isolate(&self.segmentation.mask)?;
        debug!(
            pcb_area = region.area,
            candidates = region.candidate_count,
            "isolated board"
        );
        Ok(Isolated {
            config: self.config,
            original: self.original,
            channels: self.channels,
            coating_mask: self.segmentation.mask,
            region,
        })
    }
}

// ───────────────────────── Stage 4: Isolated ─────────────────────────

/// Inspection state after board isolation.
///
/// Call [`detect_voids`](Self::detect_voids) to advance.
#[must_use = "inspection stages are consumed by advancing; call .detect_voids() to continue"]
pub struct Isolated {
    config: InspectionConfig,
    original: RgbImage,
    channels: ContrastChannels,
    coating_mask: GrayImage,
    region: PcbRegion,
}

impl Isolated {
    /// The board footprint.
    #[must_use]
    pub const fn region(&self) -> &PcbRegion {
        &self.region
    }

    /// Subtract the coating from the footprint.
    pub fn detect_voids(self) -> VoidsDetected {
        let voids = detect_voids(&self.region.mask, &self.coating_mask);
        debug!(void_area = voids.area, "voids detected");
        VoidsDetected {
            config: self.config,
            original: self.original,
            channels: self.channels,
            coating_mask: self.coating_mask,
            region: self.region,
            voids,
        }
    }
}

// ─────────────────────── Stage 5: VoidsDetected ──────────────────────

/// Inspection state after void detection.
///
/// Call [`detect_cracks`](Self::detect_cracks) to advance.
#[must_use = "inspection stages are consumed by advancing; call .detect_cracks() to continue"]
pub struct VoidsDetected {
    config: InspectionConfig,
    original: RgbImage,
    channels: ContrastChannels,
    coating_mask: GrayImage,
    region: PcbRegion,
    voids: VoidMap,
}

impl VoidsDetected {
    /// The void map.
    #[must_use]
    pub const fn voids(&self) -> &VoidMap {
        &self.voids
    }

    /// Find edges of the intensity channel inside the footprint.
    pub fn detect_cracks(self) -> CracksDetected {
        let cracks = detect_cracks(&self.channels.intensity, &self.region.mask, &self.config.canny);
        debug!(crack_pixels = cracks.pixel_count, "cracks detected");
        CracksDetected {
            config: self.config,
            original: self.original,
            channels: self.channels,
            coating_mask: self.coating_mask,
            region: self.region,
            voids: self.voids,
            cracks,
        }
    }
}

// ────────────────────── Stage 6: CracksDetected ──────────────────────

/// Inspection state after crack detection.
///
/// Call [`detect_bubbles`](Self::detect_bubbles) to advance.
#[must_use = "inspection stages are consumed by advancing; call .detect_bubbles() to continue"]
pub struct CracksDetected {
    config: InspectionConfig,
    original: RgbImage,
    channels: ContrastChannels,
    coating_mask: GrayImage,
    region: PcbRegion,
    voids: VoidMap,
    cracks: CrackMap,
}

impl CracksDetected {
    /// The crack map.
    #[must_use]
    pub const fn cracks(&self) -> &CrackMap {
        &self.cracks
    }

    /// Classify coating blobs as bubbles and draw the overlay.
    pub fn detect_bubbles(self) -> BubblesDetected {
        let bubbles = detect_bubbles(&self.coating_mask, &self.config.bubbles);
        if bubbles.degenerate > 0 {
            warn!(
                skipped = bubbles.degenerate,
                "skipped bubble candidates with zero perimeter"
            );
        }
        debug!(
            bubbles = bubbles.count(),
            candidates = bubbles.candidates,
            "bubbles detected"
        );
        let overlay = draw_bubbles(&self.original, &bubbles.contours);
        BubblesDetected {
            config: self.config,
            original: self.original,
            channels: self.channels,
            coating_mask: self.coating_mask,
            region: self.region,
            voids: self.voids,
            cracks: self.cracks,
            bubbles,
            overlay,
        }
    }
}

// ────────────────────── Stage 7: BubblesDetected ─────────────────────

/// Inspection state after bubble classification.
///
/// Call [`analyze_thickness`](Self::analyze_thickness) to advance.
#[must_use = "inspection stages are consumed by advancing; call .analyze_thickness() to continue"]
pub struct BubblesDetected {
    config: InspectionConfig,
    original: RgbImage,
    channels: ContrastChannels,
    coating_mask: GrayImage,
    region: PcbRegion,
    voids: VoidMap,
    cracks: CrackMap,
    bubbles: BubbleSummary,
    overlay: RgbImage,
}

impl BubblesDetected {
    /// The bubble classification result.
    #[must_use]
    pub const fn bubbles(&self) -> &BubbleSummary {
        &self.bubbles
    }

    /// The annotated overlay.
    #[must_use]
    pub const fn overlay(&self) -> &RgbImage {
        &self.overlay
    }

    /// Measure score uniformity over the footprint, if enabled.
    pub fn analyze_thickness(self) -> ThicknessAnalyzed {
        let thickness = self
            .config
            .thickness
            .as_ref()
            .map(|cfg| analyze_thickness(&self.channels.score, &self.region.mask, cfg));
        match &thickness {
            Some(map) => debug!(std_dev = map.std_dev, "thickness analyzed"),
            None => debug!("thickness analysis disabled"),
        }
        ThicknessAnalyzed {
            config: self.config,
            original: self.original,
            channels: self.channels,
            coating_mask: self.coating_mask,
            region: self.region,
            voids: self.voids,
            cracks: self.cracks,
            bubbles: self.bubbles,
            overlay: self.overlay,
            thickness,
        }
    }
}

// ───────────────────── Stage 8: ThicknessAnalyzed ────────────────────

/// Inspection state after thickness analysis.
///
/// Call [`decide`](Self::decide) to advance.
#[must_use = "inspection stages are consumed by advancing; call .decide() to continue"]
pub struct ThicknessAnalyzed {
    config: InspectionConfig,
    original: RgbImage,
    channels: ContrastChannels,
    coating_mask: GrayImage,
    region: PcbRegion,
    voids: VoidMap,
    cracks: CrackMap,
    bubbles: BubbleSummary,
    overlay: RgbImage,
    thickness: Option<ThicknessMap>,
}

impl ThicknessAnalyzed {
    /// The thickness map, `None` when the analysis is disabled.
    #[must_use]
    pub const fn thickness(&self) -> Option<&ThicknessMap> {
        self.thickness.as_ref()
    }

    /// Compute the metrics and apply the configured decision scheme.
    ///
    /// # Errors
    ///
    /// Returns [`InspectionError::DegenerateRegion`] for an empty
    /// footprint and [`InspectionError::InvalidConfig`] for an unknown
    /// scheme.
    pub fn decide(self) -> Result<Decided, InspectionError> {
        let counts = AreaCounts {
            pcb_area: self.region.area,
            void_area: self.voids.area,
            crack_pixel_count: self.cracks.pixel_count,
        };
        let metrics = compute_metrics(
            counts,
            &self.bubbles,
            self.thickness.as_ref().map(|t| t.std_dev),
        )?;
        let decision = self
            .config
            .decision_table
            .evaluate(&self.config.decision_scheme, &metrics)?;
        debug!(
            scheme = %decision.scheme,
            label = %decision.label,
            grade = %decision.grade,
            "decided"
        );

        let report = InspectionReport {
            metrics,
            decision,
            bubbles: self.bubbles.bubbles,
            dimensions: dimensions_of(&self.original),
        };
        Ok(Decided {
            staged: StagedInspection {
                original: self.original,
                score: self.channels.score,
                intensity: self.channels.intensity,
                coating_mask: self.coating_mask,
                pcb_mask: self.region.mask,
                void_mask: self.voids.mask,
                crack_mask: self.cracks.mask,
                thickness_map: self.thickness.map(|t| t.smoothed),
                overlay: self.overlay,
                report,
            },
        })
    }
}

// ───────────────────────── Stage 9: Decided ──────────────────────────

/// Final inspection state.
///
/// Call [`into_result`](Self::into_result) to take the intermediates and
/// the report.
#[must_use = "call .into_result() to take the inspection output"]
pub struct Decided {
    staged: StagedInspection,
}

impl Decided {
    /// The inspection report.
    #[must_use]
    pub const fn report(&self) -> &InspectionReport {
        &self.staged.report
    }

    /// Consume the final stage.
    pub fn into_result(self) -> StagedInspection {
        self.staged
    }
}

// ──────────────────── PipelineStage trait + Stage enum ────────────────

/// Total number of stages in the inspection.
pub const STAGE_COUNT: usize = 10;

/// Common interface of every stage.
pub trait PipelineStage: Sized {
    /// Human-readable stage name.
    const NAME: &'static str;
    /// Zero-based position in the pipeline.
    const INDEX: usize;

    /// Measurements describing what this stage produced.
    fn metrics(&self) -> StageMetrics;

    /// Advance one stage; `Ok(None)` once complete.
    ///
    /// # Errors
    ///
    /// Returns [`InspectionError`] if the transition fails.
    fn next(self) -> Result<Option<Stage>, InspectionError>;

    /// Run every remaining stage.
    ///
    /// # Errors
    ///
    /// Returns [`InspectionError`] if any remaining stage fails.
    fn complete(self) -> Result<StagedInspection, InspectionError>;
}

impl PipelineStage for Pending {
    const NAME: &'static str = "source";
    const INDEX: usize = 0;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Source {
            input_bytes: self.source.len(),
        }
    }

    fn next(self) -> Result<Option<Stage>, InspectionError> {
        Ok(Some(self.decode()?.into()))
    }

    fn complete(self) -> Result<StagedInspection, InspectionError> {
        self.decode()?.complete()
    }
}

impl PipelineStage for Decoded {
    const NAME: &'static str = "decode";
    const INDEX: usize = 1;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Decode {
            input_bytes: self.source_len,
            source_width: self.source_dimensions.width,
            source_height: self.source_dimensions.height,
            width: self.original.width(),
            height: self.original.height(),
        }
    }

    fn next(self) -> Result<Option<Stage>, InspectionError> {
        Ok(Some(self.preprocess().into()))
    }

    fn complete(self) -> Result<StagedInspection, InspectionError> {
        self.preprocess().complete()
    }
}

impl PipelineStage for Preprocessed {
    const NAME: &'static str = "preprocess";
    const INDEX: usize = 2;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Preprocess {
            strategy: self.config.contrast.name().to_owned(),
            mean_score: mean_value(&self.channels.score),
        }
    }

    fn next(self) -> Result<Option<Stage>, InspectionError> {
        Ok(Some(self.segment().into()))
    }

    fn complete(self) -> Result<StagedInspection, InspectionError> {
        self.segment().complete()
    }
}

impl PipelineStage for Segmented {
    const NAME: &'static str = "segment";
    const INDEX: usize = 3;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Segment {
            otsu_level: self.segmentation.otsu_level,
            coating_pixels: count_foreground(&self.segmentation.mask),
        }
    }

    fn next(self) -> Result<Option<Stage>, InspectionError> {
        Ok(Some(self.isolate()?.into()))
    }

    fn complete(self) -> Result<StagedInspection, InspectionError> {
        self.isolate()?.complete()
    }
}

impl PipelineStage for Isolated {
    const NAME: &'static str = "isolate";
    const INDEX: usize = 4;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Isolate {
            candidate_count: self.region.candidate_count,
            pcb_area: self.region.area,
        }
    }

    fn next(self) -> Result<Option<Stage>, InspectionError> {
        Ok(Some(self.detect_voids().into()))
    }

    fn complete(self) -> Result<StagedInspection, InspectionError> {
        self.detect_voids().complete()
    }
}

impl PipelineStage for VoidsDetected {
    const NAME: &'static str = "voids";
    const INDEX: usize = 5;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Voids {
            void_area: self.voids.area,
        }
    }

    fn next(self) -> Result<Option<Stage>, InspectionError> {
        Ok(Some(self.detect_cracks().into()))
    }

    fn complete(self) -> Result<StagedInspection, InspectionError> {
        self.detect_cracks().complete()
    }
}

impl PipelineStage for CracksDetected {
    const NAME: &'static str = "cracks";
    const INDEX: usize = 6;

    fn metrics(&self) -> StageMetrics {
        let (low_threshold, high_threshold) = self.config.canny.effective_thresholds();
        StageMetrics::Cracks {
            low_threshold,
            high_threshold,
            crack_pixel_count: self.cracks.pixel_count,
        }
    }

    fn next(self) -> Result<Option<Stage>, InspectionError> {
        Ok(Some(self.detect_bubbles().into()))
    }

    fn complete(self) -> Result<StagedInspection, InspectionError> {
        self.detect_bubbles().complete()
    }
}

impl PipelineStage for BubblesDetected {
    const NAME: &'static str = "bubbles";
    const INDEX: usize = 7;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Bubbles {
            candidates: self.bubbles.candidates,
            bubble_count: self.bubbles.count(),
            degenerate: self.bubbles.degenerate,
            avg_confidence: self.bubbles.average_confidence(),
        }
    }

    fn next(self) -> Result<Option<Stage>, InspectionError> {
        Ok(Some(self.analyze_thickness().into()))
    }

    fn complete(self) -> Result<StagedInspection, InspectionError> {
        self.analyze_thickness().complete()
    }
}

impl PipelineStage for ThicknessAnalyzed {
    const NAME: &'static str = "thickness";
    const INDEX: usize = 8;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Thickness {
            kernel_size: self.config.thickness.as_ref().map(|cfg| cfg.kernel_size),
            std_dev: self.thickness.as_ref().map(|t| t.std_dev),
        }
    }

    fn next(self) -> Result<Option<Stage>, InspectionError> {
        Ok(Some(self.decide()?.into()))
    }

    fn complete(self) -> Result<StagedInspection, InspectionError> {
        self.decide()?.complete()
    }
}

impl PipelineStage for Decided {
    const NAME: &'static str = "decide";
    const INDEX: usize = 9;

    fn metrics(&self) -> StageMetrics {
        let decision = &self.staged.report.decision;
        StageMetrics::Decide {
            scheme: decision.scheme.clone(),
            label: decision.label.clone(),
            grade: decision.grade,
        }
    }

    fn next(self) -> Result<Option<Stage>, InspectionError> {
        Ok(None)
    }

    fn complete(self) -> Result<StagedInspection, InspectionError> {
        Ok(self.into_result())
    }
}

/// Enum wrapping every stage for uniform, loopable access.
///
/// ```rust
/// # use coatcheck_pipeline::{Inspection, InspectionConfig, InspectionError};
/// # use coatcheck_pipeline::pipeline::{Advance, Stage};
/// # fn run(png: Vec<u8>) -> Result<(), InspectionError> {
/// let mut stage: Stage = Inspection::new(png, InspectionConfig::default()).into();
/// loop {
///     match stage.advance()? {
///         Advance::Next(next) => stage = next,
///         Advance::Complete(done) => { stage = done; break; }
///     }
/// }
/// let result = stage.complete()?;
/// # Ok(())
/// # }
/// ```
#[must_use]
pub enum Stage {
    /// See [`Pending`].
    Pending(Pending),
    /// See [`Decoded`].
    Decoded(Decoded),
    /// See [`Preprocessed`].
    Preprocessed(Preprocessed),
    /// See [`Segmented`].
    Segmented(Segmented),
    /// See [`Isolated`].
    Isolated(Isolated),
    /// See [`VoidsDetected`].
    VoidsDetected(VoidsDetected),
    /// See [`CracksDetected`].
    CracksDetected(CracksDetected),
    /// See [`BubblesDetected`].
    BubblesDetected(BubblesDetected),
    /// See [`ThicknessAnalyzed`].
    ThicknessAnalyzed(ThicknessAnalyzed),
    /// See [`Decided`].
    Decided(Decided),
}

/// Adding a [`Stage`] variant breaks this match until [`STAGE_COUNT`] is
/// revisited.
#[allow(dead_code, clippy::match_same_arms)]
const fn _stage_count_guard(s: &Stage) {
    match s {
        Stage::Pending(_)
        | Stage::Decoded(_)
        | Stage::Preprocessed(_)
        | Stage::Segmented(_)
        | Stage::Isolated(_)
        | Stage::VoidsDetected(_)
        | Stage::CracksDetected(_)
        | Stage::BubblesDetected(_)
        | Stage::ThicknessAnalyzed(_)
        | Stage::Decided(_) => {}
    }
}

/// Result of [`Stage::advance`].
#[must_use]
pub enum Advance {
    /// The inspection moved to this stage.
    Next(Stage),
    /// Already at the final stage, returned unchanged.
    Complete(Stage),
}

macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Pending(s) => s.$method($($arg),*),
            Self::Decoded(s) => s.$method($($arg),*),
            Self::Preprocessed(s) => s.$method($($arg),*),
            Self::Segmented(s) => s.$method($($arg),*),
            Self::Isolated(s) => s.$method($($arg),*),
            Self::VoidsDetected(s) => s.$method($($arg),*),
            Self::CracksDetected(s) => s.$method($($arg),*),
            Self::BubblesDetected(s) => s.$method($($arg),*),
            Self::ThicknessAnalyzed(s) => s.$method($($arg),*),
            Self::Decided(s) => s.$method($($arg),*),
        }
    };
}

impl Stage {
    /// Name of the current stage.
    #[must_use]
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    /// Zero-based index of the current stage.
    #[must_use]
    pub fn index(&self) -> usize {
        delegate!(self, index)
    }

    /// Measurements of the current stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        delegate!(self, metrics)
    }

    /// Whether this is the final stage.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Decided(_))
    }

    /// Advance one stage. `Ok(None)` consumes the final stage.
    ///
    /// # Errors
    ///
    /// Returns [`InspectionError`] if a fallible transition fails.
    pub fn next(self) -> Result<Option<Self>, InspectionError> {
        delegate!(self, next)
    }

    /// Loop-friendly [`next`](Self::next): the final stage comes back as
    /// [`Advance::Complete`] instead of being consumed.
    ///
    /// # Errors
    ///
    /// Returns [`InspectionError`] if a fallible transition fails.
    pub fn advance(self) -> Result<Advance, InspectionError> {
        if self.is_complete() {
            return Ok(Advance::Complete(self));
        }
        // Non-final stages always return `Some` from `next()`.
        #[allow(clippy::unreachable)]
        let next = self
            .next()?
            .unwrap_or_else(|| unreachable!("non-final stage returned None from next()"));
        Ok(Advance::Next(next))
    }

    /// Run every remaining stage.
    ///
    /// # Errors
    ///
    /// Returns [`InspectionError`] if any remaining stage fails.
    pub fn complete(self) -> Result<StagedInspection, InspectionError> {
        delegate!(self, complete)
    }
}

// `PipelineStage` constants are not reachable through `self`, so the
// macro goes through this.
trait StageMetadata {
    fn name(&self) -> &'static str;
    fn index(&self) -> usize;
}

impl<T: PipelineStage> StageMetadata for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn index(&self) -> usize {
        T::INDEX
    }
}

macro_rules! stage_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Stage {
                fn from(s: $variant) -> Self {
                    Self::$variant(s)
                }
            }
        )*
    };
}

stage_from!(
    Pending,
    Decoded,
    Preprocessed,
    Segmented,
    Isolated,
    VoidsDetected,
    CracksDetected,
    BubblesDetected,
    ThicknessAnalyzed,
    Decided,
);

// ───────────────────── Inspection entry point ─────────────────────────

/// Incremental inspection of one board image.
///
/// [`Inspection::new`] stores the bytes and config without doing any
/// work; chain the stage methods from there.
pub struct Inspection;

impl Inspection {
    /// Start an inspection of encoded image bytes.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(source: Vec<u8>, config: InspectionConfig) -> Pending {
        Pending { config, source }
    }

    /// Start from an already-decoded image, skipping the decode stage.
    ///
    /// # Errors
    ///
    /// Returns [`InspectionError::InvalidConfig`] for a bad config.
    pub fn from_image(image: &DynamicImage, config: InspectionConfig) -> Result<Decoded, InspectionError> {
        config.validate()?;
        Ok(Decoded::resize(image, config, 0))
    }
}
