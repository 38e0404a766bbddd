//! coatcheck-pipeline: conformal-coating inspection of PCB images (sans-IO).
//!
//! Grades a photograph of a coated board through:
//! decode -> resize -> contrast channels -> coating segmentation ->
//! board isolation -> voids / cracks / bubbles / thickness -> metrics ->
//! verdict.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory byte
//! slices or decoded images and returns structured data. Reading files,
//! writing overlays and printing reports live in `coatcheck-cli`.

pub mod blur;
pub mod bubble;
pub mod canny;
pub mod color;
pub mod config;
pub mod contour;
pub mod contrast;
pub mod crack;
pub mod decision;
pub mod decode;
pub mod diagnostics;
pub mod mask;
pub mod metrics;
pub mod overlay;
pub mod pipeline;
pub mod preprocess;
pub mod region;
pub mod segment;
pub mod thickness;
pub mod types;
pub mod void;

use image::DynamicImage;

pub use config::{InspectionConfig, Profile};
pub use decision::{Decision, DecisionScheme, DecisionTable, Grade};
pub use pipeline::Inspection;
pub use preprocess::{ContrastExtractor, ContrastStrategy};
pub use types::{
    Bubble, Dimensions, InspectionError, InspectionReport, Metrics, Point, StagedInspection,
};

/// Inspect encoded image bytes and return the report.
///
/// Takes PNG, JPEG, BMP or WebP bytes. The image is resized to
/// `config.canonical_size` before any analysis, so every metric refers to
/// the working resolution.
///
/// # Steps
///
/// 1. Decode and resize
/// 2. Derive the coating score and intensity channels
/// 3. Otsu threshold plus morphological cleanup of the score
/// 4. Largest coated region becomes the board footprint
/// 5. Voids: footprint minus coating
/// 6. Cracks: Canny edges inside the footprint
/// 7. Bubbles: small round coating blobs
/// 8. Optional thickness uniformity
/// 9. Metrics and verdict from the configured decision scheme
///
/// # Errors
///
/// Returns [`InspectionError::InvalidConfig`] if `config` fails
/// validation, [`InspectionError::EmptyInput`] or
/// [`InspectionError::ImageDecode`] for unusable bytes, and
/// [`InspectionError::NoRegionFound`] or
/// [`InspectionError::DegenerateRegion`] when no board is visible.
pub fn inspect(
    image_bytes: &[u8],
    config: &InspectionConfig,
) -> Result<InspectionReport, InspectionError> {
    inspect_staged(image_bytes, config).map(|staged| staged.report)
}

/// Inspect an already-decoded image.
///
/// # Errors
///
/// Same as [`inspect`], minus the decoding errors.
pub fn inspect_image(
    image: &DynamicImage,
    config: &InspectionConfig,
) -> Result<InspectionReport, InspectionError> {
    use pipeline::PipelineStage;

    Inspection::from_image(image, config.clone())?
        .complete()
        .map(|staged| staged.report)
}

/// Inspect encoded image bytes, keeping every intermediate raster.
///
/// # Errors
///
/// Same as [`inspect`].
pub fn inspect_staged(
    image_bytes: &[u8],
    config: &InspectionConfig,
) -> Result<StagedInspection, InspectionError> {
    use pipeline::PipelineStage;

    Inspection::new(image_bytes.to_vec(), config.clone()).complete()
}
