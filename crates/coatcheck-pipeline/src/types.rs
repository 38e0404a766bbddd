//! Shared types for the coating inspection pipeline.

use serde::{Deserialize, Serialize};

use crate::decision::Decision;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate masks and channels without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the
/// resized original and the annotated overlay.
pub use image::RgbImage;

/// Pixel value marking a foreground pixel in a binary mask.
pub const FOREGROUND: u8 = 255;

/// Pixel value marking a background pixel in a binary mask.
pub const BACKGROUND: u8 = 0;

/// An integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column (pixels from left edge).
    pub x: i32,
    /// Row (pixels from top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// The canonical working resolution every image is resized to.
    pub const CANONICAL: Self = Self {
        width: 640,
        height: 480,
    };

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A trapped-air bubble accepted by the bubble detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bubble {
    /// Mean of the contour points, in pixels.
    pub centroid: (f64, f64),
    /// Enclosed contour area in pixels.
    pub area: f64,
    /// Closed boundary length in pixels.
    pub perimeter: f64,
    /// `4π·area/perimeter²`; doubles as the detection confidence.
    pub circularity: f64,
}

/// Scalar quality metrics for one inspection run.
///
/// All percentages share the `pcb_area` denominator, so
/// `coverage_pct + void_ratio_pct == 100` by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Percentage of the PCB footprint that is coated.
    pub coverage_pct: f64,
    /// Percentage of the PCB footprint that is bare.
    pub void_ratio_pct: f64,
    /// Number of detected bubbles.
    pub bubble_count: u32,
    /// Mean circularity of the detected bubbles (0 when none were found).
    pub avg_bubble_confidence: f64,
    /// Edge pixels per PCB pixel.
    pub crack_density: f64,
    /// Standard deviation of the smoothed coating score over the board.
    ///
    /// `None` when the active profile disables thickness analysis.
    #[serde(default)]
    pub thickness_std: Option<f64>,
    /// Pixel count of the PCB footprint.
    pub pcb_area: u64,
    /// Pixel count of uncoated area inside the footprint.
    pub void_area: u64,
    /// Pixel count of edge pixels inside the footprint.
    pub crack_pixel_count: u64,
}

/// Serializable outcome of a successful inspection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionReport {
    /// Aggregated metrics.
    pub metrics: Metrics,
    /// Quality verdict derived from `metrics`.
    pub decision: Decision,
    /// Every accepted bubble, in contour discovery order.
    pub bubbles: Vec<Bubble>,
    /// Working resolution the metrics were computed at.
    pub dimensions: Dimensions,
}

/// Result of an inspection with every intermediate raster preserved.
///
/// Intended for human review: the masks and the annotated overlay can be
/// written to disk or displayed next to the report.
#[derive(Debug, Clone)]
pub struct StagedInspection {
    /// Input image resized to the working resolution.
    pub original: RgbImage,
    /// Coating score channel fed to segmentation.
    pub score: GrayImage,
    /// Intensity channel fed to crack detection.
    pub intensity: GrayImage,
    /// Binary coating mask after morphological cleanup.
    pub coating_mask: GrayImage,
    /// Filled footprint of the largest coating region.
    pub pcb_mask: GrayImage,
    /// Uncoated pixels inside the footprint.
    pub void_mask: GrayImage,
    /// Edge pixels inside the footprint.
    pub crack_mask: GrayImage,
    /// Smoothed score used for thickness analysis, if enabled.
    pub thickness_map: Option<GrayImage>,
    /// Copy of `original` with bubble contours drawn in red.
    pub overlay: RgbImage,
    /// The metrics and verdict.
    pub report: InspectionReport,
}

/// Errors that abort an inspection run.
///
/// A [`Grade::Reject`](crate::decision::Grade::Reject) verdict is *not* an
/// error: these variants mean no verdict could be computed at all.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits.
#[derive(Debug, thiserror::Error)]
pub enum InspectionError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The coating mask has no foreground region to take as the board.
    #[error("no coated region found in the image")]
    NoRegionFound,

    /// The isolated board footprint covers zero pixels.
    #[error("isolated board region has zero area")]
    DegenerateRegion,

    /// Inspection configuration is invalid.
    #[error("invalid inspection configuration: {0}")]
    InvalidConfig(String),
}

impl InspectionError {
    /// Whether the error happened while loading the image, before any
    /// analysis stage ran.
    #[must_use]
    pub const fn is_load_error(&self) -> bool {
        matches!(self, Self::ImageDecode(_) | Self::EmptyInput)
    }
}

/// Serde-compatible proxy for `InspectionError`.
///
/// The `ImageDecode` variant stores its `Display` string; a deserialized
/// decode failure comes back as `ImageDecode` wrapping that message in a
/// format-agnostic [`image::error::DecodingError`].
#[derive(Serialize, Deserialize)]
enum InspectionErrorProxy {
    ImageDecode(String),
    EmptyInput,
    NoRegionFound,
    DegenerateRegion,
    InvalidConfig(String),
}

impl Serialize for InspectionError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => InspectionErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => InspectionErrorProxy::EmptyInput,
            Self::NoRegionFound => InspectionErrorProxy::NoRegionFound,
            Self::DegenerateRegion => InspectionErrorProxy::DegenerateRegion,
            Self::InvalidConfig(s) => InspectionErrorProxy::InvalidConfig(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InspectionError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = InspectionErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            InspectionErrorProxy::ImageDecode(msg) => Self::ImageDecode(
                image::ImageError::Decoding(image::error::DecodingError::new(
                    image::error::ImageFormatHint::Unknown,
                    msg,
                )),
            ),
            InspectionErrorProxy::EmptyInput => Self::EmptyInput,
            InspectionErrorProxy::NoRegionFound => Self::NoRegionFound,
            InspectionErrorProxy::DegenerateRegion => Self::DegenerateRegion,
            InspectionErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
        })
    }
}
