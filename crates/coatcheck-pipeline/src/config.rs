//! Inspection configuration and the named imaging profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::blur::{BilateralConfig, MAX_BILATERAL_DIAMETER};
use crate::bubble::BubbleConfig;
use crate::crack::{CannyConfig, MIN_THRESHOLD};
use crate::decision::DecisionTable;
use crate::decode::ResizeFilter;
use crate::preprocess::ContrastStrategy;
use crate::mask::MAX_ELEMENT_SIZE;
use crate::segment::MorphologyConfig;
use crate::thickness::ThicknessConfig;
use crate::types::{Dimensions, InspectionError};

/// Named parameter sets for the two supported imaging setups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Board photographed under UV; the coating fluoresces yellow-green.
    #[default]
    UvFluorescence,
    /// Board photographed under white light; only brightness separates
    /// coating from substrate.
    ValueContrast,
}

impl Profile {
    /// Every profile, in declaration order.
    pub const ALL: [Self; 2] = [Self::UvFluorescence, Self::ValueContrast];

    /// Stable kebab-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UvFluorescence => "uv-fluorescence",
            Self::ValueContrast => "value-contrast",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = InspectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| InspectionError::InvalidConfig(format!("unknown profile {s:?}")))
    }
}

/// Every tunable of an inspection run.
///
/// Missing fields deserialize to the [`Profile::UvFluorescence`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    /// Working resolution every input is resized to.
    pub canonical_size: Dimensions,
    /// Resampling filter used for the resize.
    pub resize_filter: ResizeFilter,
    /// How the coating score and intensity channels are derived.
    pub contrast: ContrastStrategy,
    /// Bilateral smoothing of the score before thresholding, if any.
    pub segment_bilateral: Option<BilateralConfig>,
    /// Coating mask cleanup.
    pub morphology: MorphologyConfig,
    /// Crack detector thresholds.
    pub canny: CannyConfig,
    /// Bubble classification thresholds.
    pub bubbles: BubbleConfig,
    /// Thickness analysis, or `None` to skip it.
    pub thickness: Option<ThicknessConfig>,
    /// Name of the scheme in `decision_table` used for the verdict.
    pub decision_scheme: String,
    /// Available decision schemes.
    pub decision_table: DecisionTable,
}

impl InspectionConfig {
    /// Default decision scheme name.
    pub const DEFAULT_DECISION_SCHEME: &'static str = DecisionTable::IPC;
    /// Default working resolution.
    pub const DEFAULT_CANONICAL_SIZE: Dimensions = Dimensions::CANONICAL;

    /// Parameters for UV-fluorescence imaging: chroma-difference score,
    /// thickness analysis, four-factor verdict.
    #[must_use]
    pub fn uv_fluorescence() -> Self {
        Self {
            canonical_size: Self::DEFAULT_CANONICAL_SIZE,
            resize_filter: ResizeFilter::default(),
            contrast: ContrastStrategy::color_difference(),
            segment_bilateral: Some(BilateralConfig::default()),
            morphology: MorphologyConfig::default(),
            canny: CannyConfig::default(),
            bubbles: BubbleConfig::UV_FLUORESCENCE,
            thickness: Some(ThicknessConfig::default()),
            decision_scheme: Self::DEFAULT_DECISION_SCHEME.to_owned(),
            decision_table: DecisionTable::default(),
        }
    }

    /// Parameters for white-light imaging: equalized brightness score, no
    /// thickness analysis, three-factor verdict.
    #[must_use]
    pub fn value_contrast() -> Self {
        Self {
            contrast: ContrastStrategy::contrast_enhanced(),
            segment_bilateral: None,
            bubbles: BubbleConfig::VALUE_CONTRAST,
            thickness: None,
            decision_scheme: DecisionTable::BASIC.to_owned(),
            ..Self::uv_fluorescence()
        }
    }

    /// The configuration of a named profile.
    #[must_use]
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::UvFluorescence => Self::uv_fluorescence(),
            Profile::ValueContrast => Self::value_contrast(),
        }
    }

    /// Check the invariants the stages rely on.
    ///
    /// # Errors
    ///
    /// Returns [`InspectionError::InvalidConfig`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), InspectionError> {
        let invalid = |msg: String| Err(InspectionError::InvalidConfig(msg));

        if self.canonical_size.width == 0 || self.canonical_size.height == 0 {
            return invalid(format!(
                "canonical_size must be non-zero, got {}x{}",
                self.canonical_size.width, self.canonical_size.height
            ));
        }

        match &self.contrast {
            ContrastStrategy::ColorDifference {
                illumination_kernel,
            } => check_kernel("contrast.illumination_kernel", *illumination_kernel)?,
            ContrastStrategy::ContrastEnhanced { bilateral, clahe } => {
                check_bilateral("contrast.bilateral", bilateral)?;
                if clahe.tiles_x == 0 || clahe.tiles_y == 0 {
                    return invalid("contrast.clahe tile grid must be non-empty".to_owned());
                }
                if !(clahe.clip_limit.is_finite() && clahe.clip_limit > 0.0) {
                    return invalid(format!(
                        "contrast.clahe.clip_limit must be positive, got {}",
                        clahe.clip_limit
                    ));
                }
            }
        }

        if let Some(bilateral) = &self.segment_bilateral {
            check_bilateral("segment_bilateral", bilateral)?;
        }
        check_kernel("morphology.kernel_size", self.morphology.kernel_size)?;
        if self.morphology.kernel_size > MAX_ELEMENT_SIZE {
            return invalid(format!(
                "morphology.kernel_size must be at most {MAX_ELEMENT_SIZE}, got {}",
                self.morphology.kernel_size
            ));
        }
        if let Some(thickness) = &self.thickness {
            check_kernel("thickness.kernel_size", thickness.kernel_size)?;
        }

        let canny = &self.canny;
        if canny.low_threshold < MIN_THRESHOLD || canny.low_threshold > canny.high_threshold {
            return invalid(format!(
                "canny thresholds must satisfy {MIN_THRESHOLD} <= low <= high, got {} and {}",
                canny.low_threshold, canny.high_threshold
            ));
        }

        let band_is_open = self.bubbles.min_area < self.bubbles.max_area;
        if !band_is_open {
            return invalid(format!(
                "bubbles area band is empty: ({}, {})",
                self.bubbles.min_area, self.bubbles.max_area
            ));
        }
        if !self.bubbles.min_circularity.is_finite() {
            return invalid("bubbles.min_circularity must be finite".to_owned());
        }

        if !self.decision_table.contains(&self.decision_scheme) {
            let known: Vec<&str> = self.decision_table.names().collect();
            return invalid(format!(
                "unknown decision scheme {:?} (known: {})",
                self.decision_scheme,
                known.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self::uv_fluorescence()
    }
}

fn check_kernel(field: &str, size: u32) -> Result<(), InspectionError> {
    if size == 0 || size % 2 == 0 {
        return Err(InspectionError::InvalidConfig(format!(
            "{field} must be a positive odd number, got {size}"
        )));
    }
    Ok(())
}

fn check_bilateral(field: &str, config: &BilateralConfig) -> Result<(), InspectionError> {
    if config.diameter == 0 || config.sigma_color <= 0.0 || config.sigma_space <= 0.0 {
        return Err(InspectionError::InvalidConfig(format!(
            "{field} needs a non-zero diameter and positive sigmas"
        )));
    }
    if config.diameter > MAX_BILATERAL_DIAMETER {
        return Err(InspectionError::InvalidConfig(format!(
            "{field}.diameter must be at most {MAX_BILATERAL_DIAMETER}, got {}",
            config.diameter
        )));
    }
    Ok(())
}
