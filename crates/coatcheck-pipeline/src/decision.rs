//! Quality verdict: an ordered threshold cascade over [`Metrics`].
//!
//! A [`DecisionScheme`] is a list of [`Tier`]s checked in order; the first
//! tier whose [`Criteria`] all hold decides the verdict, and the scheme's
//! fallback applies when none do. Schemes are stored by name in a
//! [`DecisionTable`], which ships with two built-in schemes and can be
//! extended or overridden from configuration.
//!
//! Every comparison is strict, so a metric sitting exactly on a threshold
//! fails that criterion.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{InspectionError, Metrics};

/// Discrete quality grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    /// Ship as is.
    Accept,
    /// Usable with reservations.
    Conditional,
    /// Rework or scrap.
    Reject,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => f.write_str("accept"),
            Self::Conditional => f.write_str("conditional"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

/// Conditions a tier requires. Absent fields are not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Criteria {
    /// Requires `coverage_pct > min_coverage_pct`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_coverage_pct: Option<f64>,
    /// Requires `void_ratio_pct < max_void_ratio_pct`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_void_ratio_pct: Option<f64>,
    /// Requires `bubble_count < max_bubble_count`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bubble_count: Option<u32>,
    /// Requires `thickness_std < max_thickness_std`; unmet when thickness
    /// was not measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_thickness_std: Option<f64>,
}

impl Criteria {
    /// Whether `metrics` satisfies every configured condition.
    #[must_use]
    pub fn is_met(&self, metrics: &Metrics) -> bool {
        self.min_coverage_pct
            .is_none_or(|min| metrics.coverage_pct > min)
            && self
                .max_void_ratio_pct
                .is_none_or(|max| metrics.void_ratio_pct < max)
            && self
                .max_bubble_count
                .is_none_or(|max| metrics.bubble_count < max)
            && self
                .max_thickness_std
                .is_none_or(|max| metrics.thickness_std.is_some_and(|t| t < max))
    }
}

/// One rung of the cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    /// Human-readable verdict text.
    pub label: String,
    /// Grade reported when this tier matches.
    pub grade: Grade,
    /// Conditions that must all hold.
    pub criteria: Criteria,
}

/// Verdict applied when no tier matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    /// Human-readable verdict text.
    pub label: String,
    /// Grade reported.
    pub grade: Grade,
}

/// An ordered cascade of tiers with a fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionScheme {
    /// Tiers, checked first to last.
    pub tiers: Vec<Tier>,
    /// Verdict when no tier matches.
    pub fallback: Fallback,
}

impl DecisionScheme {
    /// Four-factor scheme: coverage, voids, bubbles and thickness.
    #[must_use]
    pub fn ipc() -> Self {
        Self {
            tiers: vec![
                Tier {
                    label: "IPC CLASS 3 – ACCEPT".to_owned(),
                    grade: Grade::Accept,
                    criteria: Criteria {
                        min_coverage_pct: Some(96.0),
                        max_void_ratio_pct: Some(1.5),
                        max_bubble_count: Some(5),
                        max_thickness_std: Some(18.0),
                    },
                },
                Tier {
                    label: "IPC CLASS 2 – CONDITIONAL".to_owned(),
                    grade: Grade::Conditional,
                    criteria: Criteria {
                        min_coverage_pct: Some(92.0),
                        ..Criteria::default()
                    },
                },
            ],
            fallback: Fallback {
                label: "REJECT".to_owned(),
                grade: Grade::Reject,
            },
        }
    }

    /// Three-factor scheme: coverage, voids and bubbles.
    #[must_use]
    pub fn basic() -> Self {
        Self {
            tiers: vec![
                Tier {
                    label: "GOOD".to_owned(),
                    grade: Grade::Accept,
                    criteria: Criteria {
                        min_coverage_pct: Some(95.0),
                        max_void_ratio_pct: Some(2.0),
                        max_bubble_count: Some(10),
                        max_thickness_std: None,
                    },
                },
                Tier {
                    label: "ACCEPTABLE".to_owned(),
                    grade: Grade::Conditional,
                    criteria: Criteria {
                        min_coverage_pct: Some(90.0),
                        ..Criteria::default()
                    },
                },
            ],
            fallback: Fallback {
                label: "REJECT".to_owned(),
                grade: Grade::Reject,
            },
        }
    }

    /// Run the cascade. Returns the matching tier's label and grade.
    #[must_use]
    pub fn classify(&self, metrics: &Metrics) -> (&str, Grade) {
        self.tiers
            .iter()
            .find(|tier| tier.criteria.is_met(metrics))
            .map_or((self.fallback.label.as_str(), self.fallback.grade), |tier| {
                (tier.label.as_str(), tier.grade)
            })
    }
}

/// Named decision schemes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionTable {
    schemes: BTreeMap<String, DecisionScheme>,
}

impl DecisionTable {
    /// Name of the four-factor built-in scheme.
    pub const IPC: &'static str = "ipc";
    /// Name of the three-factor built-in scheme.
    pub const BASIC: &'static str = "basic";

    /// A table with no schemes.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            schemes: BTreeMap::new(),
        }
    }

    /// Add or replace a scheme.
    pub fn insert(&mut self, name: impl Into<String>, scheme: DecisionScheme) {
        self.schemes.insert(name.into(), scheme);
    }

    /// Look up a scheme.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DecisionScheme> {
        self.schemes.get(name)
    }

    /// Whether a scheme with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.schemes.contains_key(name)
    }

    /// Scheme names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemes.keys().map(String::as_str)
    }

    /// Classify `metrics` with the named scheme.
    ///
    /// # Errors
    ///
    /// Returns [`InspectionError::InvalidConfig`] if no scheme has that
    /// name.
    pub fn evaluate(&self, scheme: &str, metrics: &Metrics) -> Result<Decision, InspectionError> {
        let cascade = self.get(scheme).ok_or_else(|| {
            InspectionError::InvalidConfig(format!("unknown decision scheme {scheme:?}"))
        })?;
        let (label, grade) = cascade.classify(metrics);
        Ok(Decision {
            grade,
            label: label.to_owned(),
            scheme: scheme.to_owned(),
            metrics: metrics.clone(),
        })
    }
}

impl Default for DecisionTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert(Self::IPC, DecisionScheme::ipc());
        table.insert(Self::BASIC, DecisionScheme::basic());
        table
    }
}

/// A verdict and the metrics that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Discrete grade.
    pub grade: Grade,
    /// Label of the matching tier (or the fallback).
    pub label: String,
    /// Name of the scheme that was applied.
    pub scheme: String,
    /// Input metrics.
    pub metrics: Metrics,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn metrics(coverage: f64, void: f64, bubbles: u32, thickness: Option<f64>) -> Metrics {
        Metrics {
            coverage_pct: coverage,
            void_ratio_pct: void,
            bubble_count: bubbles,
            avg_bubble_confidence: 0.0,
            crack_density: 0.0,
            thickness_std: thickness,
            pcb_area: 1000,
            void_area: 0,
            crack_pixel_count: 0,
        }
    }

    fn grade(scheme: &str, m: &Metrics) -> Grade {
        DecisionTable::default().evaluate(scheme, m).unwrap().grade
    }

    #[test]
    fn ipc_scenarios() {
        let table = DecisionTable::default();
        let accept = table
            .evaluate("ipc", &metrics(97.5, 1.0, 2, Some(10.0)))
            .unwrap();
        assert_eq!(accept.grade, Grade::Accept);
        assert_eq!(accept.label, "IPC CLASS 3 – ACCEPT");
        assert_eq!(accept.scheme, "ipc");

        let conditional = table
            .evaluate("ipc", &metrics(93.0, 1.0, 2, Some(10.0)))
            .unwrap();
        assert_eq!(conditional.grade, Grade::Conditional);
        assert_eq!(conditional.label, "IPC CLASS 2 – CONDITIONAL");

        let reject = table
            .evaluate("ipc", &metrics(85.0, 0.0, 0, Some(0.0)))
            .unwrap();
        assert_eq!(reject.grade, Grade::Reject);
        assert_eq!(reject.label, "REJECT");
    }

    #[test]
    fn basic_scenarios() {
        assert_eq!(grade("basic", &metrics(97.5, 1.0, 2, None)), Grade::Accept);
        assert_eq!(grade("basic", &metrics(93.0, 1.0, 2, None)), Grade::Conditional);
        assert_eq!(grade("basic", &metrics(85.0, 0.0, 0, None)), Grade::Reject);
    }

    #[test]
    fn thresholds_are_strict() {
        assert_eq!(grade("ipc", &metrics(96.0, 1.0, 2, Some(10.0))), Grade::Conditional);
        assert_eq!(grade("ipc", &metrics(97.0, 1.5, 2, Some(10.0))), Grade::Conditional);
        assert_eq!(grade("ipc", &metrics(97.0, 1.0, 5, Some(10.0))), Grade::Conditional);
        assert_eq!(grade("ipc", &metrics(97.0, 1.0, 2, Some(18.0))), Grade::Conditional);
        assert_eq!(grade("ipc", &metrics(92.0, 1.0, 2, Some(10.0))), Grade::Reject);
    }

    #[test]
    fn missing_thickness_blocks_top_tier() {
        assert_eq!(grade("ipc", &metrics(99.0, 0.1, 0, None)), Grade::Conditional);
    }

    #[test]
    fn monotonic_in_coverage() {
        let mut previous = Grade::Reject;
        for tenth in 800..=1000 {
            let coverage = f64::from(tenth) / 10.0;
            let g = grade("ipc", &metrics(coverage, 1.0, 2, Some(10.0)));
            assert!(g <= previous, "grade worsened at coverage {coverage}");
            previous = g;
        }
    }

    #[test]
    fn monotonic_in_bubbles() {
        let mut previous = Grade::Accept;
        for bubbles in 0..20 {
            let g = grade("basic", &metrics(97.0, 1.0, bubbles, None));
            assert!(g >= previous, "grade improved at {bubbles} bubbles");
            previous = g;
        }
    }

    #[test]
    fn monotonic_in_void_ratio() {
        for scheme in ["ipc", "basic"] {
            let mut previous = Grade::Accept;
            for tenth in 0..=60 {
                let void = f64::from(tenth) / 10.0;
                let g = grade(scheme, &metrics(97.5, void, 2, Some(10.0)));
                assert!(g >= previous, "{scheme}: grade improved at void {void}");
                previous = g;
            }
            assert_eq!(previous, Grade::Conditional);
        }
    }

    #[test]
    fn monotonic_in_thickness_spread() {
        let mut previous = Grade::Accept;
        for half in 0..=80 {
            let std = f64::from(half) / 2.0;
            let g = grade("ipc", &metrics(97.5, 1.0, 2, Some(std)));
            assert!(g >= previous, "grade improved at thickness std {std}");
            previous = g;
        }
        assert_eq!(previous, Grade::Conditional);
    }

    #[test]
    fn unknown_scheme_is_config_error() {
        let err = DecisionTable::default()
            .evaluate("nope", &metrics(99.0, 0.0, 0, None))
            .unwrap_err();
        assert!(matches!(err, InspectionError::InvalidConfig(_)));
    }

    #[test]
    fn custom_scheme_from_json() {
        let json = r#"{
            "strict": {
                "tiers": [
                    {"label": "PASS", "grade": "accept", "criteria": {"min_coverage_pct": 99.0}}
                ],
                "fallback": {"label": "FAIL", "grade": "reject"}
            }
        }"#;
        let table: DecisionTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["strict"]);
        let d = table.evaluate("strict", &metrics(99.5, 0.5, 0, None)).unwrap();
        assert_eq!(d.label, "PASS");
        let d = table.evaluate("strict", &metrics(98.0, 0.5, 0, None)).unwrap();
        assert_eq!(d.grade, Grade::Reject);
    }

    #[test]
    fn builtin_table_round_trips() {
        let table = DecisionTable::default();
        let json = serde_json::to_string(&table).unwrap();
        let back: DecisionTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
