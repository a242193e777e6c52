//! Grading of a realized nutrient profile against a feed standard.
//!
//! - **Red**: one or more nutrients below the acceptable band
//! - **Blue**: nothing below, at least one nutrient within the band
//! - **Green**: every graded nutrient above the band (over-specified)

use std::fmt;

use crate::nutrients::{Nutrient, NutrientRange, NutrientVector, NutritionalTarget};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceColor {
    Red,
    Blue,
    Green,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviationStatus {
    Below,
    Within,
    Above,
}

/// The target a nutrient was graded against
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetSpec {
    /// A single bound
    Value(f64),
    Range { min: f64, max: f64 },
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSpec::Value(v) => write!(f, "{:.2}%", v),
            TargetSpec::Range { min, max } => write!(f, "{}-{}%", min, max),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutrientDeviation {
    pub nutrient: Nutrient,
    pub target: TargetSpec,
    pub actual: f64,
    /// Signed deviation from the target value, in percent of it
    pub deviation_percent: f64,
    pub status: DeviationStatus,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceResult {
    pub color: ComplianceColor,
    /// 0-100, rounded to one decimal
    pub quality_match: f64,
    /// One entry per graded nutrient, in canonical nutrient order
    pub deviations: Vec<NutrientDeviation>,
}

/// Target value plus the acceptable band around it
#[derive(Debug, Clone, Copy, PartialEq)]
struct AcceptableBand {
    target_value: f64,
    min_acceptable: f64,
    max_acceptable: f64,
}

impl AcceptableBand {
    /// `None` when the range has neither bound
    fn new(range: NutrientRange, tolerance: f64) -> Option<Self> {
        let low = 1.0 - tolerance / 100.0;
        let high = 1.0 + tolerance / 100.0;
        let band = match (range.min, range.max) {
            (Some(min), Some(max)) => Self {
                target_value: (min + max) / 2.0,
                min_acceptable: min * low,
                max_acceptable: max * high,
            },
            (Some(bound), None) | (None, Some(bound)) => Self {
                target_value: bound,
                min_acceptable: bound * low,
                max_acceptable: bound * high,
            },
            (None, None) => return None,
        };
        Some(band)
    }

    fn classify(&self, actual: f64) -> DeviationStatus {
        if actual < self.min_acceptable {
            DeviationStatus::Below
        } else if actual > self.max_acceptable {
            DeviationStatus::Above
        } else {
            DeviationStatus::Within
        }
    }

    fn deviation_percent(&self, actual: f64) -> f64 {
        if self.target_value == 0.0 {
            return 0.0;
        }
        (actual - self.target_value) / self.target_value * 100.0
    }
}

/// Grade `actual` against every nutrient `target` declares, with `tolerance`
/// percent of slack on each side of the declared bounds.
///
/// A range with neither `min` nor `max` is not graded and does not count
/// toward the quality match.
pub fn check_compliance(actual: &NutrientVector, target: &NutritionalTarget, tolerance: f64) -> ComplianceResult {
    let mut deviations = Vec::new();

    for (nutrient, range) in target.ranges() {
        let Some(band) = AcceptableBand::new(range, tolerance) else {
            continue;
        };
        let value = actual.get(nutrient);
        let target = match (range.min, range.max) {
            (Some(min), Some(max)) => TargetSpec::Range { min, max },
            _ => TargetSpec::Value(band.target_value),
        };

        deviations.push(NutrientDeviation {
            nutrient,
            target,
            actual: value,
            deviation_percent: band.deviation_percent(value),
            status: band.classify(value),
        });
    }

    let avg_deviation = if deviations.is_empty() {
        0.0
    } else {
        deviations.iter().map(|d| d.deviation_percent.abs()).sum::<f64>() / deviations.len() as f64
    };
    let quality_match = (100.0 - avg_deviation).max(0.0);

    ComplianceResult {
        color: determine_color(&deviations),
        quality_match: (quality_match * 10.0).round() / 10.0,
        deviations,
    }
}

fn determine_color(deviations: &[NutrientDeviation]) -> ComplianceColor {
    let below = deviations.iter().any(|d| d.status == DeviationStatus::Below);
    let all_above = !deviations.is_empty() && deviations.iter().all(|d| d.status == DeviationStatus::Above);

    if below {
        ComplianceColor::Red
    } else if all_above {
        ComplianceColor::Green
    } else {
        ComplianceColor::Blue
    }
}

impl ComplianceResult {
    /// Human-readable multi-line report
    pub fn report(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ComplianceColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComplianceColor::Red => "Red",
            ComplianceColor::Blue => "Blue",
            ComplianceColor::Green => "Green",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ComplianceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compliance Status: {}", self.color)?;
        writeln!(f, "Quality Match: {}%", self.quality_match)?;
        writeln!(f)?;
        writeln!(f, "Nutrient Breakdown:")?;
        writeln!(f, "{}", "=".repeat(60))?;
        for dev in &self.deviations {
            let icon = match dev.status {
                DeviationStatus::Below => "↓",
                DeviationStatus::Within => "✓",
                DeviationStatus::Above => "↑",
            };
            writeln!(
                f,
                "{} {}: {:.2}% (Target: {}, Deviation: {:.1}%)",
                icon, dev.nutrient, dev.actual, dev.target, dev.deviation_percent
            )?;
        }
        Ok(())
    }
}
