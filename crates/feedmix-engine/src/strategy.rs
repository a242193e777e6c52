use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Tolerance (percent) used when the caller supplies none
pub const DEFAULT_TOLERANCE: f64 = 2.0;

/// Named formulation policy
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Loosest tolerance, pure cost minimization
    #[default]
    LeastCost,
    /// Moderate tolerance with some quality requirements
    Balanced,
    /// Tightest tolerance, forces high-protein sources
    Premium,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::LeastCost, Strategy::Balanced, Strategy::Premium];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::LeastCost => "LEAST_COST",
            Strategy::Balanced => "BALANCED",
            Strategy::Premium => "PREMIUM",
        }
    }

    /// Resolve the policy knobs for a caller-supplied base tolerance
    pub fn policy(self, base_tolerance: f64) -> StrategyPolicy {
        match self {
            Strategy::LeastCost => StrategyPolicy {
                strategy: self,
                tolerance: base_tolerance + 6.0,
                min_high_protein_fraction: 0.0,
                max_cheap_fraction: 1.0,
            },
            Strategy::Balanced => StrategyPolicy {
                strategy: self,
                tolerance: base_tolerance + 3.0,
                min_high_protein_fraction: 0.2,
                max_cheap_fraction: 0.6,
            },
            // Clamps rather than adjusts; see DESIGN.md
            Strategy::Premium => StrategyPolicy {
                strategy: self,
                tolerance: base_tolerance.max(1.0),
                min_high_protein_fraction: 0.5,
                max_cheap_fraction: 0.3,
            },
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown strategy: {0} (expected least-cost, balanced or premium)")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "least_cost" | "economy" => Ok(Strategy::LeastCost),
            "balanced" => Ok(Strategy::Balanced),
            "premium" => Ok(Strategy::Premium),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// Tolerance and composition knobs derived from a [`Strategy`]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyPolicy {
    pub strategy: Strategy,
    /// Strategy-adjusted tolerance, in percent
    pub tolerance: f64,
    /// Share of the batch that must come from high-protein ingredients (0-1)
    pub min_high_protein_fraction: f64,
    /// Share of the batch that may come from cheap ingredients (0-1)
    pub max_cheap_fraction: f64,
}
