use std::fmt;

/// The eight nutrients every ingredient and target is expressed in
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Nutrient {
    Protein,
    Fat,
    Fiber,
    Ash,
    Lysine,
    Methionine,
    Calcium,
    Phosphorous,
}

impl Nutrient {
    /// Canonical evaluation order
    pub const ALL: [Nutrient; 8] = [
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Fiber,
        Nutrient::Ash,
        Nutrient::Lysine,
        Nutrient::Methionine,
        Nutrient::Calcium,
        Nutrient::Phosphorous,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Nutrient::Protein => "protein",
            Nutrient::Fat => "fat",
            Nutrient::Fiber => "fiber",
            Nutrient::Ash => "ash",
            Nutrient::Lysine => "lysine",
            Nutrient::Methionine => "methionine",
            Nutrient::Calcium => "calcium",
            Nutrient::Phosphorous => "phosphorous",
        }
    }

    /// Soft nutrients have their maximum graded for compliance but never
    /// enforced by the solver
    pub fn is_soft(self) -> bool {
        matches!(
            self,
            Nutrient::Fiber | Nutrient::Ash | Nutrient::Calcium | Nutrient::Phosphorous
        )
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Percentages (0-100) of each nutrient
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NutrientVector {
    pub protein: f64,
    pub fat: f64,
    pub fiber: f64,
    pub ash: f64,
    pub lysine: f64,
    pub methionine: f64,
    pub calcium: f64,
    pub phosphorous: f64,
}

impl NutrientVector {
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Fiber => self.fiber,
            Nutrient::Ash => self.ash,
            Nutrient::Lysine => self.lysine,
            Nutrient::Methionine => self.methionine,
            Nutrient::Calcium => self.calcium,
            Nutrient::Phosphorous => self.phosphorous,
        }
    }

    pub fn set(&mut self, nutrient: Nutrient, value: f64) {
        let slot = match nutrient {
            Nutrient::Protein => &mut self.protein,
            Nutrient::Fat => &mut self.fat,
            Nutrient::Fiber => &mut self.fiber,
            Nutrient::Ash => &mut self.ash,
            Nutrient::Lysine => &mut self.lysine,
            Nutrient::Methionine => &mut self.methionine,
            Nutrient::Calcium => &mut self.calcium,
            Nutrient::Phosphorous => &mut self.phosphorous,
        };
        *slot = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        Nutrient::ALL.into_iter().map(|n| (n, self.get(n)))
    }
}

/// An optional lower and upper bound, in percent
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NutrientRange {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub min: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub max: Option<f64>,
}

impl NutrientRange {
    pub fn at_least(min: f64) -> Self {
        Self { min: Some(min), max: None }
    }

    pub fn at_most(max: f64) -> Self {
        Self { min: None, max: Some(max) }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Nutritional specification of a feed. Nutrients left as `None` are unconstrained.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NutritionalTarget {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub protein: Option<NutrientRange>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub fat: Option<NutrientRange>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub fiber: Option<NutrientRange>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub ash: Option<NutrientRange>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub lysine: Option<NutrientRange>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub methionine: Option<NutrientRange>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub calcium: Option<NutrientRange>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub phosphorous: Option<NutrientRange>,
}

impl NutritionalTarget {
    /// The declared range for `nutrient`; an entry with neither bound counts as absent
    pub fn get(&self, nutrient: Nutrient) -> Option<NutrientRange> {
        let range = match nutrient {
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Fiber => self.fiber,
            Nutrient::Ash => self.ash,
            Nutrient::Lysine => self.lysine,
            Nutrient::Methionine => self.methionine,
            Nutrient::Calcium => self.calcium,
            Nutrient::Phosphorous => self.phosphorous,
        };
        range.filter(|r| !r.is_empty())
    }

    pub fn with(mut self, nutrient: Nutrient, range: NutrientRange) -> Self {
        let slot = match nutrient {
            Nutrient::Protein => &mut self.protein,
            Nutrient::Fat => &mut self.fat,
            Nutrient::Fiber => &mut self.fiber,
            Nutrient::Ash => &mut self.ash,
            Nutrient::Lysine => &mut self.lysine,
            Nutrient::Methionine => &mut self.methionine,
            Nutrient::Calcium => &mut self.calcium,
            Nutrient::Phosphorous => &mut self.phosphorous,
        };
        *slot = Some(range);
        self
    }

    /// Minimum declared for `nutrient`, if any
    pub fn min(&self, nutrient: Nutrient) -> Option<f64> {
        self.get(nutrient).and_then(|r| r.min)
    }

    /// Declared ranges in canonical order
    pub fn ranges(&self) -> impl Iterator<Item = (Nutrient, NutrientRange)> + '_ {
        Nutrient::ALL
            .into_iter()
            .filter_map(|n| self.get(n).map(|r| (n, r)))
    }
}
