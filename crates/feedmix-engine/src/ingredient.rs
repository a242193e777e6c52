use crate::error::InputError;
use crate::nutrients::{Nutrient, NutrientVector};

/// Protein percentage above which an ingredient counts as a high-protein source
pub const HIGH_PROTEIN_THRESHOLD: f64 = 40.0;

/// Price per kg below which an ingredient counts as cheap
pub const CHEAP_PRICE_THRESHOLD: f64 = 300.0;

/// Optional inclusion limits, in percent of the total batch weight
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InclusionBounds {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub min_inclusion: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub max_inclusion: Option<f64>,
}

/// A raw material as supplied by the caller's catalog
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    /// Price per kg
    pub price: f64,
    pub nutrients: NutrientVector,
    #[cfg_attr(feature = "serde", serde(default))]
    pub constraints: InclusionBounds,
    /// Fixed bag size in kg; `None` when sold loose
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub bag_weight: Option<f64>,
    /// kg of this additive per kg of batch. Such ingredients are topped up
    /// after solving instead of being decision variables.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub auto_calc_ratio: Option<f64>,
}

impl Ingredient {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64, nutrients: NutrientVector) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            nutrients,
            constraints: InclusionBounds::default(),
            bag_weight: None,
            auto_calc_ratio: None,
        }
    }

    pub fn with_inclusion(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.constraints = InclusionBounds {
            min_inclusion: min,
            max_inclusion: max,
        };
        self
    }

    pub fn with_bag_weight(mut self, kg: f64) -> Self {
        self.bag_weight = Some(kg);
        self
    }

    pub fn with_auto_calc_ratio(mut self, ratio: f64) -> Self {
        self.auto_calc_ratio = Some(ratio);
        self
    }

    pub fn is_auto_calculated(&self) -> bool {
        self.auto_calc_ratio.is_some()
    }

    pub fn is_high_protein(&self) -> bool {
        self.nutrients.protein > HIGH_PROTEIN_THRESHOLD
    }

    pub fn is_cheap(&self) -> bool {
        self.price < CHEAP_PRICE_THRESHOLD
    }

    pub(crate) fn validate(&self) -> Result<(), InputError> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(InputError::Price(self.id.clone(), self.price));
        }

        for nutrient in Nutrient::ALL {
            let value = self.nutrients.get(nutrient);
            if !(0.0..=100.0).contains(&value) {
                return Err(InputError::NutrientValue {
                    id: self.id.clone(),
                    nutrient,
                    value,
                });
            }
        }

        let in_percent = |v: Option<f64>| v.is_none_or(|p| (0.0..=100.0).contains(&p));
        let InclusionBounds {
            min_inclusion,
            max_inclusion,
        } = self.constraints;
        let ordered = match (min_inclusion, max_inclusion) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        };
        if !in_percent(min_inclusion) || !in_percent(max_inclusion) || !ordered {
            return Err(InputError::InclusionBounds(self.id.clone()));
        }

        if let Some(bag) = self.bag_weight {
            if !bag.is_finite() || bag <= 0.0 {
                return Err(InputError::BagWeight(self.id.clone()));
            }
        }

        if let Some(ratio) = self.auto_calc_ratio {
            if !ratio.is_finite() || ratio < 0.0 {
                return Err(InputError::AutoCalcRatio(self.id.clone()));
            }
        }

        Ok(())
    }
}
