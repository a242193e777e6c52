use std::collections::BTreeMap;

use crate::ingredient::Ingredient;
use crate::nutrients::{Nutrient, NutrientVector};

/// Realized nutrient percentages of a mix: the kg-weighted average of the
/// ingredient percentages over `total_weight`.
///
/// Quantities keyed by ids that are not in `ingredients` are ignored.
pub fn actual_nutrients(
    quantities: &BTreeMap<String, f64>,
    ingredients: &[Ingredient],
    total_weight: f64,
) -> NutrientVector {
    let mut actual = NutrientVector::default();
    if total_weight <= 0.0 {
        return actual;
    }

    for nutrient in Nutrient::ALL {
        let nutrient_kg: f64 = ingredients
            .iter()
            .filter_map(|ing| quantities.get(&ing.id).map(|qty| qty * ing.nutrients.get(nutrient) / 100.0))
            .sum();
        actual.set(nutrient, nutrient_kg / total_weight * 100.0);
    }

    actual
}
