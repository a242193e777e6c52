use std::collections::BTreeMap;

use crate::ingredient::Ingredient;

/// Purchase quantity of one ingredient after rounding up to whole bags
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BagQuantity {
    /// kg to buy (a whole number of bags, or the exact kg when sold loose)
    pub kg: f64,
    /// Number of bags; 0 when sold loose
    pub bags: u64,
    /// kg bought beyond what the formula needs
    pub excess: f64,
}

impl BagQuantity {
    /// Round `kg` up to whole bags of `bag_weight`, or pass it through when
    /// the ingredient is sold loose
    pub fn round(kg: f64, bag_weight: Option<f64>) -> Self {
        match bag_weight {
            Some(bag) if bag > 0.0 => {
                let bags = (kg / bag).ceil().max(0.0);
                let rounded = bags * bag;
                Self {
                    kg: rounded,
                    bags: bags as u64,
                    excess: rounded - kg,
                }
            }
            _ => Self {
                kg,
                bags: 0,
                excess: 0.0,
            },
        }
    }
}

/// Convert solved kg into purchasable units. Ids missing from
/// `ingredients` are passed through as loose quantities.
pub fn round_to_bags(
    quantities: &BTreeMap<String, f64>,
    ingredients: &[Ingredient],
) -> BTreeMap<String, BagQuantity> {
    quantities
        .iter()
        .map(|(id, &kg)| {
            let bag_weight = ingredients.iter().find(|i| &i.id == id).and_then(|i| i.bag_weight);
            (id.clone(), BagQuantity::round(kg, bag_weight))
        })
        .collect()
}

/// Cost of the rounded purchase at the ingredients' own prices
pub fn rounded_cost(rounded: &BTreeMap<String, BagQuantity>, ingredients: &[Ingredient]) -> f64 {
    ingredients
        .iter()
        .filter_map(|ing| rounded.get(&ing.id).map(|q| q.kg * ing.price))
        .sum()
}
