//! Explanations for formulations that stay infeasible after relaxation.
//!
//! Rules are checked in order and every match contributes a sentence.

use crate::ingredient::Ingredient;
use crate::nutrients::{Nutrient, NutritionalTarget};

/// Fewer candidates than this triggers the variety warning
pub const MIN_BALANCED_INGREDIENTS: usize = 5;

/// Lysine percentage above which an ingredient counts as a lysine source
pub const LYSINE_SOURCE_THRESHOLD: f64 = 2.0;

/// Methionine percentage above which an ingredient counts as a methionine source
pub const METHIONINE_SOURCE_THRESHOLD: f64 = 1.0;

/// Summary of the candidate set the rules look at
struct CandidateStats<'a> {
    ingredients: &'a [&'a Ingredient],
    max_protein: f64,
    avg_protein: f64,
    max_fat: f64,
}

impl<'a> CandidateStats<'a> {
    fn new(ingredients: &'a [&'a Ingredient]) -> Self {
        let max_of = |n: Nutrient| {
            ingredients
                .iter()
                .map(|i| i.nutrients.get(n))
                .fold(f64::NEG_INFINITY, f64::max)
        };
        let avg_protein = if ingredients.is_empty() {
            0.0
        } else {
            ingredients.iter().map(|i| i.nutrients.protein).sum::<f64>() / ingredients.len() as f64
        };
        Self {
            ingredients,
            max_protein: max_of(Nutrient::Protein),
            avg_protein,
            max_fat: max_of(Nutrient::Fat),
        }
    }

    fn has_source(&self, nutrient: Nutrient, threshold: f64) -> bool {
        self.ingredients.iter().any(|i| i.nutrients.get(nutrient) > threshold)
    }
}

/// A diagnostic rule: returns a sentence when it applies
type Rule = fn(&CandidateStats<'_>, &NutritionalTarget) -> Option<String>;

const RULES: [Rule; 5] = [
    protein_rule,
    fat_rule,
    lysine_rule,
    methionine_rule,
    variety_rule,
];

/// Declared minimum of `nutrient`; zero when absent
fn min_or_zero(target: &NutritionalTarget, nutrient: Nutrient) -> f64 {
    target.min(nutrient).unwrap_or(0.0)
}

fn protein_rule(stats: &CandidateStats<'_>, target: &NutritionalTarget) -> Option<String> {
    let needed = min_or_zero(target, Nutrient::Protein);
    if needed > 0.0 && stats.max_protein < needed {
        Some(format!(
            "Need higher protein ingredients. Your highest is {}% but the target needs {}% ({:.1} points short). Add a concentrated source such as fishmeal or blood meal.",
            stats.max_protein,
            needed,
            needed - stats.max_protein
        ))
    } else if stats.avg_protein < needed * 0.6 {
        Some("Too few protein sources. Add more, such as fishmeal, soybean meal or blood meal.".to_string())
    } else {
        None
    }
}

fn fat_rule(stats: &CandidateStats<'_>, target: &NutritionalTarget) -> Option<String> {
    let needed = min_or_zero(target, Nutrient::Fat);
    (needed > 0.0 && stats.max_fat < needed)
        .then(|| "Need fat sources. Add palm oil or fish oil.".to_string())
}

fn lysine_rule(stats: &CandidateStats<'_>, target: &NutritionalTarget) -> Option<String> {
    let wanted = min_or_zero(target, Nutrient::Lysine) > 0.0;
    (wanted && !stats.has_source(Nutrient::Lysine, LYSINE_SOURCE_THRESHOLD))
        .then(|| "Missing lysine source. Add a lysine supplement or fishmeal.".to_string())
}

fn methionine_rule(stats: &CandidateStats<'_>, target: &NutritionalTarget) -> Option<String> {
    let wanted = min_or_zero(target, Nutrient::Methionine) > 0.0;
    (wanted && !stats.has_source(Nutrient::Methionine, METHIONINE_SOURCE_THRESHOLD))
        .then(|| "Missing methionine source. Add a methionine supplement.".to_string())
}

fn variety_rule(stats: &CandidateStats<'_>, _target: &NutritionalTarget) -> Option<String> {
    let count = stats.ingredients.len();
    (count < MIN_BALANCED_INGREDIENTS).then(|| {
        let noun = if count == 1 { "ingredient" } else { "ingredients" };
        format!(
            "Only {} {} selected. Add at least 5-8 for a balanced formula.",
            count, noun
        )
    })
}

/// Explain why `ingredients` cannot meet the (original, unrelaxed) `target`.
///
/// All matching rules are reported, joined by a single space.
pub fn diagnose_infeasibility(ingredients: &[&Ingredient], target: &NutritionalTarget) -> String {
    let stats = CandidateStats::new(ingredients);
    let mut messages: Vec<String> = RULES.iter().filter_map(|rule| rule(&stats, target)).collect();

    if messages.is_empty() {
        messages.push("The selected ingredients cannot meet the nutritional targets.".to_string());
        messages.push(
            "Try adding: fishmeal, soybean meal, maize, palm oil, bone meal, lysine, methionine.".to_string(),
        );
    }

    messages.join(" ")
}
