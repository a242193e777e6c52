//! Translation of ingredients, a nutritional target and a strategy policy
//! into a linear program.
//!
//! Each constraint row is tagged with a [`ConstraintKind`], and the kind alone
//! decides every coefficient of the row. Rows are therefore never partially
//! filled in, and the finished [`FormulationModel`] is immutable.

use feedmix_solver::{ConstraintOp, LpProblem};

use crate::ingredient::Ingredient;
use crate::nutrients::{Nutrient, NutritionalTarget};
use crate::strategy::StrategyPolicy;

/// Nutrients kept by the essentials-only relaxation
pub const ESSENTIAL_NUTRIENTS: [Nutrient; 2] = [Nutrient::Protein, Nutrient::Fat];

/// Which rung of the feasibility ladder a model (or result) belongs to
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveTier {
    /// Every nutrient, inclusion and strategy constraint
    Full,
    /// Weight, protein/fat minimums and inclusion maximums only
    EssentialsOnly,
}

/// What a constraint row expresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Sum of all quantities
    TotalWeight,
    /// kg drawn from high-protein ingredients
    HighProteinShare,
    /// kg drawn from cheap ingredients
    CheapShare,
    NutrientMin(Nutrient),
    NutrientMax(Nutrient),
    /// Lower inclusion limit of the ingredient at this variable index
    InclusionMin(usize),
    /// Upper inclusion limit of the ingredient at this variable index
    InclusionMax(usize),
}

impl ConstraintKind {
    /// Coefficient of variable `index` (backed by `ingredient`) in this row
    pub fn coefficient(self, index: usize, ingredient: &Ingredient) -> f64 {
        let indicator = |hit: bool| if hit { 1.0 } else { 0.0 };
        match self {
            ConstraintKind::TotalWeight => 1.0,
            ConstraintKind::HighProteinShare => indicator(ingredient.is_high_protein()),
            ConstraintKind::CheapShare => indicator(ingredient.is_cheap()),
            // Percent to a fraction, so the row sums to absolute nutrient kg
            ConstraintKind::NutrientMin(n) | ConstraintKind::NutrientMax(n) => ingredient.nutrients.get(n) / 100.0,
            ConstraintKind::InclusionMin(i) | ConstraintKind::InclusionMax(i) => indicator(i == index),
        }
    }

    fn label(self, ingredients: &[&Ingredient]) -> String {
        match self {
            ConstraintKind::TotalWeight => "weight".to_string(),
            ConstraintKind::HighProteinShare => "high_protein".to_string(),
            ConstraintKind::CheapShare => "cheap_max".to_string(),
            ConstraintKind::NutrientMin(n) => format!("{}_min", n),
            ConstraintKind::NutrientMax(n) => format!("{}_max", n),
            ConstraintKind::InclusionMin(i) => format!("{}_min", ingredients[i].id),
            ConstraintKind::InclusionMax(i) => format!("{}_max", ingredients[i].id),
        }
    }
}

/// One row of the model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConstraint {
    pub kind: ConstraintKind,
    pub name: String,
    pub coefficients: Vec<f64>,
    pub op: ConstraintOp,
    /// Right-hand side in kg
    pub rhs: f64,
}

/// An immutable formulation LP: one non-negative kg variable per candidate
/// ingredient, minimizing total price
#[derive(Debug, Clone, PartialEq)]
pub struct FormulationModel {
    tier: SolveTier,
    target_weight: f64,
    variables: Vec<String>,
    costs: Vec<f64>,
    constraints: Vec<ModelConstraint>,
}

impl FormulationModel {
    pub fn tier(&self) -> SolveTier {
        self.tier
    }

    pub fn target_weight(&self) -> f64 {
        self.target_weight
    }

    /// Ingredient ids, in variable order
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    pub fn constraints(&self) -> &[ModelConstraint] {
        &self.constraints
    }

    pub fn constraint(&self, kind: ConstraintKind) -> Option<&ModelConstraint> {
        self.constraints.iter().find(|c| c.kind == kind)
    }

    /// Lower the model into the generic solver representation
    pub fn to_lp_problem(&self) -> LpProblem {
        let mut lp = LpProblem::new(self.variables.clone());
        lp.set_objective(self.costs.clone(), true);
        for c in &self.constraints {
            lp.add_constraint(c.name.clone(), c.coefficients.clone(), c.op, c.rhs);
        }
        lp
    }
}

/// Accumulates typed rows over a fixed set of candidate ingredients
struct ModelBuilder<'a> {
    ingredients: &'a [&'a Ingredient],
    target_weight: f64,
    constraints: Vec<ModelConstraint>,
}

impl<'a> ModelBuilder<'a> {
    fn new(ingredients: &'a [&'a Ingredient], target_weight: f64) -> Self {
        Self {
            ingredients,
            target_weight,
            constraints: Vec::new(),
        }
    }

    fn add(&mut self, kind: ConstraintKind, op: ConstraintOp, rhs: f64) {
        let coefficients = self
            .ingredients
            .iter()
            .enumerate()
            .map(|(i, ing)| kind.coefficient(i, ing))
            .collect();
        self.constraints.push(ModelConstraint {
            kind,
            name: kind.label(self.ingredients),
            coefficients,
            op,
            rhs,
        });
    }

    /// Convert a percentage of the batch into kg
    fn kg(&self, percent: f64) -> f64 {
        percent / 100.0 * self.target_weight
    }

    fn add_nutrient_min(&mut self, nutrient: Nutrient, min: f64, tolerance: f64) {
        let bound = min * (1.0 - tolerance / 100.0);
        let rhs = self.kg(bound);
        self.add(ConstraintKind::NutrientMin(nutrient), ConstraintOp::Ge, rhs);
    }

    fn add_inclusion_max(&mut self) {
        for (i, ing) in self.ingredients.iter().enumerate() {
            if let Some(max) = ing.constraints.max_inclusion {
                let rhs = self.kg(max);
                self.add(ConstraintKind::InclusionMax(i), ConstraintOp::Le, rhs);
            }
        }
    }

    fn finish(self, tier: SolveTier) -> FormulationModel {
        FormulationModel {
            tier,
            target_weight: self.target_weight,
            variables: self.ingredients.iter().map(|i| i.id.clone()).collect(),
            costs: self.ingredients.iter().map(|i| i.price).collect(),
            constraints: self.constraints,
        }
    }
}

/// Build the full model: weight equality, strategy shares, nutrient bounds
/// (maximums only for non-soft nutrients) and per-ingredient inclusion limits.
///
/// `ingredients` must not contain auto-calculated additives.
pub fn build_full_model(
    ingredients: &[&Ingredient],
    target_weight: f64,
    target: &NutritionalTarget,
    policy: &StrategyPolicy,
) -> FormulationModel {
    let mut builder = ModelBuilder::new(ingredients, target_weight);
    let tolerance = policy.tolerance;

    builder.add(ConstraintKind::TotalWeight, ConstraintOp::Eq, target_weight);
    builder.add(
        ConstraintKind::HighProteinShare,
        ConstraintOp::Ge,
        policy.min_high_protein_fraction * target_weight,
    );
    builder.add(
        ConstraintKind::CheapShare,
        ConstraintOp::Le,
        policy.max_cheap_fraction * target_weight,
    );

    for (nutrient, range) in target.ranges() {
        if let Some(min) = range.min {
            builder.add_nutrient_min(nutrient, min, tolerance);
        }
        if let Some(max) = range.max {
            if nutrient.is_soft() {
                continue;
            }
            let bound = max * (1.0 + tolerance / 100.0);
            let rhs = builder.kg(bound);
            builder.add(ConstraintKind::NutrientMax(nutrient), ConstraintOp::Le, rhs);
        }
    }

    builder.add_inclusion_max();
    for (i, ing) in ingredients.iter().enumerate() {
        if let Some(min) = ing.constraints.min_inclusion {
            let rhs = builder.kg(min);
            builder.add(ConstraintKind::InclusionMin(i), ConstraintOp::Ge, rhs);
        }
    }

    builder.finish(SolveTier::Full)
}

/// Build the essentials-only relaxation: weight equality, protein and fat
/// minimums, and inclusion maximums. Strategy shares, every other nutrient,
/// all maximum nutrient bounds and inclusion minimums are dropped.
pub fn build_essentials_model(
    ingredients: &[&Ingredient],
    target_weight: f64,
    target: &NutritionalTarget,
    tolerance: f64,
) -> FormulationModel {
    let mut builder = ModelBuilder::new(ingredients, target_weight);

    builder.add(ConstraintKind::TotalWeight, ConstraintOp::Eq, target_weight);
    for nutrient in ESSENTIAL_NUTRIENTS {
        if let Some(min) = target.min(nutrient) {
            builder.add_nutrient_min(nutrient, min, tolerance);
        }
    }
    builder.add_inclusion_max();

    builder.finish(SolveTier::EssentialsOnly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrients::{NutrientRange, NutrientVector};
    use crate::strategy::Strategy;

    fn ingredients() -> Vec<Ingredient> {
        vec![
            Ingredient::new(
                "maize",
                "Maize",
                250.0,
                NutrientVector {
                    protein: 9.0,
                    fat: 4.0,
                    fiber: 2.5,
                    ..Default::default()
                },
            )
            .with_inclusion(None, Some(40.0)),
            Ingredient::new(
                "fishmeal",
                "Fishmeal 65%",
                1200.0,
                NutrientVector {
                    protein: 65.0,
                    fat: 9.0,
                    lysine: 4.8,
                    ..Default::default()
                },
            )
            .with_inclusion(Some(10.0), None),
        ]
    }

    fn target() -> NutritionalTarget {
        NutritionalTarget::default()
            .with(Nutrient::Protein, NutrientRange::between(40.0, 45.0))
            .with(Nutrient::Fat, NutrientRange::at_least(6.0))
            .with(Nutrient::Fiber, NutrientRange::at_most(4.0))
    }

    #[test]
    fn test_full_model_structure() {
        let ings = ingredients();
        let refs: Vec<&Ingredient> = ings.iter().collect();
        let policy = Strategy::Balanced.policy(2.0);
        let model = build_full_model(&refs, 200.0, &target(), &policy);

        assert_eq!(model.tier(), SolveTier::Full);
        assert_eq!(model.variables(), &["maize".to_string(), "fishmeal".to_string()]);
        assert_eq!(model.costs(), &[250.0, 1200.0]);

        let kinds: Vec<ConstraintKind> = model.constraints().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ConstraintKind::TotalWeight,
                ConstraintKind::HighProteinShare,
                ConstraintKind::CheapShare,
                ConstraintKind::NutrientMin(Nutrient::Protein),
                ConstraintKind::NutrientMax(Nutrient::Protein),
                ConstraintKind::NutrientMin(Nutrient::Fat),
                ConstraintKind::InclusionMax(0),
                ConstraintKind::InclusionMin(1),
            ]
        );
    }

    #[test]
    fn test_full_model_coefficients_and_bounds() {
        let ings = ingredients();
        let refs: Vec<&Ingredient> = ings.iter().collect();
        let policy = Strategy::Balanced.policy(2.0); // tolerance 5
        let model = build_full_model(&refs, 200.0, &target(), &policy);

        let weight = model.constraint(ConstraintKind::TotalWeight).unwrap();
        assert_eq!(weight.coefficients, vec![1.0, 1.0]);
        assert_eq!(weight.op, ConstraintOp::Eq);
        assert_eq!(weight.rhs, 200.0);

        let high = model.constraint(ConstraintKind::HighProteinShare).unwrap();
        assert_eq!(high.coefficients, vec![0.0, 1.0]);
        assert!((high.rhs - 40.0).abs() < 1e-9);

        let cheap = model.constraint(ConstraintKind::CheapShare).unwrap();
        assert_eq!(cheap.coefficients, vec![1.0, 0.0]);
        assert!((cheap.rhs - 120.0).abs() < 1e-9);

        let protein_min = model.constraint(ConstraintKind::NutrientMin(Nutrient::Protein)).unwrap();
        assert_eq!(protein_min.name, "protein_min");
        assert_eq!(protein_min.coefficients, vec![0.09, 0.65]);
        // 40 * 0.95 = 38% of 200 kg
        assert!((protein_min.rhs - 76.0).abs() < 1e-9, "rhs = {}", protein_min.rhs);

        let protein_max = model.constraint(ConstraintKind::NutrientMax(Nutrient::Protein)).unwrap();
        // 45 * 1.05 = 47.25% of 200 kg
        assert!((protein_max.rhs - 94.5).abs() < 1e-9, "rhs = {}", protein_max.rhs);

        assert!(model.constraint(ConstraintKind::NutrientMax(Nutrient::Fiber)).is_none());

        let maize_max = model.constraint(ConstraintKind::InclusionMax(0)).unwrap();
        assert_eq!(maize_max.name, "maize_max");
        assert_eq!(maize_max.coefficients, vec![1.0, 0.0]);
        assert!((maize_max.rhs - 80.0).abs() < 1e-9);

        let fish_min = model.constraint(ConstraintKind::InclusionMin(1)).unwrap();
        assert_eq!(fish_min.coefficients, vec![0.0, 1.0]);
        assert!((fish_min.rhs - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_absent_nutrients_are_unconstrained() {
        let ings = ingredients();
        let refs: Vec<&Ingredient> = ings.iter().collect();
        let policy = Strategy::LeastCost.policy(2.0);
        let model = build_full_model(&refs, 100.0, &NutritionalTarget::default(), &policy);

        assert!(
            model
                .constraints()
                .iter()
                .all(|c| !matches!(c.kind, ConstraintKind::NutrientMin(_) | ConstraintKind::NutrientMax(_)))
        );
    }

    #[test]
    fn test_essentials_model() {
        let ings = ingredients();
        let refs: Vec<&Ingredient> = ings.iter().collect();
        let target = target().with(Nutrient::Lysine, NutrientRange::at_least(2.0));
        let model = build_essentials_model(&refs, 200.0, &target, 5.0);

        assert_eq!(model.tier(), SolveTier::EssentialsOnly);
        let kinds: Vec<ConstraintKind> = model.constraints().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ConstraintKind::TotalWeight,
                ConstraintKind::NutrientMin(Nutrient::Protein),
                ConstraintKind::NutrientMin(Nutrient::Fat),
                ConstraintKind::InclusionMax(0),
            ]
        );
    }

    #[test]
    fn test_lp_lowering() {
        let ings = ingredients();
        let refs: Vec<&Ingredient> = ings.iter().collect();
        let model = build_essentials_model(&refs, 100.0, &target(), 2.0);
        let lp = model.to_lp_problem();

        assert_eq!(lp.num_variables(), 2);
        assert_eq!(lp.num_constraints(), model.constraints().len());
        assert!(lp.objective.minimize);
        assert_eq!(lp.objective.coefficients, vec![250.0, 1200.0]);
        assert_eq!(lp.constraints[0].name, "weight");
    }
}
