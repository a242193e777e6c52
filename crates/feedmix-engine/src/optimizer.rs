use std::collections::{BTreeMap, HashSet};

use feedmix_solver::{Analysis, LpSolve, SolutionStatus, SolveError, Solver};
use tracing::{debug, info, warn};

use crate::aggregate::actual_nutrients;
use crate::diagnostics::diagnose_infeasibility;
use crate::error::{EngineError, InputError};
use crate::ingredient::Ingredient;
use crate::model::{FormulationModel, SolveTier, build_essentials_model, build_full_model};
use crate::nutrients::{NutrientVector, NutritionalTarget};
use crate::strategy::{DEFAULT_TOLERANCE, Strategy};

/// Informational message attached to results of the relaxed tier
pub const ESSENTIALS_ONLY_MESSAGE: &str = "Solution found using essential nutrients only.";

/// Relative slack allowed when re-checking a solved point against its rows
const FEASIBILITY_EPSILON: f64 = 1e-6;

/// Everything a formulation needs besides the strategy
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeRequest {
    pub target_weight_kg: f64,
    pub ingredients: Vec<Ingredient>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub nutritional_target: NutritionalTarget,
    /// Base tolerance in percent; [`DEFAULT_TOLERANCE`] when absent
    #[cfg_attr(feature = "serde", serde(default))]
    pub tolerance: Option<f64>,
    /// Flat milling/processing/transport cost added to every option
    #[cfg_attr(feature = "serde", serde(default))]
    pub overhead_cost: f64,
}

impl OptimizeRequest {
    pub fn new(target_weight_kg: f64, ingredients: Vec<Ingredient>, nutritional_target: NutritionalTarget) -> Self {
        Self {
            target_weight_kg,
            ingredients,
            nutritional_target,
            tolerance: None,
            overhead_cost: 0.0,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn with_overhead_cost(mut self, cost: f64) -> Self {
        self.overhead_cost = cost;
        self
    }

    pub fn base_tolerance(&self) -> f64 {
        self.tolerance.unwrap_or(DEFAULT_TOLERANCE)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        validate_input(
            self.target_weight_kg,
            &self.ingredients,
            &self.nutritional_target,
            self.base_tolerance(),
        )?;
        if !self.overhead_cost.is_finite() || self.overhead_cost < 0.0 {
            return Err(InputError::OverheadCost(self.overhead_cost));
        }
        Ok(())
    }

    /// Ingredients that become LP variables
    pub fn candidates(&self) -> Vec<&Ingredient> {
        candidates(&self.ingredients)
    }
}

/// Outcome of one strategy's optimization
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SolverResult {
    pub strategy: Strategy,
    pub feasible: bool,
    /// Tier that produced the solution; `None` when infeasible
    pub tier: Option<SolveTier>,
    /// kg per ingredient id; ingredients left out of the mix are omitted
    pub quantities: BTreeMap<String, f64>,
    /// Optimal LP objective
    pub objective_value: Option<f64>,
    /// Cost of the unrounded quantities at the ingredients' prices
    pub total_cost: f64,
    /// Realized nutrients of the unrounded quantities
    pub actual_nutrients: NutrientVector,
    /// Relaxation notice when feasible, diagnostics when not
    pub message: Option<String>,
    /// Shadow prices and reduced costs of the optimal solution
    pub analysis: Option<Analysis>,
}

impl SolverResult {
    fn infeasible(strategy: Strategy, message: String) -> Self {
        Self {
            strategy,
            feasible: false,
            tier: None,
            quantities: BTreeMap::new(),
            objective_value: None,
            total_cost: 0.0,
            actual_nutrients: NutrientVector::default(),
            message: Some(message),
            analysis: None,
        }
    }

    /// Whether the solution came from the essentials-only relaxation
    pub fn is_relaxed(&self) -> bool {
        self.tier == Some(SolveTier::EssentialsOnly)
    }
}

/// Drives the feasibility ladder over an [`LpSolve`] backend
#[derive(Debug, Clone, Default)]
pub struct Optimizer<S = Solver> {
    solver: S,
}

impl Optimizer<Solver> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: LpSolve> Optimizer<S> {
    pub fn with_solver(solver: S) -> Self {
        Self { solver }
    }

    pub fn optimize(&self, request: &OptimizeRequest, strategy: Strategy) -> Result<SolverResult, EngineError> {
        self.solve(
            request.target_weight_kg,
            &request.ingredients,
            &request.nutritional_target,
            request.base_tolerance(),
            strategy,
        )
    }

    /// Optimize one strategy: the full model first, then the essentials-only
    /// relaxation, then diagnostics
    pub fn solve(
        &self,
        target_weight_kg: f64,
        ingredients: &[Ingredient],
        target: &NutritionalTarget,
        tolerance: f64,
        strategy: Strategy,
    ) -> Result<SolverResult, EngineError> {
        validate_input(target_weight_kg, ingredients, target, tolerance)?;

        let candidates = candidates(ingredients);
        let policy = strategy.policy(tolerance);

        let full = build_full_model(&candidates, target_weight_kg, target, &policy);
        if let Some(result) = self.attempt(&full, ingredients, strategy)? {
            return Ok(result);
        }

        info!(strategy = %strategy, "full model infeasible, retrying with essential nutrients only");
        let essentials = build_essentials_model(&candidates, target_weight_kg, target, policy.tolerance);
        if let Some(result) = self.attempt(&essentials, ingredients, strategy)? {
            return Ok(result);
        }

        let message = diagnose_infeasibility(&candidates, target);
        warn!(strategy = %strategy, %message, "no feasible formulation");
        Ok(SolverResult::infeasible(strategy, message))
    }

    /// `Ok(None)` when the model is infeasible
    fn attempt(
        &self,
        model: &FormulationModel,
        ingredients: &[Ingredient],
        strategy: Strategy,
    ) -> Result<Option<SolverResult>, EngineError> {
        let problem = model.to_lp_problem();
        debug!(
            strategy = %strategy,
            tier = ?model.tier(),
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            "solving formulation model"
        );

        let solution = self.solver.solve(&problem)?;
        match solution.status {
            SolutionStatus::Optimal => {}
            SolutionStatus::Infeasible => {
                debug!(strategy = %strategy, tier = ?model.tier(), "model infeasible");
                return Ok(None);
            }
            SolutionStatus::Unbounded => {
                return Err(SolveError::Numerical(format!("{:?} model reported as unbounded", model.tier())).into());
            }
        }

        // Covers the weight equality, so quantities always sum to the batch
        if let Some(violated) = problem
            .constraints
            .iter()
            .find(|c| !c.is_satisfied(&solution.values, FEASIBILITY_EPSILON * c.rhs.abs().max(1.0)))
        {
            return Err(SolveError::Numerical(format!("optimal point violates {}", violated.name)).into());
        }

        let weight = model.target_weight();
        let quantities: BTreeMap<String, f64> = model
            .variables()
            .iter()
            .zip(&solution.values)
            .filter(|(_, kg)| **kg > 0.0)
            .map(|(id, kg)| (id.clone(), *kg))
            .collect();

        let total_cost = ingredients
            .iter()
            .filter_map(|ing| quantities.get(&ing.id).map(|kg| kg * ing.price))
            .sum();
        let actual = actual_nutrients(&quantities, ingredients, weight);

        debug!(
            strategy = %strategy,
            tier = ?model.tier(),
            objective = solution.objective_value,
            ingredients = quantities.len(),
            "formulation solved"
        );

        let message = match model.tier() {
            SolveTier::Full => None,
            SolveTier::EssentialsOnly => Some(ESSENTIALS_ONLY_MESSAGE.to_string()),
        };

        Ok(Some(SolverResult {
            strategy,
            feasible: true,
            tier: Some(model.tier()),
            quantities,
            objective_value: Some(solution.objective_value),
            total_cost,
            actual_nutrients: actual,
            message,
            analysis: Some(solution.analysis),
        }))
    }
}

/// Optimize with the default simplex backend
pub fn optimize(
    target_weight_kg: f64,
    ingredients: &[Ingredient],
    target: &NutritionalTarget,
    tolerance: f64,
    strategy: Strategy,
) -> Result<SolverResult, EngineError> {
    Optimizer::new().solve(target_weight_kg, ingredients, target, tolerance, strategy)
}

fn candidates(ingredients: &[Ingredient]) -> Vec<&Ingredient> {
    ingredients.iter().filter(|i| !i.is_auto_calculated()).collect()
}

/// Reject malformed requests before any model is built
pub fn validate_input(
    target_weight_kg: f64,
    ingredients: &[Ingredient],
    target: &NutritionalTarget,
    tolerance: f64,
) -> Result<(), InputError> {
    if !target_weight_kg.is_finite() || target_weight_kg <= 0.0 {
        return Err(InputError::TargetWeight(target_weight_kg));
    }
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(InputError::Tolerance(tolerance));
    }

    let mut seen = HashSet::new();
    for ing in ingredients {
        if !seen.insert(ing.id.as_str()) {
            return Err(InputError::DuplicateIngredient(ing.id.clone()));
        }
        ing.validate()?;
    }
    if candidates(ingredients).is_empty() {
        return Err(InputError::NoIngredients);
    }

    for (nutrient, range) in target.ranges() {
        let valid = |v: Option<f64>| v.is_none_or(|x| x.is_finite() && x >= 0.0);
        let ordered = match (range.min, range.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        };
        if !valid(range.min) || !valid(range.max) || !ordered {
            return Err(InputError::TargetRange(nutrient));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrients::{Nutrient, NutrientRange};
    use feedmix_solver::{LpProblem, Solution};

    fn protein(id: &str, price: f64, protein: f64) -> Ingredient {
        Ingredient::new(
            id,
            id,
            price,
            NutrientVector {
                protein,
                ..Default::default()
            },
        )
    }

    fn protein_target(min: f64) -> NutritionalTarget {
        NutritionalTarget::default().with(Nutrient::Protein, NutrientRange::at_least(min))
    }

    #[test]
    fn test_full_tier_solution() {
        let ingredients = vec![protein("a", 300.0, 10.0), protein("b", 1500.0, 72.0)];
        let result = optimize(100.0, &ingredients, &protein_target(40.0), 2.0, Strategy::LeastCost).unwrap();

        assert!(result.feasible);
        assert_eq!(result.tier, Some(SolveTier::Full));
        assert!(!result.is_relaxed());
        assert_eq!(result.message, None);
        assert!(result.analysis.is_some());

        let a = result.quantities["a"];
        let b = result.quantities["b"];
        assert!((a + b - 100.0).abs() < 1e-6);
        assert!((0.10 * a + 0.72 * b - 36.8).abs() < 1e-6, "protein kg = {}", 0.10 * a + 0.72 * b);
        assert!((result.total_cost - result.objective_value.unwrap()).abs() < 1e-6);
        assert!((result.actual_nutrients.protein - 36.8).abs() < 1e-6);
    }

    #[test]
    fn test_falls_back_to_essentials() {
        // Neither meal is above 40% protein, so PREMIUM's high-protein floor
        // cannot be met
        let ingredients = vec![protein("maize", 250.0, 9.0), protein("soy", 450.0, 38.0)];
        let result = optimize(100.0, &ingredients, &protein_target(20.0), 2.0, Strategy::Premium).unwrap();

        assert!(result.feasible);
        assert!(result.is_relaxed());
        assert_eq!(result.message.as_deref(), Some(ESSENTIALS_ONLY_MESSAGE));
        let total: f64 = result.quantities.values().sum();
        assert!((total - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_essentials_drop_inclusion_minimums() {
        // The inclusion minimum of 90% on the lean meal makes the protein floor
        // unreachable; the relaxed model ignores it
        let ingredients = vec![
            protein("lean", 100.0, 5.0).with_inclusion(Some(90.0), None),
            protein("rich", 900.0, 60.0),
        ];
        let result = optimize(100.0, &ingredients, &protein_target(30.0), 0.0, Strategy::LeastCost).unwrap();

        assert!(result.feasible);
        assert!(result.is_relaxed());
        assert!(result.quantities["lean"] < 90.0);
    }

    #[test]
    fn test_auto_calculated_ingredients_are_not_variables() {
        let ingredients = vec![
            protein("a", 300.0, 10.0),
            protein("b", 1500.0, 72.0),
            protein("vitamin_c", 5000.0, 0.0).with_auto_calc_ratio(0.0004),
        ];
        let result = optimize(100.0, &ingredients, &protein_target(40.0), 2.0, Strategy::LeastCost).unwrap();

        assert!(result.feasible);
        assert!(!result.quantities.contains_key("vitamin_c"));
    }

    #[test]
    fn test_terminal_infeasibility() {
        let ingredients = vec![protein("bran", 150.0, 20.0)];
        let result = optimize(50.0, &ingredients, &protein_target(45.0), 2.0, Strategy::Balanced).unwrap();

        assert!(!result.feasible);
        assert_eq!(result.tier, None);
        assert!(result.quantities.is_empty());
        assert_eq!(result.objective_value, None);
        let message = result.message.unwrap();
        assert!(message.contains("Need higher protein ingredients"), "{}", message);
        assert!(message.contains("Only 1 ingredient selected"), "{}", message);
    }

    #[test]
    fn test_invalid_input() {
        let ingredients = vec![protein("a", 300.0, 10.0)];
        let target = protein_target(10.0);

        assert_eq!(
            optimize(0.0, &ingredients, &target, 2.0, Strategy::LeastCost),
            Err(EngineError::InvalidInput(InputError::TargetWeight(0.0)))
        );
        assert_eq!(
            optimize(10.0, &[], &target, 2.0, Strategy::LeastCost),
            Err(EngineError::InvalidInput(InputError::NoIngredients))
        );
        let only_additive = vec![protein("vit", 10.0, 0.0).with_auto_calc_ratio(0.001)];
        assert_eq!(
            optimize(10.0, &only_additive, &target, 2.0, Strategy::LeastCost),
            Err(EngineError::InvalidInput(InputError::NoIngredients))
        );
        let duplicated = vec![protein("a", 300.0, 10.0), protein("a", 200.0, 12.0)];
        assert_eq!(
            optimize(10.0, &duplicated, &target, 2.0, Strategy::LeastCost),
            Err(EngineError::InvalidInput(InputError::DuplicateIngredient("a".to_string())))
        );
        let inverted = NutritionalTarget::default().with(Nutrient::Fat, NutrientRange::between(8.0, 4.0));
        assert_eq!(
            optimize(10.0, &ingredients, &inverted, 2.0, Strategy::LeastCost),
            Err(EngineError::InvalidInput(InputError::TargetRange(Nutrient::Fat)))
        );
    }

    struct FailingSolver;

    impl LpSolve for FailingSolver {
        fn solve(&self, _problem: &LpProblem) -> Result<Solution, SolveError> {
            Err(SolveError::IterationLimit(0))
        }
    }

    #[test]
    fn test_solver_failure_propagates() {
        let ingredients = vec![protein("a", 300.0, 10.0)];
        let result = Optimizer::with_solver(FailingSolver).solve(
            10.0,
            &ingredients,
            &protein_target(5.0),
            2.0,
            Strategy::LeastCost,
        );
        assert_eq!(result, Err(EngineError::SolverInternal(SolveError::IterationLimit(0))));
    }

    #[test]
    fn test_request_defaults() {
        let request = OptimizeRequest::new(10.0, vec![protein("a", 300.0, 10.0)], protein_target(5.0));
        assert_eq!(request.base_tolerance(), DEFAULT_TOLERANCE);
        assert_eq!(request.with_tolerance(0.0).base_tolerance(), 0.0);
    }

    #[test]
    fn test_negative_overhead_is_rejected() {
        let request =
            OptimizeRequest::new(10.0, vec![protein("a", 300.0, 10.0)], protein_target(5.0)).with_overhead_cost(-5.0);
        let err = request.validate().unwrap_err();
        assert_eq!(err, InputError::OverheadCost(-5.0));
        assert_eq!(err.to_string(), "Overhead cost must be a non-negative number, got -5");
    }
}
