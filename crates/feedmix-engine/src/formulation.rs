//! Turning solver results into purchasable, priced and graded options.

use std::thread;

use feedmix_solver::LpSolve;
use tracing::{debug, warn};

use crate::bags::{BagQuantity, round_to_bags, rounded_cost};
use crate::compliance::{ComplianceResult, check_compliance};
use crate::error::EngineError;
use crate::model::SolveTier;
use crate::nutrients::NutrientVector;
use crate::optimizer::{OptimizeRequest, Optimizer, SolverResult};
use crate::strategy::Strategy;

/// Suggestion given when every strategy fails without a diagnostic
pub const DEFAULT_SUGGESTION: &str = "Try selecting more ingredients with higher protein (fishmeal, soybean meal, blood meal) and energy sources (maize, wheat bran, palm oil).";

/// One ingredient of a priced recipe
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeLine {
    pub ingredient_id: String,
    pub name: String,
    /// kg to buy, after bag rounding
    pub qty_kg: f64,
    pub bags: u64,
    pub excess_kg: f64,
    /// Price per kg at formulation time
    pub price: f64,
    /// Topped up by ratio rather than optimized
    pub auto_calculated: bool,
}

/// A feasible strategy outcome ready to present or purchase
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FormulationOption {
    pub strategy: Strategy,
    pub tier: SolveTier,
    /// Optimal LP objective, before rounding and top-ups
    pub lp_cost: f64,
    /// Rounded purchase plus additives plus overhead
    pub total_cost: f64,
    pub cost_per_kg: f64,
    pub overhead_cost: f64,
    pub actual_nutrients: NutrientVector,
    pub compliance: ComplianceResult,
    pub recipe: Vec<RecipeLine>,
    pub message: Option<String>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct InfeasibleStrategy {
    pub strategy: Strategy,
    pub message: String,
}

/// A strategy whose solve failed inside the solver
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FailedStrategy {
    pub strategy: Strategy,
    pub error: String,
}

/// Result of running every strategy over one request
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MultiStrategyOutcome {
    /// Feasible options, in strategy order
    pub options: Vec<FormulationOption>,
    pub infeasible: Vec<InfeasibleStrategy>,
    /// Strategies whose solver errored; the others are unaffected
    #[cfg_attr(feature = "serde", serde(default))]
    pub failed: Vec<FailedStrategy>,
}

impl MultiStrategyOutcome {
    pub fn is_feasible(&self) -> bool {
        !self.options.is_empty()
    }

    /// What to tell the caller when no strategy worked: the first diagnostic,
    /// or a generic hint. `None` while at least one option exists.
    pub fn suggestion(&self) -> Option<&str> {
        if self.is_feasible() {
            return None;
        }
        Some(
            self.infeasible
                .iter()
                .map(|s| s.message.as_str())
                .find(|m| !m.is_empty())
                .unwrap_or(DEFAULT_SUGGESTION),
        )
    }

    pub fn option(&self, strategy: Strategy) -> Option<&FormulationOption> {
        self.options.iter().find(|o| o.strategy == strategy)
    }
}

/// Price, round and grade a feasible `result`. Returns `None` for an
/// infeasible one.
pub fn build_option(request: &OptimizeRequest, result: &SolverResult) -> Option<FormulationOption> {
    let tier = result.tier.filter(|_| result.feasible)?;
    let weight = request.target_weight_kg;

    let rounded = round_to_bags(&result.quantities, &request.ingredients);
    let mut total_cost = rounded_cost(&rounded, &request.ingredients);

    let mut recipe: Vec<RecipeLine> = request
        .candidates()
        .into_iter()
        .filter_map(|ing| {
            let BagQuantity { kg, bags, excess } = *rounded.get(&ing.id)?;
            Some(RecipeLine {
                ingredient_id: ing.id.clone(),
                name: ing.name.clone(),
                qty_kg: kg,
                bags,
                excess_kg: excess,
                price: ing.price,
                auto_calculated: false,
            })
        })
        .collect();

    for ing in &request.ingredients {
        let Some(ratio) = ing.auto_calc_ratio.filter(|r| *r > 0.0) else {
            continue;
        };
        let qty = weight * ratio;
        total_cost += qty * ing.price;
        recipe.push(RecipeLine {
            ingredient_id: ing.id.clone(),
            name: ing.name.clone(),
            qty_kg: qty,
            bags: 0,
            excess_kg: 0.0,
            price: ing.price,
            auto_calculated: true,
        });
    }

    total_cost += request.overhead_cost;

    // Graded against the caller's target and base tolerance, not the
    // strategy-adjusted one
    let compliance = check_compliance(
        &result.actual_nutrients,
        &request.nutritional_target,
        request.base_tolerance(),
    );

    Some(FormulationOption {
        strategy: result.strategy,
        tier,
        lp_cost: result.objective_value.unwrap_or(result.total_cost),
        total_cost,
        cost_per_kg: total_cost / weight,
        overhead_cost: request.overhead_cost,
        actual_nutrients: result.actual_nutrients,
        compliance,
        recipe,
        message: result.message.clone(),
    })
}

impl<S: LpSolve + Sync> Optimizer<S> {
    /// Run every strategy on its own thread and assemble the feasible ones.
    ///
    /// A solver error is confined to its strategy and listed under
    /// `failed`. `Err` is returned for an invalid request, or with the first
    /// error when every strategy failed.
    pub fn optimize_all(&self, request: &OptimizeRequest) -> Result<MultiStrategyOutcome, EngineError> {
        request.validate()?;

        let results: Vec<(Strategy, Result<SolverResult, EngineError>)> = thread::scope(|scope| {
            let handles: Vec<_> = Strategy::ALL
                .into_iter()
                .map(|strategy| (strategy, scope.spawn(move || self.optimize(request, strategy))))
                .collect();
            handles
                .into_iter()
                .map(|(strategy, handle)| {
                    let result = handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                    (strategy, result)
                })
                .collect()
        });

        let mut outcome = MultiStrategyOutcome {
            options: Vec::new(),
            infeasible: Vec::new(),
            failed: Vec::new(),
        };
        let mut first_error = None;

        for (strategy, result) in results {
            let result = match result {
                Ok(result) => result,
                Err(error) => {
                    warn!(strategy = %strategy, %error, "strategy failed");
                    outcome.failed.push(FailedStrategy {
                        strategy,
                        error: error.to_string(),
                    });
                    first_error.get_or_insert(error);
                    continue;
                }
            };
            match build_option(request, &result) {
                Some(option) => {
                    debug!(
                        strategy = %option.strategy,
                        total_cost = option.total_cost,
                        color = %option.compliance.color,
                        "built formulation option"
                    );
                    outcome.options.push(option);
                }
                None => outcome.infeasible.push(InfeasibleStrategy {
                    strategy: result.strategy,
                    message: result.message.clone().unwrap_or_default(),
                }),
            }
        }

        if outcome.failed.len() == Strategy::ALL.len() {
            if let Some(error) = first_error {
                return Err(error);
            }
        }
        if !outcome.is_feasible() {
            warn!("no strategy produced a feasible formulation");
        }
        Ok(outcome)
    }
}

/// Run every strategy with the default simplex backend
pub fn optimize_all(request: &OptimizeRequest) -> Result<MultiStrategyOutcome, EngineError> {
    Optimizer::new().optimize_all(request)
}
