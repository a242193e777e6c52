use feedmix_solver::SolveError;
use thiserror::Error;

use crate::nutrients::Nutrient;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("Solver failure: {0}")]
    SolverInternal(#[from] SolveError),
}

/// Reasons a formulation request is rejected before any model is built
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Target weight must be a positive number of kg, got {0}")]
    TargetWeight(f64),
    #[error("No ingredients to formulate with")]
    NoIngredients,
    #[error("Tolerance must be a non-negative percentage, got {0}")]
    Tolerance(f64),
    #[error("Overhead cost must be a non-negative number, got {0}")]
    OverheadCost(f64),
    #[error("Duplicate ingredient id: {0}")]
    DuplicateIngredient(String),
    #[error("Ingredient {0} has an invalid price: {1}")]
    Price(String, f64),
    #[error("Ingredient {id} has {nutrient} = {value}, expected 0-100")]
    NutrientValue { id: String, nutrient: Nutrient, value: f64 },
    #[error("Ingredient {0} has invalid inclusion bounds")]
    InclusionBounds(String),
    #[error("Ingredient {0} has a bag weight that is not positive")]
    BagWeight(String),
    #[error("Ingredient {0} has an invalid auto-calculation ratio")]
    AutoCalcRatio(String),
    #[error("Target for {0} is not a valid range")]
    TargetRange(Nutrient),
}
