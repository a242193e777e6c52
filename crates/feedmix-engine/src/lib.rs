pub mod aggregate;
pub mod bags;
pub mod compliance;
pub mod diagnostics;
pub mod error;
pub mod formulation;
pub mod ingredient;
pub mod model;
pub mod nutrients;
pub mod optimizer;
pub mod strategy;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use aggregate::actual_nutrients;
pub use bags::{BagQuantity, round_to_bags, rounded_cost};
pub use compliance::{
    ComplianceColor, ComplianceResult, DeviationStatus, NutrientDeviation, TargetSpec, check_compliance,
};
pub use diagnostics::diagnose_infeasibility;
pub use error::{EngineError, InputError};
pub use formulation::{
    DEFAULT_SUGGESTION, FailedStrategy, FormulationOption, InfeasibleStrategy, MultiStrategyOutcome, RecipeLine,
    build_option, optimize_all,
};
pub use ingredient::{InclusionBounds, Ingredient};
pub use model::{
    ConstraintKind, FormulationModel, ModelConstraint, SolveTier, build_essentials_model, build_full_model,
};
pub use nutrients::{Nutrient, NutrientRange, NutrientVector, NutritionalTarget};
pub use optimizer::{ESSENTIALS_ONLY_MESSAGE, OptimizeRequest, Optimizer, SolverResult, optimize, validate_input};
pub use strategy::{DEFAULT_TOLERANCE, Strategy, StrategyPolicy, UnknownStrategy};
