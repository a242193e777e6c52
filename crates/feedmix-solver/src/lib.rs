mod error;
mod problem;
mod simplex;
mod solution;

pub use error::SolveError;
pub use problem::{Constraint, ConstraintOp, LpProblem, Objective};
pub use simplex::{LpSolve, Solver};
pub use solution::{Analysis, ReducedCost, ShadowPrice, Solution, SolutionStatus};
