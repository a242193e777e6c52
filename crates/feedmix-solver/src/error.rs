use thiserror::Error;

/// Failures of the solve primitive itself, as opposed to an infeasible or
/// unbounded problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("{name} has {found} coefficients but the problem has {expected} variables")]
    DimensionMismatch { name: String, expected: usize, found: usize },
    #[error("Non-finite value in {0}")]
    NonFinite(String),
    #[error("Iteration limit of {0} reached before convergence")]
    IterationLimit(usize),
    #[error("Numerical breakdown: {0}")]
    Numerical(String),
}
