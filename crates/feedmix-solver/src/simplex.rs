use crate::error::SolveError;
use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::{Analysis, ReducedCost, ShadowPrice, Solution};

/// Anything that can solve a linear program.
///
/// The formulation engine only talks to this trait, so the dense simplex
/// below can be swapped for another backend without touching model building.
pub trait LpSolve {
    /// Solve `problem`. Infeasible and unbounded problems are reported through
    /// [`Solution::status`]; `Err` is reserved for failures of the solver itself.
    fn solve(&self, problem: &LpProblem) -> Result<Solution, SolveError>;
}

/// Consecutive degenerate pivots tolerated before switching to Bland's rule
const DEGENERATE_STREAK_LIMIT: usize = 50;

/// Two-phase dense simplex solver for linear programming problems
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum pivots per phase before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
        }
    }
}

impl LpSolve for Solver {
    /// Solve the LP problem using the two-phase simplex method
    fn solve(&self, problem: &LpProblem) -> Result<Solution, SolveError> {
        problem.validate()?;

        let mut tableau = self.build_tableau(problem);

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 && !self.phase1(&mut tableau)? {
            return Ok(Solution::infeasible());
        }

        // Phase 2: Optimize
        match self.phase2(&mut tableau)? {
            SimplexResult::Optimal => {}
            SimplexResult::Unbounded => return Ok(Solution::unbounded()),
        }

        self.extract_solution(&tableau, problem)
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    fn build_tableau(&self, problem: &LpProblem) -> Tableau {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        // Rows with a negative RHS are multiplied by -1, which flips their operator
        let rows: Vec<(f64, ConstraintOp)> = problem
            .constraints
            .iter()
            .map(|c| {
                if c.rhs < 0.0 {
                    (-1.0, c.op.flipped())
                } else {
                    (1.0, c.op)
                }
            })
            .collect();

        // Count slack and artificial variables needed
        let mut n_slack = 0;
        let mut n_artificial = 0;
        for (_, op) in &rows {
            match op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            rows: Vec::with_capacity(n_constraints),
            n_vars,
            n_slack,
            n_artificial,
            degenerate_streak: 0,
            use_bland: false,
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;
        let rhs_col = total_cols - 1;

        for (i, (c, &(sign, op))) in problem.constraints.iter().zip(&rows).enumerate() {
            for (j, &coef) in c.coefficients.iter().enumerate() {
                tableau.data[i][j] = sign * coef;
            }
            tableau.data[i][rhs_col] = sign * c.rhs;

            let mut info = RowInfo {
                sign,
                slack_col: None,
                artificial_col: None,
            };

            match op {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    info.slack_col = Some(slack_idx);
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    info.slack_col = Some(slack_idx);
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    info.artificial_col = Some(artificial_idx);
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    info.artificial_col = Some(artificial_idx);
                    artificial_idx += 1;
                }
            }
            tableau.rows.push(info);
        }

        // Objective row (last row)
        // Simplex maximizes, so for minimization we negate the coefficients.
        // A positive entry marks a column whose entry improves the objective.
        let obj_row = n_constraints;
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            tableau.data[obj_row][j] = if problem.objective.minimize { -coef } else { coef };
        }

        tableau
    }

    /// Returns `Ok(false)` when the problem has no feasible point
    fn phase1(&self, tableau: &mut Tableau) -> Result<bool, SolveError> {
        let n_constraints = tableau.num_constraints();
        let n_cols = tableau.num_cols();
        let rhs_col = n_cols - 1;
        let art_start = tableau.artificial_start();

        let orig_obj = tableau.data[n_constraints].clone();

        // Phase 1 objective: maximize -sum(artificials)
        tableau.data[n_constraints] = vec![0.0; n_cols];
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[n_constraints][j] = -1.0;
        }

        // Price out the basic artificials
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] += tableau.data[i][j];
                }
            }
        }

        match self.iterate(tableau, rhs_col)? {
            SimplexResult::Optimal => {}
            // The phase 1 objective is bounded by zero, so this is numerical trouble
            SimplexResult::Unbounded => {
                return Err(SolveError::Numerical("phase 1 objective became unbounded".to_string()));
            }
        }

        let scale = tableau.rhs_scale();
        let residual: f64 = (0..n_constraints)
            .filter(|&i| tableau.basic_vars[i] >= art_start)
            .map(|i| tableau.data[i][rhs_col].abs())
            .sum();
        if residual > self.tolerance * scale * 1e3 {
            return Ok(false);
        }

        // Artificials still basic at zero level: pivot them out on any
        // structural or slack column so phase 2 can never raise them again.
        // Rows with no such column are redundant and stay inert.
        for i in 0..n_constraints {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            tableau.data[i][rhs_col] = 0.0;
            let replacement = (0..art_start).find(|&j| tableau.data[i][j].abs() > self.tolerance);
            if let Some(col) = replacement {
                tableau.pivot(i, col);
            }
        }

        // Restore original objective and price out the basic variables
        tableau.data[n_constraints] = orig_obj;
        for i in 0..n_constraints {
            let basic = tableau.basic_vars[i];
            let ratio = tableau.data[n_constraints][basic];
            if ratio.abs() > 0.0 {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        tableau.degenerate_streak = 0;
        tableau.use_bland = false;
        Ok(true)
    }

    fn phase2(&self, tableau: &mut Tableau) -> Result<SimplexResult, SolveError> {
        // Artificial columns never re-enter the basis
        let exclude_from = tableau.artificial_start();
        self.iterate(tableau, exclude_from)
    }

    /// Pivot until no column below `enter_limit` improves the objective
    fn iterate(&self, tableau: &mut Tableau, enter_limit: usize) -> Result<SimplexResult, SolveError> {
        let rhs_col = tableau.num_cols() - 1;

        for _ in 0..self.max_iterations {
            let Some(pivot_col) = self.find_pivot_column(tableau, enter_limit) else {
                return Ok(SimplexResult::Optimal);
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col) else {
                return Ok(SimplexResult::Unbounded);
            };

            if tableau.data[pivot_row][rhs_col].abs() <= self.tolerance {
                tableau.degenerate_streak += 1;
                if tableau.degenerate_streak > DEGENERATE_STREAK_LIMIT {
                    tableau.use_bland = true;
                }
            } else {
                tableau.degenerate_streak = 0;
            }

            tableau.pivot(pivot_row, pivot_col);
        }

        Err(SolveError::IterationLimit(self.max_iterations))
    }

    fn find_pivot_column(&self, tableau: &Tableau, enter_limit: usize) -> Option<usize> {
        let obj = &tableau.data[tableau.num_constraints()];

        if tableau.use_bland {
            // Lowest index with an improving reduced cost; guarantees termination
            return (0..enter_limit).find(|&j| obj[j] > self.tolerance);
        }

        // Look for the most positive reduced cost (can improve objective)
        let mut max_val = self.tolerance;
        let mut max_col = None;
        for (j, &value) in obj.iter().enumerate().take(enter_limit) {
            if value > max_val {
                max_val = value;
                max_col = Some(j);
            }
        }
        max_col
    }

    fn find_pivot_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let rhs_col = tableau.num_cols() - 1;

        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for i in 0..tableau.num_constraints() {
            let val = tableau.data[i][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = tableau.data[i][rhs_col].max(0.0) / val;
            let better = match min_row {
                None => true,
                Some(current) => {
                    ratio < min_ratio - self.tolerance
                        || (ratio <= min_ratio + self.tolerance
                            && tableau.basic_vars[i] < tableau.basic_vars[current])
                }
            };
            if better {
                min_ratio = ratio;
                min_row = Some(i);
            }
        }

        min_row
    }

    fn extract_solution(&self, tableau: &Tableau, problem: &LpProblem) -> Result<Solution, SolveError> {
        let n_vars = problem.num_variables();
        let rhs_col = tableau.num_cols() - 1;

        // Extract variable values
        let mut values = vec![0.0; n_vars];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < n_vars {
                let value = tableau.data[i][rhs_col];
                if !value.is_finite() {
                    return Err(SolveError::Numerical(format!("{} is not finite", problem.variables[basic])));
                }
                values[basic] = if value.abs() <= self.tolerance { 0.0 } else { value.max(0.0) };
            }
        }

        let objective_value = problem.objective_value(&values);
        let analysis = self.analyze(tableau, problem, &values);

        Ok(Solution {
            status: crate::SolutionStatus::Optimal,
            values,
            objective_value,
            analysis,
        })
    }

    fn analyze(&self, tableau: &Tableau, problem: &LpProblem, values: &[f64]) -> Analysis {
        let obj = &tableau.data[tableau.num_constraints()];
        // Sign that turns the internal maximization back into the caller's sense
        let sense = if problem.objective.minimize { -1.0 } else { 1.0 };

        // The artificial (or slack) column of a row carries +1 in that row only,
        // so its reduced cost is the negated dual of the normalized row
        let mut shadow_prices = Vec::new();
        for (constraint, row) in problem.constraints.iter().zip(&tableau.rows) {
            let Some(col) = row.artificial_col.or(row.slack_col) else {
                continue;
            };
            let dual = -obj[col];
            let mut value = sense * row.sign * dual;
            if value.abs() < self.tolerance {
                value = 0.0;
            }
            let interpretation = if value == 0.0 {
                "Non-binding constraint".to_string()
            } else if value > 0.0 {
                format!("Increasing RHS by 1 unit would increase the objective by {:.4}", value)
            } else {
                format!("Increasing RHS by 1 unit would decrease the objective by {:.4}", -value)
            };
            shadow_prices.push(ShadowPrice {
                constraint: constraint.name.clone(),
                value,
                interpretation,
            });
        }

        let reduced_costs = problem
            .variables
            .iter()
            .enumerate()
            .map(|(j, var_name)| {
                let is_basic = tableau.basic_vars.contains(&j);
                let rc = if is_basic { 0.0 } else { -obj[j] };
                ReducedCost {
                    variable: var_name.clone(),
                    value: values[j],
                    reduced_cost: rc,
                    is_basic,
                }
            })
            .collect();

        let binding_constraints = shadow_prices
            .iter()
            .filter(|sp| sp.value != 0.0)
            .map(|sp| sp.constraint.clone())
            .collect();

        Analysis {
            shadow_prices,
            reduced_costs,
            binding_constraints,
        }
    }
}

/// Bookkeeping for one constraint row after sign normalization
#[derive(Debug, Clone, Copy)]
struct RowInfo {
    /// -1 when the row was negated to make its RHS non-negative
    sign: f64,
    slack_col: Option<usize>,
    artificial_col: Option<usize>,
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    rows: Vec<RowInfo>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
    degenerate_streak: usize,
    use_bland: bool,
}

impl Tableau {
    fn num_constraints(&self) -> usize {
        self.data.len() - 1
    }

    fn num_cols(&self) -> usize {
        self.data[0].len()
    }

    fn artificial_start(&self) -> usize {
        self.n_vars + self.n_slack
    }

    fn rhs_scale(&self) -> f64 {
        let rhs_col = self.num_cols() - 1;
        self.data[..self.num_constraints()]
            .iter()
            .map(|row| row[rhs_col].abs())
            .fold(1.0, f64::max)
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let n_cols = self.num_cols();

        self.basic_vars[row] = col;

        // Scale pivot row
        let pivot_val = self.data[row][col];
        for j in 0..n_cols {
            self.data[row][j] /= pivot_val;
        }

        // Eliminate column in other rows
        let pivot_row = self.data[row].clone();
        for (i, other) in self.data.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = other[col];
            if factor == 0.0 {
                continue;
            }
            for (cell, &p) in other.iter_mut().zip(&pivot_row) {
                *cell -= factor * p;
            }
        }
    }
}

enum SimplexResult {
    Optimal,
    Unbounded,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SolutionStatus;

    fn solve(problem: &LpProblem) -> Solution {
        Solver::new().solve(problem).unwrap()
    }

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.values[1]);
        assert!((solution.objective_value - 11.0).abs() < 1e-6, "obj = {} (expected 11)", solution.objective_value);
    }

    #[test]
    fn test_minimization_with_ge() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=9
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![2.0, 3.0], true);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.values[1]);
        assert!((solution.objective_value - 9.0).abs() < 1e-6, "obj = {} (expected 9)", solution.objective_value);
    }

    #[test]
    fn test_shadow_prices_and_binding() {
        // Same problem as above: one more unit of `sum` costs 3 (more y),
        // one more unit of `x_max` saves 1 (swap y for x)
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![2.0, 3.0], true);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let analysis = solve(&problem).analysis;
        let price = |name: &str| {
            analysis
                .shadow_prices
                .iter()
                .find(|sp| sp.constraint == name)
                .map(|sp| sp.value)
                .unwrap()
        };

        assert!((price("sum") - 3.0).abs() < 1e-6, "sum shadow price = {}", price("sum"));
        assert!((price("x_max") + 1.0).abs() < 1e-6, "x_max shadow price = {}", price("x_max"));
        assert_eq!(price("y_max"), 0.0);
        assert_eq!(analysis.binding_constraints, vec!["sum".to_string(), "x_max".to_string()]);
    }

    #[test]
    fn test_equality_blend() {
        // Two feeds blended to 100 kg with at least 20 kg of protein
        let mut problem = LpProblem::new(vec!["corn".to_string(), "soy".to_string()]);
        problem.set_objective(vec![100.0, 300.0], true);
        problem.add_constraint("batch", vec![1.0, 1.0], ConstraintOp::Eq, 100.0);
        problem.add_constraint("protein_min", vec![0.08, 0.45], ConstraintOp::Ge, 20.0);

        let solution = solve(&problem);
        let corn = solution.values[0];
        let soy = solution.values[1];

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((corn + soy - 100.0).abs() < 1e-6, "batch = {}", corn + soy);
        // 0.08c + 0.45s = 20 with c + s = 100 gives s = 12 / 0.37
        assert!((soy - 12.0 / 0.37).abs() < 1e-6, "soy = {}", soy);
    }

    #[test]
    fn test_redundant_equality_rows() {
        // The second row repeats the first; its artificial stays at zero and
        // must not disturb phase 2
        let mut problem = LpProblem::new(vec!["a".to_string(), "b".to_string()]);
        problem.set_objective(vec![1.0, 2.0], true);
        problem.add_constraint("total", vec![1.0, 1.0], ConstraintOp::Eq, 10.0);
        problem.add_constraint("total_again", vec![2.0, 2.0], ConstraintOp::Eq, 20.0);
        problem.add_constraint("b_min", vec![0.0, 1.0], ConstraintOp::Ge, 3.0);

        let solution = solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 7.0).abs() < 1e-6, "a = {}", solution.values[0]);
        assert!((solution.values[1] - 3.0).abs() < 1e-6, "b = {}", solution.values[1]);
    }

    #[test]
    fn test_zero_rhs_lower_bound() {
        // A `>= 0` row is degenerate from the start
        let mut problem = LpProblem::new(vec!["a".to_string(), "b".to_string()]);
        problem.set_objective(vec![3.0, 5.0], true);
        problem.add_constraint("total", vec![1.0, 1.0], ConstraintOp::Eq, 50.0);
        problem.add_constraint("b_share", vec![0.0, 1.0], ConstraintOp::Ge, 0.0);

        let solution = solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 50.0).abs() < 1e-6, "a = {}", solution.values[0]);
        assert!((solution.objective_value - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_rhs_is_normalized() {
        // -x <= -2 is x >= 2
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("neg", vec![-1.0], ConstraintOp::Le, -2.0);
        problem.add_constraint("cap", vec![1.0], ConstraintOp::Le, 5.0);

        let solution = solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 2.0).abs() < 1e-6, "x = {}", solution.values[0]);
    }

    #[test]
    fn test_infeasible() {
        // x >= 5
        // x <= 3
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![1.0], ConstraintOp::Le, 3.0);

        let solution = solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_unbounded() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], false);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 1.0);

        assert_eq!(solve(&problem).status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_iteration_limit() {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![1.0, 1.0], false);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 1.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 1.0);

        let result = Solver::new().with_max_iterations(1).solve(&problem);
        assert_eq!(result, Err(SolveError::IterationLimit(1)));
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0, 2.0], true);

        assert!(matches!(
            Solver::new().solve(&problem),
            Err(SolveError::DimensionMismatch { .. })
        ));
    }
}
