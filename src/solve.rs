//! Numerically finding the roots of a set of [`Expression`]s.

use crate::algebra::{
    ops::{self, Context, EvaluationError},
    Expression, Parameter,
};
use nalgebra::{DMatrix as Matrix, DVector as Vector};
use std::collections::HashMap;

/// Tuning knobs for the Newton root finder.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SolverConfig {
    /// The maximum number of Newton iterations before giving up.
    pub max_iterations: usize,
    /// The residual norm below which we consider ourselves converged.
    pub abs_tol: f64,
    /// How many times a step may be halved (well, multiplied by
    /// `line_search_beta`) while looking for a smaller residual.
    pub max_line_search_iters: usize,
    /// The backtracking factor used by the line search.
    pub line_search_beta: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            max_iterations: 50,
            abs_tol: 1e-10,
            max_line_search_iters: 20,
            line_search_beta: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error("Evaluation failed")]
    Eval(#[from] EvaluationError),
    #[error("The solution didn't converge")]
    DidntConverge,
    #[error("No solution found")]
    NoSolution,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub known_values: HashMap<Parameter, f64>,
    pub iterations: usize,
}

/// Find values for the `unknowns` which make every expression in `equations`
/// equal zero, starting from `initial_values`.
pub fn solve<C>(
    equations: &[Expression],
    unknowns: &[Parameter],
    initial_values: &[f64],
    ctx: &C,
    config: &SolverConfig,
) -> Result<Solution, SolveError>
where
    C: Context,
{
    assert_eq!(unknowns.len(), initial_values.len());

    let jacobian = Jacobian::for_equations(equations, unknowns, ctx)?;
    let x_0 = Vector::from_column_slice(initial_values);
    let (got, iterations) =
        solve_with_newtons_method(&jacobian, x_0, ctx, config)?;

    Ok(Solution {
        known_values: jacobian.collate_unknowns(got.as_slice()),
        iterations,
    })
}

/// Solve a set of non-linear equations iteratively using Newton's method.
///
/// The iterative equation for Newton's method when applied to a set of
/// equations, `F`, is:
///
/// ```text
///  x_next = x_current - jacobian(F).inverse() * F(x_current)
/// ```
///
/// Calculating the inverse of a matrix is expensive though, so we rearrange
/// it to look like this:
///
/// ```text
/// jacobian(F) * (x_next - x_current) = -F(x_current)
/// ```
///
/// ... Which is in the form `A.δx = b`, and can be solved using LU
/// decomposition.
///
/// A full Newton step can easily overshoot (e.g. `x^2 = 45` starting from
/// `x = 0.1`), so each step is shrunk by `line_search_beta` until the residual
/// gets smaller.
///
/// See also:
///
/// - https://en.wikipedia.org/wiki/Newton%27s_method#Nonlinear_systems_of_equations
/// - https://en.wikipedia.org/wiki/Backtracking_line_search
fn solve_with_newtons_method<C>(
    jacobian: &Jacobian<'_>,
    x_0: Vector<f64>,
    ctx: &C,
    config: &SolverConfig,
) -> Result<(Vector<f64>, usize), SolveError>
where
    C: Context,
{
    let mut x = x_0;
    let mut f_of_x = jacobian.residuals(x.as_slice(), ctx)?;
    let mut residual = f_of_x.norm();

    for iteration in 0..config.max_iterations {
        if residual <= config.abs_tol {
            return Ok((x, iteration));
        }

        let evaluated_jacobian = jacobian.evaluate(x.as_slice(), ctx)?;
        let delta_x = newton_step(evaluated_jacobian, f_of_x)?;

        let mut alpha = 1.0;
        let mut x_next = &x + &delta_x;
        let mut f_of_x_next = jacobian.residuals(x_next.as_slice(), ctx)?;
        let mut next_residual = f_of_x_next.norm();
        let mut line_search_iterations = 0;

        // written this way so a NaN residual also backtracks
        while !(next_residual < residual) {
            if line_search_iterations >= config.max_line_search_iters {
                tracing::debug!(
                    iteration,
                    residual,
                    "The line search was unable to reduce the residual"
                );
                return Err(SolveError::DidntConverge);
            }

            alpha *= config.line_search_beta;
            x_next = &x + alpha * &delta_x;
            f_of_x_next = jacobian.residuals(x_next.as_slice(), ctx)?;
            next_residual = f_of_x_next.norm();
            line_search_iterations += 1;
        }

        tracing::debug!(
            iteration,
            alpha,
            residual = next_residual,
            x = ?x_next.as_slice(),
            "Newton step"
        );

        // a full step which barely moves means we've hit the limits of
        // floating point precision
        let stalled = alpha == 1.0 && approx::relative_eq!(x_next, x);

        x = x_next;
        f_of_x = f_of_x_next;
        residual = next_residual;

        if stalled {
            return Ok((x, iteration + 1));
        }
    }

    if residual <= config.abs_tol {
        Ok((x, config.max_iterations))
    } else {
        Err(SolveError::DidntConverge)
    }
}

/// Calculate `δx` in `jacobian(F) * δx = -F(x)`.
fn newton_step(
    jacobian: Matrix<f64>,
    f_of_x: Vector<f64>,
) -> Result<Vector<f64>, SolveError> {
    let delta_x = jacobian.lu().solve(&-f_of_x).ok_or(SolveError::NoSolution)?;

    if delta_x.iter().all(|d| d.is_finite()) {
        Ok(delta_x)
    } else {
        Err(SolveError::NoSolution)
    }
}

/// A matrix of [`Expression`]s representing the partial derivatives for each
/// parameter in each equation.
#[derive(Debug, Clone, PartialEq)]
struct Jacobian<'a> {
    cells: Box<[Expression]>,
    equations: &'a [Expression],
    unknowns: &'a [Parameter],
}

impl<'a> Jacobian<'a> {
    fn for_equations<C>(
        equations: &'a [Expression],
        unknowns: &'a [Parameter],
        ctx: &C,
    ) -> Result<Self, EvaluationError>
    where
        C: Context,
    {
        let mut cells = Vec::new();

        for equation in equations {
            for unknown in unknowns {
                let value = if equation.depends_on(unknown) {
                    let derivative =
                        ops::partial_derivative(equation, unknown, ctx)?;
                    ops::fold_constants(&derivative, ctx)
                } else {
                    Expression::Constant(0.0)
                };
                cells.push(value);
            }
        }

        Ok(Jacobian {
            cells: cells.into_boxed_slice(),
            equations,
            unknowns,
        })
    }

    fn rows(&self) -> usize { self.equations.len() }

    fn columns(&self) -> usize { self.unknowns.len() }

    fn evaluate<C>(
        &self,
        parameter_values: &[f64],
        ctx: &C,
    ) -> Result<Matrix<f64>, EvaluationError>
    where
        C: Context,
    {
        let lookup = self.lookup_value_by_name(parameter_values);
        let values = self
            .cells
            .iter()
            .map(|cell| ops::evaluate(cell, &lookup, ctx))
            .collect::<Result<Vec<_>, _>>()?;

        // cells are stored row by row
        Ok(Matrix::from_row_slice(self.rows(), self.columns(), &values))
    }

    /// Evaluate each equation, `F(x)`.
    fn residuals<C>(
        &self,
        parameter_values: &[f64],
        ctx: &C,
    ) -> Result<Vector<f64>, EvaluationError>
    where
        C: Context,
    {
        let lookup = self.lookup_value_by_name(parameter_values);
        let values = self
            .equations
            .iter()
            .map(|equation| ops::evaluate(equation, &lookup, ctx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Vector::from_vec(values))
    }

    fn lookup_value_by_name<'p>(
        &'p self,
        parameter_values: &'p [f64],
    ) -> impl Fn(&Parameter) -> Option<f64> + 'p {
        move |parameter| {
            self.unknowns
                .iter()
                .position(|p| p == parameter)
                .map(|ix| parameter_values[ix])
        }
    }

    fn collate_unknowns(
        &self,
        parameter_values: &[f64],
    ) -> HashMap<Parameter, f64> {
        self.unknowns
            .iter()
            .cloned()
            .zip(parameter_values.iter().copied())
            .collect()
    }
}
