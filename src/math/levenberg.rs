//! Levenberg–Marquardt for two-parameter curve models.
//!
//! We minimize
//!
//! ```text
//! S(p) = Σ (y_i - f(x_i; p))^2
//! ```
//!
//! by repeatedly solving the damped normal equations
//!
//! ```text
//! (JᵀJ + λ·D) δ = Jᵀr
//! ```
//!
//! where `J` is the model Jacobian, `r = y - f` and `D` is a diagonal scaling
//! that keeps the running maximum of `diag(JᵀJ)` (MINPACK-style). The scaling
//! makes the damping invariant to the units of each parameter, which matters
//! when one parameter starts many orders of magnitude away from its optimum.
//!
//! Damping schedule: start at `1e-3`, ×2 after a rejected step, ÷3 after an
//! accepted one. The system is 2×2, so each step is a Cholesky solve.

use nalgebra::{Matrix2, Vector2};
use thiserror::Error;

/// Cost below which the fit is considered exact.
const EXACT_COST: f64 = 1e-30;
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;
const LAMBDA_UP: f64 = 2.0;
const LAMBDA_DOWN: f64 = 3.0;

/// Stopping criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    /// Maximum number of cost evaluations.
    pub max_evaluations: usize,
    /// Relative step tolerance.
    pub xtol: f64,
    /// Tolerance on the cosine between the residual and each Jacobian column.
    pub gtol: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        // 200·(n_params + 1) evaluations, as in MINPACK's `lmdif` default.
        Self {
            max_evaluations: 600,
            xtol: 1e-10,
            gtol: 1e-10,
        }
    }
}

/// Why the iteration stopped successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Residuals vanished.
    ExactFit,
    /// Residual vector is orthogonal to the Jacobian columns.
    Gradient,
    /// Relative parameter step fell below `xtol`.
    Step,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("cost is not finite at the initial guess")]
    NonFiniteStart,
    #[error("evaluation budget exhausted after {evaluations} evaluations")]
    EvaluationBudget { evaluations: usize },
    #[error("damping exhausted without reducing the cost ({evaluations} evaluations)")]
    DampingExhausted { evaluations: usize },
    #[error("damped normal equations are singular ({evaluations} evaluations)")]
    Singular { evaluations: usize },
}

/// Converged parameters and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct LmSolution {
    pub params: Vector2<f64>,
    pub cost: f64,
    pub evaluations: usize,
    pub termination: Termination,
}

/// Minimize the sum of squared residuals of `model` over `(xs, ys)`.
///
/// `model(p, x)` returns the prediction and its gradient with respect to `p`.
/// Callers validate lengths and finiteness of the data beforehand.
pub fn minimize<F>(
    xs: &[f64],
    ys: &[f64],
    p0: Vector2<f64>,
    model: F,
    opts: &LmOptions,
) -> Result<LmSolution, SolverError>
where
    F: Fn(&Vector2<f64>, f64) -> (f64, [f64; 2]),
{
    let mut p = p0;
    let mut cost = sum_squares(xs, ys, &p, &model);
    let mut evaluations = 1usize;
    if !cost.is_finite() {
        return Err(SolverError::NonFiniteStart);
    }

    let mut lambda = LAMBDA_INIT;
    let mut scale = Vector2::<f64>::zeros();

    while evaluations < opts.max_evaluations {
        if cost <= EXACT_COST {
            return Ok(finish(p, cost, evaluations, Termination::ExactFit));
        }

        let (jtj, g) = normal_equations(xs, ys, &p, &model);
        if gradient_orthogonal(&jtj, &g, cost, opts.gtol) {
            return Ok(finish(p, cost, evaluations, Termination::Gradient));
        }

        scale = scale.sup(&jtj.diagonal());

        loop {
            let damped = jtj + Matrix2::from_diagonal(&(scale * lambda));
            let Some(chol) = damped.cholesky() else {
                return Err(SolverError::Singular { evaluations });
            };
            let step = chol.solve(&g);
            let candidate = p + step;
            let small_step = step
                .iter()
                .zip(p.iter())
                .all(|(d, v)| d.abs() <= opts.xtol * (v.abs() + opts.xtol));

            let candidate_cost = sum_squares(xs, ys, &candidate, &model);
            evaluations += 1;

            if candidate_cost.is_finite() && candidate_cost < cost {
                p = candidate;
                cost = candidate_cost;
                if small_step && lambda <= 1.0 {
                    return Ok(finish(p, cost, evaluations, Termination::Step));
                }
                lambda = (lambda / LAMBDA_DOWN).max(LAMBDA_MIN);
                break;
            }

            // No decrease, but the undamped-ish step is already negligible:
            // we are sitting on the minimum to working precision.
            if small_step && lambda <= 1.0 {
                return Ok(finish(p, cost, evaluations, Termination::Step));
            }

            lambda *= LAMBDA_UP;
            if lambda > LAMBDA_MAX {
                return Err(SolverError::DampingExhausted { evaluations });
            }
            if evaluations >= opts.max_evaluations {
                return Err(SolverError::EvaluationBudget { evaluations });
            }
        }
    }

    Err(SolverError::EvaluationBudget { evaluations })
}

/// `(JᵀJ, Jᵀr)` at `p`.
pub fn normal_equations<F>(xs: &[f64], ys: &[f64], p: &Vector2<f64>, model: &F) -> (Matrix2<f64>, Vector2<f64>)
where
    F: Fn(&Vector2<f64>, f64) -> (f64, [f64; 2]),
{
    let mut jtj = Matrix2::<f64>::zeros();
    let mut g = Vector2::<f64>::zeros();
    for (&x, &y) in xs.iter().zip(ys) {
        let (f, grad) = model(p, x);
        let j = Vector2::new(grad[0], grad[1]);
        jtj += j * j.transpose();
        g += j * (y - f);
    }
    (jtj, g)
}

/// Sum of squared residuals; `inf` when any prediction overflows.
pub fn sum_squares<F>(xs: &[f64], ys: &[f64], p: &Vector2<f64>, model: &F) -> f64
where
    F: Fn(&Vector2<f64>, f64) -> (f64, [f64; 2]),
{
    let mut s = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let (f, _) = model(p, x);
        if !f.is_finite() {
            return f64::INFINITY;
        }
        let r = y - f;
        s += r * r;
    }
    s
}

fn gradient_orthogonal(jtj: &Matrix2<f64>, g: &Vector2<f64>, cost: f64, gtol: f64) -> bool {
    (0..2).all(|j| {
        let col_sq = jtj[(j, j)];
        col_sq <= 0.0 || g[j].abs() / (col_sq * cost).sqrt() <= gtol
    })
}

fn finish(params: Vector2<f64>, cost: f64, evaluations: usize, termination: Termination) -> LmSolution {
    LmSolution {
        params,
        cost,
        evaluations,
        termination,
    }
}
