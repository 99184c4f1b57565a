//! Exponential curve fitting for a single `(x, y)` column pair.
//!
//! Given:
//! - magnitudes `x_i`
//! - energies `y_i`
//! - an initial guess `(a0, b0)`
//!
//! we minimize `Σ (y_i - a·e^(b·x_i))^2` with Levenberg–Marquardt and return the
//! fitted `(a, b)`.
//!
//! Energies live around 10^9..10^18 J. Before iterating we divide `y` (and `a`)
//! by `max|y|`; the minimizer is the same, but the solver works with O(1)
//! numbers.
//!
//! The configured guess is always tried. When every `y` is positive a second
//! run starts from the least-squares line through `(x, ln y)`, and the
//! converged solution with the lower cost wins. Far from the optimum
//! (e.g. `a = 1` against 10^19 J events) the guess alone can stall.

use nalgebra::Vector2;
use thiserror::Error;
use tracing::debug;

use crate::domain::InitialGuess;
use crate::math::{minimize, normal_equations, LmOptions, LmSolution, SolverError};
use crate::models::exponential::{predict, value_and_gradient};

/// Minimum `det(JᵀJ) / (JᵀJ₀₀·JᵀJ₁₁)` for the parameters to count as
/// identifiable at the solution.
const MIN_CONDITIONING: f64 = 1e-12;

/// Why a fit could not be produced.
///
/// Every variant is recoverable: the caller skips the fit line and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("x has {x} values but y has {y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("need at least 2 points, got {n}")]
    InsufficientData { n: usize },
    #[error("non-finite input at index {index}")]
    NonFiniteInput { index: usize },
    #[error("fewer than 2 distinct x values; the exponent is not identifiable")]
    DegenerateInput,
    #[error("every y value is zero; there is no curve to fit")]
    ZeroResponse,
    #[error("optimizer did not converge: {0}")]
    NotConverged(#[from] SolverError),
    #[error("parameters are not identifiable at the solution (ill-conditioned Jacobian)")]
    IllConditioned,
    #[error("fitted parameters are not finite")]
    NonFiniteResult,
}

/// Result of a successful exponential fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialFit {
    pub a: f64,
    pub b: f64,
    /// Sum of squared residuals in the original units.
    pub sse: f64,
    pub evaluations: usize,
}

impl ExponentialFit {
    pub fn predict(&self, x: f64) -> f64 {
        predict(self.a, self.b, x)
    }
}

/// Fit `y = a·e^(b·x)` by nonlinear least squares.
pub fn fit_exponential(x: &[f64], y: &[f64], guess: InitialGuess) -> Result<ExponentialFit, FitError> {
    fit_exponential_with(x, y, guess, &LmOptions::default())
}

/// Same as [`fit_exponential`] with explicit solver options.
pub fn fit_exponential_with(
    x: &[f64],
    y: &[f64],
    guess: InitialGuess,
    opts: &LmOptions,
) -> Result<ExponentialFit, FitError> {
    validate(x, y)?;

    let scale = y.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return Err(FitError::ZeroResponse);
    }
    let y_scaled: Vec<f64> = y.iter().map(|v| v / scale).collect();

    let model = |p: &Vector2<f64>, xi: f64| value_and_gradient(p[0], p[1], xi);

    let from_guess = minimize(x, &y_scaled, Vector2::new(guess.a / scale, guess.b), model, opts);
    let from_log = log_linear_start(x, &y_scaled).and_then(|p0| match minimize(x, &y_scaled, p0, model, opts) {
        Ok(solution) => Some(solution),
        Err(err) => {
            debug!(reason = %err, "log-linear start did not converge");
            None
        }
    });
    let solution = pick_solution(from_guess, from_log)?;

    let (jtj, _) = normal_equations(x, &y_scaled, &solution.params, &model);
    let diag = jtj[(0, 0)] * jtj[(1, 1)];
    if !(diag > 0.0) || jtj.determinant() / diag < MIN_CONDITIONING {
        return Err(FitError::IllConditioned);
    }

    let a = solution.params[0] * scale;
    let b = solution.params[1];
    if !(a.is_finite() && b.is_finite()) {
        return Err(FitError::NonFiniteResult);
    }

    debug!(
        a,
        b,
        evaluations = solution.evaluations,
        termination = ?solution.termination,
        "exponential fit converged"
    );

    Ok(ExponentialFit {
        a,
        b,
        sse: solution.cost * scale * scale,
        evaluations: solution.evaluations,
    })
}

fn pick_solution(
    from_guess: Result<LmSolution, SolverError>,
    from_log: Option<LmSolution>,
) -> Result<LmSolution, SolverError> {
    match (from_guess, from_log) {
        (Ok(guess), Some(log)) if log.cost < guess.cost => Ok(log),
        (Ok(guess), _) => Ok(guess),
        (Err(err), Some(log)) => {
            debug!(reason = %err, "configured guess did not converge; using log-linear start");
            Ok(log)
        }
        (Err(err), None) => Err(err),
    }
}

/// `(a, b)` from ordinary least squares of `ln y` on `x`.
///
/// `None` unless every `y` is positive. Callers guarantee at least two
/// distinct `x` values.
fn log_linear_start(x: &[f64], y: &[f64]) -> Option<Vector2<f64>> {
    if !y.iter().all(|&v| v > 0.0) {
        return None;
    }
    let n = x.len() as f64;
    let ln_y: Vec<f64> = y.iter().map(|v| v.ln()).collect();
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_ln = ln_y.iter().sum::<f64>() / n;

    let (sxy, sxx) = x.iter().zip(&ln_y).fold((0.0, 0.0), |(sxy, sxx), (&xi, &li)| {
        let dx = xi - mean_x;
        (sxy + dx * (li - mean_ln), sxx + dx * dx)
    });
    let b = sxy / sxx;
    let a = (mean_ln - b * mean_x).exp();
    (a.is_finite() && a > 0.0 && b.is_finite()).then(|| Vector2::new(a, b))
}

fn validate(x: &[f64], y: &[f64]) -> Result<(), FitError> {
    if x.len() != y.len() {
        return Err(FitError::LengthMismatch { x: x.len(), y: y.len() });
    }
    if x.len() < 2 {
        return Err(FitError::InsufficientData { n: x.len() });
    }
    if let Some(index) = x
        .iter()
        .zip(y)
        .position(|(xi, yi)| !(xi.is_finite() && yi.is_finite()))
    {
        return Err(FitError::NonFiniteInput { index });
    }
    let first = x[0];
    if x.iter().all(|&xi| xi == first) {
        return Err(FitError::DegenerateInput);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::models::energy::total_energy;

    #[test]
    fn recovers_exact_exponential() {
        let x: Vec<f64> = (0..6).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|&v| 2.0 * (0.5 * v).exp()).collect();
        let fit = fit_exponential(&x, &y, InitialGuess::default()).unwrap();
        assert_relative_eq!(fit.a, 2.0, max_relative = 1e-6);
        assert_relative_eq!(fit.b, 0.5, max_relative = 1e-6);
        assert!(fit.sse < 1e-12);
    }

    #[test]
    fn recovers_decaying_exponential() {
        let x = [1.0_f64, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|&v| 3.0 * (-0.4 * v).exp()).collect();
        let fit = fit_exponential(&x, &y, InitialGuess::default()).unwrap();
        assert_relative_eq!(fit.a, 3.0, max_relative = 1e-6);
        assert_relative_eq!(fit.b, -0.4, max_relative = 1e-6);
    }

    #[test]
    fn fits_noisy_data_to_least_squares_optimum() {
        let x: Vec<f64> = (0..6).map(f64::from).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let wiggle = if i % 2 == 0 { 1.05 } else { 0.95 };
                2.0 * (0.5 * v).exp() * wiggle
            })
            .collect();
        let fit = fit_exponential(&x, &y, InitialGuess::default()).unwrap();
        assert_relative_eq!(fit.a, 2.1633, max_relative = 1e-3);
        assert_relative_eq!(fit.b, 0.47697, max_relative = 1e-3);
    }

    #[test]
    fn recovers_energy_scaling_from_default_guess() {
        // Fallback radiated energies: 0.7·10^(1.5m + 4.8) = a·e^(b·m) with
        // b = 1.5·ln(10).
        let x = [3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|&m| 0.7 * total_energy(m)).collect();
        let fit = fit_exponential(&x, &y, InitialGuess::default()).unwrap();
        assert_relative_eq!(fit.b, 1.5 * std::f64::consts::LN_10, max_relative = 1e-6);
        assert_relative_eq!(fit.a, 0.7 * 10f64.powf(4.8), max_relative = 1e-5);
    }

    #[test]
    fn identical_x_values_are_reported_not_raised() {
        let err = fit_exponential(&[4.0, 4.0, 4.0], &[1.0, 2.0, 3.0], InitialGuess::default()).unwrap_err();
        assert_eq!(err, FitError::DegenerateInput);
    }

    #[test]
    fn rejects_bad_shapes() {
        let guess = InitialGuess::default();
        assert_eq!(
            fit_exponential(&[1.0, 2.0], &[1.0], guess).unwrap_err(),
            FitError::LengthMismatch { x: 2, y: 1 }
        );
        assert_eq!(
            fit_exponential(&[1.0], &[1.0], guess).unwrap_err(),
            FitError::InsufficientData { n: 1 }
        );
        assert_eq!(
            fit_exponential(&[1.0, f64::NAN], &[1.0, 2.0], guess).unwrap_err(),
            FitError::NonFiniteInput { index: 1 }
        );
    }

    #[test]
    fn large_magnitudes_converge_from_default_guess() {
        for (lo, hi) in [(4.0, 9.5), (0.0, 9.5), (5.0, 12.0)] {
            for n in [10, 30, 200] {
                let x: Vec<f64> = (0..n)
                    .map(|i| lo + (hi - lo) * f64::from(i) / f64::from(n - 1))
                    .collect();
                let y: Vec<f64> = x.iter().map(|&m| 0.7 * total_energy(m)).collect();
                let fit = fit_exponential(&x, &y, InitialGuess::default())
                    .unwrap_or_else(|e| panic!("[{lo}, {hi}] n={n}: {e}"));
                assert_relative_eq!(fit.b, 1.5 * std::f64::consts::LN_10, max_relative = 1e-6);
                assert_relative_eq!(fit.a, 0.7 * 10f64.powf(4.8), max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn all_zero_energies_are_rejected() {
        let err = fit_exponential(&[3.0, 4.0, 5.0], &[0.0, 0.0, 0.0], InitialGuess::default()).unwrap_err();
        assert_eq!(err, FitError::ZeroResponse);
    }

    #[test]
    fn log_linear_start_needs_positive_values() {
        let start = log_linear_start(&[0.0, 1.0, 2.0], &[1.0, std::f64::consts::E, std::f64::consts::E.powi(2)]).unwrap();
        assert_relative_eq!(start[0], 1.0, max_relative = 1e-12);
        assert_relative_eq!(start[1], 1.0, max_relative = 1e-12);
        assert!(log_linear_start(&[0.0, 1.0], &[1.0, 0.0]).is_none());
    }

    #[test]
    fn exhausted_budget_is_a_fit_error() {
        // A non-positive value rules out the log-linear start.
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, -1.0, 4.0, 9.0];
        let opts = LmOptions {
            max_evaluations: 3,
            ..LmOptions::default()
        };
        let err = fit_exponential_with(&x, &y, InitialGuess::default(), &opts).unwrap_err();
        assert!(matches!(err, FitError::NotConverged(_)), "{err:?}");
    }
}
