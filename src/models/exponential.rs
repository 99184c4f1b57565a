//! Exponential model `y = a·e^(b·x)`.
//!
//! The fitter relies on two primitive operations:
//! - predict `y(x)` given `(a, b)` (for residuals/plots)
//! - the gradient `∂y/∂(a, b)` (for the Jacobian)

/// Predict `y(x)`.
pub fn predict(a: f64, b: f64, x: f64) -> f64 {
    a * (b * x).exp()
}

/// Value and gradient `(y, [∂y/∂a, ∂y/∂b])` at `x`.
pub fn value_and_gradient(a: f64, b: f64, x: f64) -> (f64, [f64; 2]) {
    let e = (b * x).exp();
    (a * e, [e, a * x * e])
}
